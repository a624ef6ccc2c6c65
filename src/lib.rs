pub mod backend;
pub mod config;
pub mod http;
pub mod meter;
pub mod session;
pub mod ws;

pub use backend::{
    NullBackend, OpenStream, RecognitionConfig, RecognitionResult, ScriptedBackend, SpeechBackend,
    StreamEvent, StreamHandle, StreamScript, TranscriptAlternative,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use meter::{UsageMeter, UsageRecord, UsageSummary, UsageTotals};
pub use session::{Session, SessionState};
pub use ws::{ClientMessage, CostBreakdown, ServerMessage, StartConfig, StatusKind};
