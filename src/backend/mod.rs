//! Upstream streaming-recognition contract
//!
//! The relay talks to the recognizer through a narrow seam: a factory opens
//! one duplex stream per recognition attempt, audio bytes go in through a
//! [`StreamHandle`], and the stream reports back with a sequence of
//! [`StreamEvent`]s ending in `Error` or `End`. The recognizer itself is an
//! external collaborator; this module only defines the shape of the seam
//! plus two in-process implementations (inert and scripted).

mod null;
mod scripted;

pub use null::NullBackend;
pub use scripted::{BackendCall, ScriptedBackend, StreamScript};

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Buffered audio chunks per stream before writes start dropping.
const AUDIO_CHANNEL_CAPACITY: usize = 64;

/// Per-stream recognition settings, fixed for the lifetime of one stream.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    pub language_code: String,
    pub alternative_language_codes: Vec<String>,
    pub encoding: String,
    pub sample_rate_hertz: u32,
    /// Whether the stream should produce interim hypotheses in addition to
    /// final results.
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            alternative_language_codes: Vec::new(),
            encoding: "WEBM_OPUS".to_string(),
            sample_rate_hertz: 48000,
            interim_results: false,
        }
    }
}

/// One transcription hypothesis.
#[derive(Debug, Clone)]
pub struct TranscriptAlternative {
    pub transcript: String,
    pub confidence: Option<f32>,
}

/// One result from a data event; `is_final` marks hypotheses the backend
/// will not revise further.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub alternatives: Vec<TranscriptAlternative>,
    pub is_final: bool,
    pub language_code: Option<String>,
}

impl RecognitionResult {
    /// The top-ranked alternative, if the result carries any.
    pub fn top_alternative(&self) -> Option<&TranscriptAlternative> {
        self.alternatives.first()
    }
}

/// Everything a backend stream can report. Delivery is asynchronous but the
/// session consumes these one at a time, so transition logic stays testable
/// with a scripted sequence.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Data(Vec<RecognitionResult>),
    Error {
        code: Option<i32>,
        message: String,
        details: Option<String>,
    },
    End,
}

/// A freshly opened backend stream: the write half plus its event feed.
pub struct OpenStream {
    pub handle: StreamHandle,
    pub events: mpsc::Receiver<StreamEvent>,
}

/// Write half of a backend stream.
///
/// `write` never blocks: a full or torn-down stream drops the chunk. Dropping
/// the handle without calling anything behaves like `destroy`.
pub struct StreamHandle {
    audio_tx: Option<mpsc::Sender<Vec<u8>>>,
    abort_tx: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    pub fn new(audio_tx: mpsc::Sender<Vec<u8>>, abort_tx: oneshot::Sender<()>) -> Self {
        Self {
            audio_tx: Some(audio_tx),
            abort_tx: Some(abort_tx),
        }
    }

    /// Forward one audio chunk. Returns the chunk on failure so callers can
    /// log its size; failure means the stream is gone or saturated, never
    /// that the caller blocked.
    pub fn write(&self, chunk: Vec<u8>) -> Result<(), mpsc::error::TrySendError<Vec<u8>>> {
        match &self.audio_tx {
            Some(tx) => tx.try_send(chunk),
            None => Err(mpsc::error::TrySendError::Closed(chunk)),
        }
    }

    /// Signal that no more audio is coming. The stream may still emit
    /// trailing results before its `End` event.
    pub fn half_close(&mut self) {
        self.audio_tx = None;
    }

    /// Immediate forced teardown. Errors from an already-dead stream are
    /// swallowed; a superseded stream's fate no longer matters.
    pub fn destroy(&mut self) {
        self.audio_tx = None;
        if let Some(abort) = self.abort_tx.take() {
            if abort.send(()).is_err() {
                warn!("backend stream already gone on destroy");
            }
        }
    }
}

/// Factory for backend streams, injected into the dispatcher at startup.
#[async_trait::async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Open a new recognition stream. A synchronous failure here leaves the
    /// caller with no stream at all.
    async fn open_stream(&self, config: &RecognitionConfig) -> Result<OpenStream>;
}

/// Bounded channel pair used by backend implementations.
pub(crate) fn stream_channels() -> (
    mpsc::Sender<Vec<u8>>,
    mpsc::Receiver<Vec<u8>>,
    mpsc::Sender<StreamEvent>,
    mpsc::Receiver<StreamEvent>,
) {
    let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
    (audio_tx, audio_rx, event_tx, event_rx)
}
