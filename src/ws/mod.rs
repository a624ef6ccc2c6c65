//! WebSocket connection dispatch
//!
//! This module owns the client-facing side of the relay:
//! - the tagged JSON message schema exchanged over the socket
//! - the per-connection message loop that drives a `Session`

pub mod handler;
pub mod messages;

pub use handler::ws_upgrade;
pub use messages::{ClientMessage, CostBreakdown, ServerMessage, StartConfig, StatusKind};
