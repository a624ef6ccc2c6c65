//! Per-connection recognition sessions
//!
//! One `Session` per client connection: an explicit state machine over the
//! backend stream lifecycle, the duration accumulator for the current
//! attempt, and the relay logic that prices backend results and turns them
//! into outbound messages.

pub mod billing;
mod session;

pub use session::{Session, SessionState};
