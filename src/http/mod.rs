//! HTTP surface
//!
//! - GET /        - health/liveness (same payload as /health)
//! - GET /health  - health/liveness
//! - GET /ws      - WebSocket upgrade to the relay protocol

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
