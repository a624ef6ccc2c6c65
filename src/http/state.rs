use crate::backend::SpeechBackend;
use crate::config::Config;
use crate::meter::UsageMeter;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared application state: the backend factory, the process-wide usage
/// meter, and the client id counter. Everything per-session lives in the
/// connection task instead.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn SpeechBackend>,
    pub meter: Arc<UsageMeter>,

    /// Monotonic client id source; ids are never reused for the life of the
    /// process, even after disconnect.
    client_counter: Arc<AtomicU64>,

    /// Currently connected clients, for the health endpoint.
    active_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn SpeechBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            meter: Arc::new(UsageMeter::new()),
            client_counter: Arc::new(AtomicU64::new(0)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Next client id, starting at 1.
    pub fn next_client_id(&self) -> u64 {
        self.client_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;
    use crate::config::{BillingConfig, HttpConfig, RecognitionSettings, ServiceConfig};

    fn test_config() -> Config {
        Config {
            service: ServiceConfig {
                name: "stt-relay".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 0,
                },
            },
            recognition: RecognitionSettings::default(),
            billing: BillingConfig::default(),
        }
    }

    #[test]
    fn client_ids_are_monotonic_and_unique() {
        let state = AppState::new(test_config(), Arc::new(NullBackend));
        assert_eq!(state.next_client_id(), 1);
        assert_eq!(state.next_client_id(), 2);
        assert_eq!(state.next_client_id(), 3);
    }

    #[test]
    fn connection_gauge_tracks_open_and_close() {
        let state = AppState::new(test_config(), Arc::new(NullBackend));
        state.connection_opened();
        state.connection_opened();
        state.connection_closed();
        assert_eq!(state.active_connections(), 1);
    }
}
