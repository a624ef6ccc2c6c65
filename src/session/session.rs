use crate::backend::{
    OpenStream, RecognitionConfig, RecognitionResult, SpeechBackend, StreamEvent, StreamHandle,
};
use crate::config::{BillingConfig, RecognitionSettings};
use crate::meter::UsageMeter;
use crate::session::billing::{round2, round4};
use crate::ws::messages::{CostBreakdown, ServerMessage, StartConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Where a session stands with respect to its backend stream.
///
/// `Stopped` and `Failed` both accept a fresh `start`; they differ only in
/// how the attempt ended, which matters for diagnostics and for what the
/// client was told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No backend stream yet.
    Idle,
    /// Backend stream open and accepting audio.
    Streaming,
    /// Stream closed at the client's request.
    Stopped,
    /// Stream closed by a backend error or unexpected end.
    Failed,
}

/// State and stream ownership for one client connection's recognition
/// activity. At most one backend stream is open at any instant; a new
/// `start` supersedes whatever stream came before it.
///
/// Transition methods return outbound messages as values rather than writing
/// to a socket, so the machine is exercised in tests with scripted event
/// sequences and no transport.
pub struct Session {
    client_id: u64,
    backend: Arc<dyn SpeechBackend>,
    meter: Arc<UsageMeter>,
    recognition: RecognitionSettings,
    billing: BillingConfig,

    state: SessionState,
    stream: Option<StreamHandle>,
    /// Bumped on every open; tags log lines so events from a superseded
    /// stream are attributable during debugging.
    generation: u64,
    /// Milliseconds of audio observed since the current stream opened.
    duration_ms: f64,
    /// Resolved relay policy for the current stream: relay interim results
    /// or only finals.
    relay_interim: bool,
}

impl Session {
    pub fn new(
        client_id: u64,
        backend: Arc<dyn SpeechBackend>,
        meter: Arc<UsageMeter>,
        recognition: RecognitionSettings,
        billing: BillingConfig,
    ) -> Self {
        let relay_interim = recognition.relay_interim_results;
        Self {
            client_id,
            backend,
            meter,
            recognition,
            billing,
            state: SessionState::Idle,
            stream: None,
            generation: 0,
            duration_ms: 0.0,
            relay_interim,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Audio observed on the current attempt, in seconds.
    pub fn session_duration_seconds(&self) -> f64 {
        self.duration_ms / 1000.0
    }

    /// Open a new backend stream, superseding any stream already open.
    ///
    /// The superseded stream is force-destroyed best-effort; its fate no
    /// longer matters once the client has asked for a new one, so closure
    /// failures are swallowed. Returns the messages to send plus the new
    /// stream's event receiver — the caller must replace its previous
    /// receiver either way, which is what keeps stale events unroutable.
    pub async fn start(
        &mut self,
        overrides: Option<StartConfig>,
    ) -> (Vec<ServerMessage>, Option<mpsc::Receiver<StreamEvent>>) {
        if let Some(mut old) = self.stream.take() {
            info!(
                client_id = self.client_id,
                generation = self.generation,
                "superseding open recognition stream"
            );
            old.destroy();
        }

        self.generation += 1;
        self.duration_ms = 0.0;

        let config = self.resolve_config(overrides);
        self.relay_interim = config.interim_results;

        info!(
            client_id = self.client_id,
            generation = self.generation,
            language = %config.language_code,
            "starting recognition"
        );

        match self.backend.open_stream(&config).await {
            Ok(OpenStream { handle, events }) => {
                self.stream = Some(handle);
                self.state = SessionState::Streaming;
                (vec![ServerMessage::started()], Some(events))
            }
            Err(e) => {
                error!(
                    client_id = self.client_id,
                    error = %e,
                    "failed to open recognition stream"
                );
                self.state = SessionState::Failed;
                (
                    vec![ServerMessage::error(format!(
                        "Failed to start recognition: {e}"
                    ))],
                    None,
                )
            }
        }
    }

    /// Forward one decoded audio chunk to the backend stream.
    ///
    /// Outside `Streaming` the chunk is dropped with a warning; that happens
    /// legitimately when a chunk races an asynchronous stream teardown, so
    /// it is never reported to the client as an error. The duration estimate
    /// accumulates before the write, and only while `Streaming`.
    pub fn push_audio(&mut self, chunk: Vec<u8>) {
        if self.state != SessionState::Streaming {
            warn!(
                client_id = self.client_id,
                state = ?self.state,
                bytes = chunk.len(),
                "dropping audio chunk, no active stream"
            );
            return;
        }

        let Some(stream) = &self.stream else {
            // Streaming with no handle is unrepresentable by construction;
            // keep the guard so a logic slip drops audio instead of panicking.
            warn!(client_id = self.client_id, "dropping audio chunk, handle missing");
            return;
        };

        self.duration_ms += self.billing.estimate_duration_ms(chunk.len());

        match stream.write(chunk) {
            Ok(()) => {}
            Err(TrySendError::Closed(chunk)) => {
                warn!(
                    client_id = self.client_id,
                    bytes = chunk.len(),
                    "stream closed concurrently, dropping chunk"
                );
            }
            Err(TrySendError::Full(chunk)) => {
                warn!(
                    client_id = self.client_id,
                    bytes = chunk.len(),
                    "backend backpressure, dropping chunk"
                );
            }
        }
    }

    /// Gracefully end the current stream. Half-closes the audio side so any
    /// in-flight final results can still arrive; the handle is released when
    /// the backend's `End` event comes through. Idempotent: with no open
    /// stream this is a no-op and nothing is sent.
    pub fn stop(&mut self) -> Option<ServerMessage> {
        match (self.state, self.stream.as_mut()) {
            (SessionState::Streaming, Some(stream)) => {
                info!(client_id = self.client_id, "stopping recognition");
                stream.half_close();
                self.state = SessionState::Stopped;
                Some(ServerMessage::stopped())
            }
            _ => {
                debug!(client_id = self.client_id, "stop with no open stream");
                None
            }
        }
    }

    /// Consume one backend stream event and produce the messages to relay.
    pub fn on_backend_event(&mut self, event: StreamEvent) -> Vec<ServerMessage> {
        match event {
            StreamEvent::Data(results) => self.on_data(results),
            StreamEvent::Error {
                code,
                message,
                details,
            } => {
                error!(
                    client_id = self.client_id,
                    generation = self.generation,
                    code = ?code,
                    error = %message,
                    "backend stream error"
                );
                self.stream = None;
                self.state = SessionState::Failed;

                let message = match code {
                    Some(code) => format!("Speech backend error [{code}]: {message}"),
                    None => format!("Speech backend error: {message}"),
                };
                vec![ServerMessage::Error {
                    message,
                    code,
                    details,
                }]
            }
            StreamEvent::End => {
                self.stream = None;
                match self.state {
                    SessionState::Streaming => {
                        // Backend ended the attempt on its own; the client
                        // must issue a new `start` to continue.
                        warn!(
                            client_id = self.client_id,
                            generation = self.generation,
                            "backend ended stream unexpectedly"
                        );
                        self.state = SessionState::Failed;
                    }
                    SessionState::Stopped => {
                        debug!(client_id = self.client_id, "stream drained after stop");
                    }
                    _ => {}
                }
                Vec::new()
            }
        }
    }

    /// Connection closed: release the backend stream with no messages. A
    /// stopped stream is already half-closed and left to drain; anything
    /// else is force-destroyed.
    pub fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if self.state != SessionState::Stopped {
                stream.destroy();
            }
        }
    }

    fn on_data(&mut self, results: Vec<RecognitionResult>) -> Vec<ServerMessage> {
        if !matches!(self.state, SessionState::Streaming | SessionState::Stopped) {
            debug!(
                client_id = self.client_id,
                state = ?self.state,
                "ignoring data event outside an active attempt"
            );
            return Vec::new();
        }

        let Some(result) = results.first() else {
            return Vec::new();
        };
        let Some(alternative) = result.top_alternative() else {
            return Vec::new();
        };

        let duration_seconds = self.duration_ms / 1000.0;
        let cost = self.billing.quantum_cost(duration_seconds);

        self.meter
            .record(self.client_id, duration_seconds, cost, &alternative.transcript);
        let totals = self.meter.totals();

        info!(
            client_id = self.client_id,
            duration_seconds = round2(duration_seconds),
            cost_usd = round4(cost),
            total_cost_usd = round4(totals.cost_usd),
            is_final = result.is_final,
            "priced transcript event"
        );

        if !result.is_final && !self.relay_interim {
            return Vec::new();
        }

        vec![ServerMessage::Transcript {
            transcript: alternative.transcript.clone(),
            is_final: result.is_final,
            confidence: alternative.confidence.unwrap_or(0.0),
            language_code: result.language_code.clone(),
            cost: CostBreakdown {
                session_duration_seconds: round2(duration_seconds),
                session_cost_usd: round4(cost),
                total_cost_usd: round4(totals.cost_usd),
            },
        }]
    }

    fn resolve_config(&self, overrides: Option<StartConfig>) -> RecognitionConfig {
        let overrides = overrides.unwrap_or_default();
        RecognitionConfig {
            language_code: overrides
                .language_code
                .unwrap_or_else(|| self.recognition.language_code.clone()),
            alternative_language_codes: overrides.alternative_language_codes.unwrap_or_default(),
            encoding: self.recognition.encoding.clone(),
            sample_rate_hertz: self.recognition.sample_rate_hertz,
            interim_results: overrides
                .interim_results
                .unwrap_or(self.recognition.relay_interim_results),
        }
    }
}
