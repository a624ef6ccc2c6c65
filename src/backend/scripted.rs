use super::{stream_channels, OpenStream, RecognitionConfig, SpeechBackend, StreamEvent, StreamHandle};
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What one scripted stream does over its lifetime.
#[derive(Debug, Clone)]
pub struct StreamScript {
    /// Fail `open_stream` synchronously with this message.
    pub fail_open: Option<String>,
    /// Events emitted as soon as the stream opens.
    pub on_open: Vec<StreamEvent>,
    /// Events emitted once `emit_after_writes` audio chunks have arrived.
    pub on_audio: Vec<StreamEvent>,
    /// How many chunks to swallow before emitting `on_audio`.
    pub emit_after_writes: usize,
    /// Suppress the `End` event normally emitted on half-close.
    pub no_end_on_half_close: bool,
}

impl Default for StreamScript {
    fn default() -> Self {
        Self {
            fail_open: None,
            on_open: Vec::new(),
            on_audio: Vec::new(),
            emit_after_writes: 1,
            no_end_on_half_close: false,
        }
    }
}

/// Observable interactions with the scripted backend, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Open { stream: usize, language_code: String },
    Write { stream: usize, bytes: Vec<u8> },
    HalfClose { stream: usize },
    Destroy { stream: usize },
}

/// Recognizer stand-in driven by per-stream scripts. Each `open_stream` pops
/// the next script (empty script if exhausted) and records every interaction
/// for assertions. Used by the relay tests and handy for local poking.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<StreamScript>>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<StreamScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Everything that happened so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of streams opened (failed opens included).
    pub fn opens(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, BackendCall::Open { .. }))
            .count()
    }

    /// Audio bytes written to the given stream, concatenated in order.
    pub fn written_to(&self, stream: usize) -> Vec<u8> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                BackendCall::Write { stream: s, bytes } if *s == stream => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[async_trait::async_trait]
impl SpeechBackend for ScriptedBackend {
    async fn open_stream(&self, config: &RecognitionConfig) -> Result<OpenStream> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let stream = {
            let mut calls = self.calls.lock().unwrap();
            let stream = calls
                .iter()
                .filter(|c| matches!(c, BackendCall::Open { .. }))
                .count();
            calls.push(BackendCall::Open {
                stream,
                language_code: config.language_code.clone(),
            });
            stream
        };

        if let Some(message) = script.fail_open {
            return Err(anyhow!(message));
        }

        let (audio_tx, mut audio_rx, event_tx, event_rx) = stream_channels();
        let (abort_tx, mut abort_rx) = tokio::sync::oneshot::channel();
        let calls = Arc::clone(&self.calls);

        tokio::spawn(async move {
            for ev in script.on_open {
                if event_tx.send(ev).await.is_err() {
                    return;
                }
            }

            let mut on_audio = Some(script.on_audio);
            let mut writes_seen = 0usize;
            loop {
                tokio::select! {
                    chunk = audio_rx.recv() => match chunk {
                        Some(bytes) => {
                            calls.lock().unwrap().push(BackendCall::Write { stream, bytes });
                            writes_seen += 1;
                            if writes_seen >= script.emit_after_writes {
                                if let Some(events) = on_audio.take() {
                                    for ev in events {
                                        if event_tx.send(ev).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                            }
                        }
                        None => {
                            calls.lock().unwrap().push(BackendCall::HalfClose { stream });
                            if !script.no_end_on_half_close {
                                let _ = event_tx.send(StreamEvent::End).await;
                            }
                            return;
                        }
                    },
                    res = &mut abort_rx => {
                        if res.is_ok() {
                            calls.lock().unwrap().push(BackendCall::Destroy { stream });
                        }
                        return;
                    }
                }
            }
        });

        Ok(OpenStream {
            handle: StreamHandle::new(audio_tx, abort_tx),
            events: event_rx,
        })
    }
}
