use super::{stream_channels, OpenStream, RecognitionConfig, SpeechBackend, StreamEvent, StreamHandle};
use anyhow::Result;
use tracing::{debug, info};

/// Inert recognizer used when no upstream is configured. Streams accept and
/// discard audio, never emit results, and end cleanly on half-close or
/// destroy. Keeps the relay runnable end to end without credentials.
pub struct NullBackend;

#[async_trait::async_trait]
impl SpeechBackend for NullBackend {
    async fn open_stream(&self, config: &RecognitionConfig) -> Result<OpenStream> {
        info!(
            language = %config.language_code,
            encoding = %config.encoding,
            "opening null recognition stream"
        );

        let (audio_tx, mut audio_rx, event_tx, event_rx) = stream_channels();
        let (abort_tx, mut abort_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    chunk = audio_rx.recv() => match chunk {
                        Some(chunk) => debug!(bytes = chunk.len(), "null backend discarding audio"),
                        None => break, // half-close
                    },
                    _ = &mut abort_rx => return, // destroyed, skip the End event
                }
            }
            let _ = event_tx.send(StreamEvent::End).await;
        });

        Ok(OpenStream {
            handle: StreamHandle::new(audio_tx, abort_tx),
            events: event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn half_close_yields_end_event() {
        let backend = NullBackend;
        let mut stream = backend
            .open_stream(&RecognitionConfig::default())
            .await
            .unwrap();

        stream.handle.write(vec![0u8; 10]).unwrap();
        stream.handle.half_close();

        match stream.events.recv().await {
            Some(StreamEvent::End) => {}
            other => panic!("expected End, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn destroy_suppresses_end_event() {
        let backend = NullBackend;
        let mut stream = backend
            .open_stream(&RecognitionConfig::default())
            .await
            .unwrap();

        stream.handle.destroy();
        assert!(stream.events.recv().await.is_none());
    }
}
