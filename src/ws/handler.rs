//! Connection dispatcher
//!
//! Accepts WebSocket upgrades, assigns each connection a unique client id,
//! and runs the per-connection message loop. Each loop owns one `Session`;
//! backend events and client messages are multiplexed with `select!`, so a
//! slow backend never blocks the socket and no session ever touches
//! another's state.

use crate::backend::StreamEvent;
use crate::http::AppState;
use crate::session::Session;
use crate::ws::messages::{ClientMessage, ServerMessage};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use base64::Engine;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// GET /ws — upgrade to the relay protocol.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(state, socket))
}

async fn handle_connection(state: AppState, socket: WebSocket) {
    let client_id = state.next_client_id();
    state.connection_opened();
    info!(client_id, "client connected");

    let (mut sink, stream) = socket.split();
    let mut session = Session::new(
        client_id,
        Arc::clone(&state.backend),
        Arc::clone(&state.meter),
        state.config.recognition.clone(),
        state.config.billing.clone(),
    );

    if send(&mut sink, &ServerMessage::connected(client_id))
        .await
        .is_ok()
    {
        run_message_loop(&state, client_id, &mut session, &mut sink, stream).await;
    }

    // Transport is gone: force teardown, nothing to send.
    session.shutdown();
    state.connection_closed();
    info!(client_id, "client disconnected");
}

async fn run_message_loop(
    state: &AppState,
    client_id: u64,
    session: &mut Session,
    sink: &mut WsSink,
    mut stream: WsStream,
) {
    // Event feed of the session's current backend stream. Replaced wholesale
    // on every `start`, which is what keeps events from a superseded stream
    // from ever reaching this client.
    let mut backend_rx: Option<mpsc::Receiver<StreamEvent>> = None;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let replies =
                            handle_client_text(session, &mut backend_rx, state, client_id, &text)
                                .await;
                        if send_all(sink, &replies).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(payload))) => {
                        // The protocol is JSON text; binary frames are not
                        // part of it.
                        warn!(client_id, bytes = payload.len(), "ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(e)) => {
                        warn!(client_id, error = %e, "websocket receive error");
                        return;
                    }
                }
            }
            event = next_backend_event(&mut backend_rx) => {
                let stream_finished =
                    matches!(event, StreamEvent::End | StreamEvent::Error { .. });
                let replies = session.on_backend_event(event);
                if stream_finished {
                    backend_rx = None;
                }
                if send_all(sink, &replies).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Handle one inbound text frame and return the replies to send.
async fn handle_client_text(
    session: &mut Session,
    backend_rx: &mut Option<mpsc::Receiver<StreamEvent>>,
    state: &AppState,
    client_id: u64,
    text: &str,
) -> Vec<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            // Malformed input is local to this connection: answer with an
            // error and keep the socket open.
            warn!(client_id, error = %e, "malformed client message");
            return vec![ServerMessage::error(format!("Invalid message: {e}"))];
        }
    };

    match message {
        ClientMessage::Start { config } => {
            let (replies, events) = session.start(config).await;
            *backend_rx = events;
            replies
        }
        ClientMessage::Audio { data } => {
            match base64::engine::general_purpose::STANDARD.decode(&data) {
                Ok(bytes) => {
                    session.push_audio(bytes);
                    Vec::new()
                }
                Err(e) => {
                    warn!(client_id, error = %e, "audio payload is not valid base64");
                    vec![ServerMessage::error(format!("Invalid audio payload: {e}"))]
                }
            }
        }
        ClientMessage::Stop => session.stop().into_iter().collect(),
        ClientMessage::Ping => vec![ServerMessage::Pong],
        ClientMessage::CostSummary => {
            vec![ServerMessage::cost_summary(&state.meter.summary())]
        }
        ClientMessage::Unknown => {
            debug!(client_id, "ignoring message with unknown type");
            Vec::new()
        }
    }
}

/// Next event from the current backend stream; pends forever while no
/// stream is open so the `select!` arm simply never fires. A closed channel
/// is folded into `End` (the stream task is gone either way).
async fn next_backend_event(rx: &mut Option<mpsc::Receiver<StreamEvent>>) -> StreamEvent {
    match rx {
        Some(rx) => rx.recv().await.unwrap_or(StreamEvent::End),
        None => std::future::pending().await,
    }
}

async fn send(sink: &mut WsSink, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "failed to serialize outbound message");
            return Ok(());
        }
    };
    sink.send(Message::Text(json)).await
}

async fn send_all(sink: &mut WsSink, messages: &[ServerMessage]) -> Result<(), axum::Error> {
    for message in messages {
        send(sink, message).await?;
    }
    Ok(())
}
