//! WebSocket endpoint: one voice conversation per connection.

use crate::AppState;
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{FutureExt, SinkExt, StreamExt};
use parley_types::{IncomingEvent, OutgoingEvent};
use parley_voice::{ConversationSession, EventSink, ScratchDir, TurnError};
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

/// Message sent when a turn panics.
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Handles WebSocket upgrade requests.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Writes turn events to the socket as JSON text frames.
struct WsEventSink<'a> {
    sender: &'a mut SplitSink<WebSocket, AxumMessage>,
}

#[async_trait]
impl EventSink for WsEventSink<'_> {
    async fn send_event(&mut self, event: OutgoingEvent) -> Result<(), TurnError> {
        let json = serde_json::to_string(&event)
            .map_err(|e| TurnError::Transport(format!("failed to encode {}: {}", event.kind(), e)))?;
        self.sender
            .send(AxumMessage::Text(json.into()))
            .await
            .map_err(|e| TurnError::Transport(e.to_string()))
    }
}

/// What the receive loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let connection_id = Uuid::new_v4();
    tracing::info!(connection_id = %connection_id, remote = %addr, "client connected");

    let (mut sender, mut receiver) = socket.split();

    let scratch = match ScratchDir::create_in(&state.scratch_root) {
        Ok(scratch) => scratch,
        Err(e) => {
            tracing::error!(
                connection_id = %connection_id,
                root = %state.scratch_root.display(),
                "failed to create scratch directory: {}",
                e
            );
            let mut sink = WsEventSink {
                sender: &mut sender,
            };
            if let Err(e) = sink
                .send_event(OutgoingEvent::error("Failed to initialize session storage"))
                .await
            {
                tracing::debug!(connection_id = %connection_id, "could not report setup failure: {}", e);
            }
            let _ = sender.close().await;
            return;
        }
    };
    tracing::debug!(
        connection_id = %connection_id,
        path = %scratch.path().display(),
        "created scratch directory"
    );

    let mut session = ConversationSession::new(connection_id, state.services.clone());
    let turns = receive_loop(&mut session, &scratch, &mut sender, &mut receiver).await;

    // Single exit path: everything below runs once per connection.
    let scratch_path = scratch.path().to_path_buf();
    match scratch.close() {
        Ok(()) => tracing::debug!(connection_id = %connection_id, "removed scratch directory"),
        Err(e) => tracing::warn!(
            connection_id = %connection_id,
            path = %scratch_path.display(),
            "failed to remove scratch directory: {}",
            e
        ),
    }
    if let Err(e) = sender.close().await {
        tracing::debug!(connection_id = %connection_id, "socket already closed: {}", e);
    }
    tracing::info!(
        connection_id = %connection_id,
        turns,
        history_len = session.history().len(),
        "client cleaned up"
    );
}

/// Reads frames until the client goes away or the connection must end.
/// Returns the number of completed turns.
async fn receive_loop(
    session: &mut ConversationSession,
    scratch: &ScratchDir,
    sender: &mut SplitSink<WebSocket, AxumMessage>,
    receiver: &mut SplitStream<WebSocket>,
) -> usize {
    let connection_id = session.connection_id();
    let mut turns = 0;

    loop {
        let text = match receiver.next().await {
            Some(Ok(AxumMessage::Text(text))) => text,
            Some(Ok(AxumMessage::Ping(_))) | Some(Ok(AxumMessage::Pong(_))) => continue,
            Some(Ok(AxumMessage::Close(_))) | None => {
                tracing::info!(connection_id = %connection_id, "client disconnected");
                break;
            }
            Some(Ok(AxumMessage::Binary(_))) => {
                tracing::warn!(connection_id = %connection_id, "binary frame received, closing");
                break;
            }
            Some(Err(e)) => {
                tracing::warn!(connection_id = %connection_id, "websocket receive error: {}", e);
                break;
            }
        };

        let event = match IncomingEvent::from_frame(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, "malformed frame, closing: {}", e);
                break;
            }
        };

        let (mime, audio) = match event {
            IncomingEvent::Audio { mime, audio } => (mime, audio),
            IncomingEvent::InvalidAudio(message) => {
                let err = TurnError::Validation(message);
                let mut sink = WsEventSink {
                    sender: &mut *sender,
                };
                match report_failure(&mut sink, connection_id, &err).await {
                    Flow::Continue => continue,
                    Flow::Stop => break,
                }
            }
            IncomingEvent::Unknown => {
                tracing::debug!(connection_id = %connection_id, "ignoring unrecognized event");
                continue;
            }
        };

        match run_turn(session, scratch, sender, mime.as_deref(), audio.as_deref()).await {
            (Flow::Continue, completed) => turns += usize::from(completed),
            (Flow::Stop, _) => break,
        }
    }

    turns
}

/// Runs one turn, reporting failures to the client. A panic inside the turn
/// is caught here and reported like any other failure.
async fn run_turn(
    session: &mut ConversationSession,
    scratch: &ScratchDir,
    sender: &mut SplitSink<WebSocket, AxumMessage>,
    mime: Option<&str>,
    audio: Option<&str>,
) -> (Flow, bool) {
    let connection_id = session.connection_id();

    let outcome = {
        let mut sink = WsEventSink {
            sender: &mut *sender,
        };
        AssertUnwindSafe(session.process_turn(scratch, mime, audio, &mut sink))
            .catch_unwind()
            .await
    };

    let mut sink = WsEventSink { sender };
    match outcome {
        Ok(Ok(_report)) => (Flow::Continue, true),
        Ok(Err(e)) => (report_failure(&mut sink, connection_id, &e).await, false),
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(connection_id = %connection_id, "turn panicked: {}", detail);
            session.abandon_turn();
            (report_message(&mut sink, connection_id, INTERNAL_ERROR_MESSAGE).await, false)
        }
    }
}

/// Logs a failed turn and tells the client. The loop continues only if the
/// client could be told.
async fn report_failure(sink: &mut dyn EventSink, connection_id: Uuid, err: &TurnError) -> Flow {
    if err.is_transport() {
        tracing::warn!(connection_id = %connection_id, "lost client mid-turn: {}", err);
    } else {
        tracing::error!(connection_id = %connection_id, "turn failed: {}", err);
    }
    report_message(sink, connection_id, &err.to_string()).await
}

async fn report_message(sink: &mut dyn EventSink, connection_id: Uuid, message: &str) -> Flow {
    match sink.send_event(OutgoingEvent::error(message)).await {
        Ok(()) => Flow::Continue,
        Err(e) => {
            tracing::warn!(
                connection_id = %connection_id,
                "failed to report error to client: {}",
                e
            );
            Flow::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Refuses every event, like a socket whose peer has gone.
    struct ClosedSink;

    #[async_trait]
    impl EventSink for ClosedSink {
        async fn send_event(&mut self, event: OutgoingEvent) -> Result<(), TurnError> {
            Err(TurnError::Transport(format!("{} dropped: connection closed", event.kind())))
        }
    }

    #[tokio::test]
    async fn reported_failure_keeps_the_loop_going() {
        let mut sink: Vec<OutgoingEvent> = Vec::new();
        let err = TurnError::Validation("Audio data too short or empty".to_string());

        let flow = report_failure(&mut sink, Uuid::new_v4(), &err).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            sink,
            vec![OutgoingEvent::error("Audio data too short or empty")]
        );
    }

    #[tokio::test]
    async fn unreportable_failure_stops_the_loop() {
        let err = TurnError::Resource("TTS audio file was not created".to_string());
        let flow = report_failure(&mut ClosedSink, Uuid::new_v4(), &err).await;
        assert_eq!(flow, Flow::Stop);

        let err = TurnError::Transport("connection reset".to_string());
        let flow = report_failure(&mut ClosedSink, Uuid::new_v4(), &err).await;
        assert_eq!(flow, Flow::Stop);
    }

    #[tokio::test]
    async fn internal_error_message_is_generic() {
        let mut sink: Vec<OutgoingEvent> = Vec::new();
        let flow = report_message(&mut sink, Uuid::new_v4(), INTERNAL_ERROR_MESSAGE).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(sink, vec![OutgoingEvent::error("Internal server error")]);
    }
}
