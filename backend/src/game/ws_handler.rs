use super::core::messages::{ClientMessage, ServerMessage};
use super::engine::{
    ChatModel, ContentSource, GameSession, SessionConfig, SessionError, SessionHandle,
};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Everything a new connection needs to spawn its session
pub struct PlayState {
    pub source: Arc<ContentSource>,
    pub model: Option<Arc<ChatModel>>,
    pub config: SessionConfig,
}

/// Run one WebSocket connection with its own game session.
/// Session events and connection-level errors are both forwarded to the socket.
pub async fn run_connection(socket: WebSocket, state: Arc<PlayState>) {
    info!("New play WebSocket connection");
    let (sender, receiver) = socket.split();

    let session = GameSession::spawn(
        Arc::clone(&state.source),
        state.model.clone(),
        state.config.clone(),
    );
    let (replies_tx, replies_rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(send_loop(sender, session.subscribe(), replies_rx));
    let mut recv_task = tokio::spawn(receive_loop(receiver, session, replies_tx));

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Play WebSocket connection closed");
}

async fn send_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut events: broadcast::Receiver<ServerMessage>,
    mut replies: mpsc::UnboundedReceiver<ServerMessage>,
) {
    loop {
        let msg = tokio::select! {
            event = events.recv() => match event {
                Ok(msg) => msg,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Client fell behind session events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            Some(reply) = replies.recv() => reply,
        };

        debug!(?msg, "Sending message to client");
        let Ok(json) = serde_json::to_string(&msg) else {
            warn!(?msg, "Failed to serialize server message");
            continue;
        };
        if sender.send(Message::Text(json)).await.is_err() {
            break;
        }
    }
}

async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    session: SessionHandle,
    replies: mpsc::UnboundedSender<ServerMessage>,
) {
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            debug!("Received non-text message, ignoring");
            continue;
        };

        debug!(raw = %text, "Received message");

        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
            warn!(raw = %text, "Failed to parse client message");
            let _ = replies.send(ServerMessage::Error {
                message: "Unrecognized message".to_string(),
            });
            continue;
        };

        let result = match client_msg {
            ClientMessage::Start { mode, filter_key } => session.start(mode, filter_key).await,
            ClientMessage::Submit { response } => session.submit(response).await,
            ClientMessage::Reset => session.reset().await,
        };

        match result {
            Ok(()) => {}
            Err(SessionError::Closed) => break,
            Err(e) => {
                let _ = replies.send(ServerMessage::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}
