pub mod handlers;
mod operator;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt, FutureExt};
use serde::Deserialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{PlayerId, Role};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// Per-connection context: who is talking to us
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub role: Role,
    /// Set once the connection registers a player
    pub player_id: Option<PlayerId>,
}

impl Connection {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            player_id: None,
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Initial role for a connection; operators must log in unless auth is disabled
fn initial_role(requested: Option<&str>, state: &AppState) -> Role {
    match requested {
        Some("operator") if !state.auth.is_enabled() => Role::Operator,
        Some("player") => Role::Player,
        _ => Role::Viewer,
    }
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Messages that bring a client that missed events back in sync
async fn resync_messages(state: &AppState) -> [ServerMessage; 2] {
    [
        ServerMessage::GameState {
            state: state.snapshot().await,
        },
        ServerMessage::LeaderboardUpdated {
            entries: state.leaderboard().await,
        },
    ]
}

async fn send_resync(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    state: &AppState,
) -> bool {
    for msg in resync_messages(state).await {
        if !send_json(sender, &msg).await {
            return false;
        }
    }
    true
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut conn = Connection::new(initial_role(params.role.as_deref(), &state));

    tracing::info!("WebSocket connected with role: {:?}", conn.role);

    // Subscribe before reading the snapshot so no event falls in between
    let mut broadcast_rx = state.broadcast.subscribe();
    let mut direct_rx = state.direct.subscribe();

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        role: conn.role,
        state: state.snapshot().await,
        leaderboard: state.leaderboard().await,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            // Events for everyone
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(msg) => {
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client lagged behind by {} events, resyncing", skipped);
                        if !send_resync(&mut sender, &state).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Events for the player bound to this connection
            direct_msg = direct_rx.recv() => {
                match direct_msg {
                    Ok(direct) => {
                        if conn.player_id.as_deref() == Some(direct.player_id.as_str())
                            && !send_json(&mut sender, &direct.msg).await
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client lagged behind by {} direct events, resyncing", skipped);
                        if !send_resync(&mut sender, &state).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                // A fault in one action must not take the connection down
                                let handled = AssertUnwindSafe(
                                    handlers::handle_message(client_msg, &mut conn, &state),
                                )
                                .catch_unwind()
                                .await;
                                match handled {
                                    Ok(response) => response,
                                    Err(_) => {
                                        tracing::error!("Handler panicked while processing: {}", text);
                                        Some(ServerMessage::Error {
                                            code: "INTERNAL_ERROR".to_string(),
                                            msg: "Internal error while processing the action".to_string(),
                                        })
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if let Some(player_id) = &conn.player_id {
        state.disconnect_player(player_id).await;
    }
    tracing::info!("WebSocket connection closed for role: {:?}", conn.role);
}
