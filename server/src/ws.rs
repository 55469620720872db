use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use maze_shared::protocol::{ClientMsg, ServerMsg};
use tokio::sync::{broadcast, mpsc, oneshot};
use tower_http::cors::CorsLayer;

use crate::broadcast::{encode, GameBroadcast};
use crate::game_loop::{GameCommand, Joined, PlayerAction};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub max_message_bytes: usize,
}

/// HTTP router exposing the game at `/ws`.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.max_message_size(app_state.max_message_bytes)
        .on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Handshake: the first frame is the bare player name, not JSON
    let Some(name) = read_name(&mut stream).await else {
        tracing::debug!("Connection closed before sending a name");
        return;
    };

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::PlayerJoin {
            name,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send PlayerJoin command");
        return;
    }

    let Joined {
        id: my_id,
        init,
        updates: mut broadcast_rx,
    } = match resp_rx.await {
        Ok(Some(joined)) => joined,
        Ok(None) => {
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
        Err(_) => {
            tracing::error!("Failed to receive init snapshot");
            return;
        }
    };

    tracing::info!("Player {} connected", my_id);

    let sent_init = match encode(&ServerMsg::Init(init)) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode init for player {}: {}", my_id, e);
            false
        }
    };

    if sent_init {
        loop {
            tokio::select! {
                // Client -> Server
                msg = stream.next() => {
                    let payload = match msg {
                        Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                        Some(Ok(Message::Binary(bytes))) => bytes.to_vec(),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue, // Ignore ping/pong
                        Some(Err(e)) => {
                            tracing::debug!("Player {} read error: {}", my_id, e);
                            break;
                        }
                    };
                    let Some(action) = decode_action(my_id, &payload) else {
                        continue;
                    };
                    if app_state
                        .game_tx
                        .send(GameCommand::Action { id: my_id, action })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }

                // Server -> Client (broadcast)
                result = broadcast_rx.recv() => {
                    match result {
                        Ok(GameBroadcast(json)) => {
                            if let Err(e) = sink.send(Message::Text(json.to_string().into())).await {
                                tracing::warn!("Failed to send update to player {}: {}", my_id, e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Every update is a full snapshot, so skipping some is fine
                            tracing::warn!("Player {} lagged by {} messages", my_id, n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::PlayerLeave { id: my_id })
        .await;
    tracing::info!("Player {} disconnected", my_id);
}

/// Wait for the first data frame and take it as the player's name.
async fn read_name(stream: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => return Some(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Handshake read error: {}", e);
                return None;
            }
        }
    }
    None
}

/// Decode one inbound frame. Anything unusable is logged and dropped; the
/// connection stays open.
fn decode_action(id: u32, payload: &[u8]) -> Option<PlayerAction> {
    match serde_json::from_slice::<ClientMsg>(payload) {
        Ok(ClientMsg::Move { direction }) => Some(PlayerAction::Move(direction)),
        Ok(ClientMsg::Shoot) => Some(PlayerAction::Shoot),
        Ok(ClientMsg::Unknown) => {
            tracing::warn!("Player {} sent an unknown message type", id);
            None
        }
        Err(e) => {
            tracing::warn!("Invalid JSON from player {}: {}", id, e);
            None
        }
    }
}
