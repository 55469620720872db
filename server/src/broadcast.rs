//! Encoding of outbound messages and fan-out of state updates.
//!
//! Snapshots are built and serialized once, inside the game loop. Connection
//! tasks only ever see the finished JSON text, so no network write happens
//! while the game state is being touched.

use std::sync::Arc;

use maze_shared::protocol::ServerMsg;
use tokio::sync::broadcast;

use crate::state::GameState;

/// Encoded `update` message, shared by every connection task.
#[derive(Debug, Clone)]
pub struct GameBroadcast(pub Arc<str>);

pub fn encode(msg: &ServerMsg) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Snapshot `state` and hand it to every subscribed connection.
pub fn publish_update(state: &GameState, broadcast_tx: &broadcast::Sender<GameBroadcast>) {
    match encode(&ServerMsg::Update(state.update_snapshot())) {
        Ok(json) => {
            // No subscribers is fine: nobody is connected
            let _ = broadcast_tx.send(GameBroadcast(json.into()));
        }
        Err(e) => tracing::error!("Failed to encode update: {}", e),
    }
}
