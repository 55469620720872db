use maze_shared::direction::Direction;
use maze_shared::protocol::InitMsg;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::broadcast::{publish_update, GameBroadcast};
use crate::config::ServerConfig;
use crate::state::GameState;

/// A validated request from a connected player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Move(Direction),
    Shoot,
}

/// Reply to an accepted join.
pub struct Joined {
    pub id: u32,
    pub init: InitMsg,
    /// Subscribed before the join update is published, so it misses nothing
    /// that follows the init snapshot
    pub updates: broadcast::Receiver<GameBroadcast>,
}

/// Commands from client connections to the game loop
pub enum GameCommand {
    PlayerJoin {
        name: String,
        /// `None` when the player could not be admitted
        response: oneshot::Sender<Option<Joined>>,
    },
    PlayerLeave {
        id: u32,
    },
    Action {
        id: u32,
        action: PlayerAction,
    },
}

/// Run the main game loop. Owns all game state.
///
/// Every mutation arrives here as a command or a tick and is applied one at a
/// time, so no two updates ever interleave.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    server_config: ServerConfig,
) {
    let mut state = GameState::new(&server_config);

    let tick_duration = Duration::from_millis(server_config.tick_interval_ms);
    let mut tick_interval = tokio::time::interval(tick_duration);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                for hit in state.tick() {
                    tracing::info!("Player {} hit player {}", hit.shooter, hit.victim);
                }
                publish_update(&state, &broadcast_tx);
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                if handle_command(&mut state, &broadcast_tx, cmd) {
                    publish_update(&state, &broadcast_tx);
                }
            }
        }
    }

    tracing::info!("Game loop ended");
}

/// Apply one command. Returns true if clients should be sent a fresh update.
fn handle_command(
    state: &mut GameState,
    broadcast_tx: &broadcast::Sender<GameBroadcast>,
    cmd: GameCommand,
) -> bool {
    match cmd {
        GameCommand::PlayerJoin { name, response } => {
            let Some(id) = state.admit_player(&name) else {
                tracing::warn!("Rejected join from {:?}: no room in the maze", name);
                let _ = response.send(None);
                return false;
            };
            let joined = Joined {
                id,
                init: state.init_snapshot(id),
                updates: broadcast_tx.subscribe(),
            };
            if response.send(Some(joined)).is_err() {
                // Connection dropped while waiting for its snapshot
                state.remove_player(id);
                return false;
            }
            tracing::info!("Player {} joined as {:?}", id, state.players[&id].name);
            true
        }
        GameCommand::PlayerLeave { id } => match state.remove_player(id) {
            Some(player) => {
                tracing::info!("Player {} ({}) left", id, player.name);
                true
            }
            None => false,
        },
        GameCommand::Action { id, action } => {
            let outcome = match action {
                PlayerAction::Move(direction) => state.apply_move(id, direction),
                PlayerAction::Shoot => state.apply_shoot(id),
            };
            tracing::debug!("Player {} {:?} -> {:?}", id, action, outcome);
            outcome.is_accepted()
        }
    }
}
