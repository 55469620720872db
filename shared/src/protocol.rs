use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::direction::Direction;

// === Server -> Client ===
//
// Server messages are encode-only: `players` is keyed by integer id, which JSON
// carries as string keys. Clients read these messages as plain JSON.

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "init")]
    Init(InitMsg),
    #[serde(rename = "update")]
    Update(UpdateMsg),
}

/// Full snapshot sent once, to the joining client only.
#[derive(Debug, Clone, Serialize)]
pub struct InitMsg {
    pub id: u32,
    /// Rows of the grid, `0` = open, `1` = wall
    pub maze: Vec<Vec<u8>>,
    pub players: BTreeMap<u32, PlayerWire>,
    pub bullets: Vec<BulletWire>,
}

/// Per-tick / per-action state. The maze is never repeated here.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMsg {
    pub players: BTreeMap<u32, PlayerWire>,
    pub bullets: Vec<BulletWire>,
    pub status: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerWire {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub score: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletWire {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub owner: u32,
    pub distance: u32,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "move")]
    Move { direction: Direction },
    #[serde(rename = "shoot")]
    Shoot,
    /// Any well-formed message with an unrecognized `type`
    #[serde(other)]
    Unknown,
}
