//! Types shared between the maze server and its clients.

pub mod config;
pub mod direction;
pub mod protocol;
