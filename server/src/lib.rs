//! Maze arena server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod broadcast;
pub mod config;
pub mod game_loop;
pub mod maze;
pub mod player;
pub mod projectile;
pub mod state;
pub mod status;
pub mod ws;
