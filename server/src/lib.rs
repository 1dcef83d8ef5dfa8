//! Authoritative arena server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod access;
pub mod agent;
pub mod bullet;
pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod game_loop;
pub mod player;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod simulation;
pub mod spawner;
pub mod ws;
