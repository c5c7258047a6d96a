#![forbid(unsafe_code)]

//! Remote Game of Life: a server that owns one long-running simulation and
//! a controller session that starts it, polls it, pauses it, saves it and
//! quits it while it runs.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod rpc;
pub mod session;

pub use config::{ServerConfig, SessionConfig};
pub use coordinator::RunCoordinator;
pub use errors::{AppError, Result};
