//! Core library surface for the school manager.
//!
//! Layers, bottom up: the SQLite record store ([`db`]), the command router
//! that validates requests and runs them against the store ([`router`]), the
//! bridge that moves the router onto its own thread ([`bridge`]), and the
//! terminal UI that talks only to the bridge ([`ui`]).
pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod router;
pub mod ui;

pub use bridge::Bridge;
pub use config::{AppMode, Config};
pub use db::Store;
pub use error::{BridgeError, CommandError, Failure, StoreError};
pub use logging::init_logging;
pub use router::Router;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
