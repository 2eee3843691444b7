//! Ratatui front-end. Every read and write goes through the [`Bridge`], so
//! the screens only ever see serialized records.
//!
//! [`Bridge`]: crate::bridge::Bridge

mod app;
mod dashboard;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
