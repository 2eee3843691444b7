//! Binary entry point: read the configuration, bring up logging and the
//! store, move the command router onto its thread, and drive the Ratatui
//! event loop until the user exits.
use anyhow::Context;
use school_manager::{init_logging, run_app, App, Bridge, Config, Router, Store};
use tracing::{error, info};

/// Returning a `Result` bubbles fatal startup problems (an unwritable data
/// directory, an invalid log filter) to the terminal instead of crashing
/// silently.
fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _guard = init_logging(&config)?;
    info!(mode = ?config.mode, db = %config.db_path.display(), "starting school manager");

    let store = Store::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let bridge = Bridge::spawn(Router::new(store))?;

    let mut app = App::new(bridge);
    let result = run_app(&mut app);
    if let Err(err) = &result {
        error!(error = %err, "terminal loop failed");
    }

    app.into_bridge().shutdown()?;
    info!("school manager stopped");
    result
}
