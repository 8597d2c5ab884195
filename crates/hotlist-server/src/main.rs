// hotlist service entry point.
//
// Startup sequence:
// 1. Load config
// 2. Initialize tracing (stderr, or a log file when configured)
// 3. Open database
// 4. Bind and run the WebSocket server until Ctrl+C

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use hotlist_core::db::Database;
use hotlist_core::HotList;
use hotlist_server::config::{self, LoggingConfig};
use hotlist_server::ws_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;
    info!("hotlist starting up");

    // 3. Open database
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path = config.db_path.to_string_lossy();
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {db_path}");

    let service = Arc::new(HotList::new(db, config.default_vote_quota));

    // 4. Serve until Ctrl+C
    let addr = config
        .server
        .socket_addr()
        .context("invalid server address")?;
    let listener = ws_server::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket server on {addr}"))?;

    tokio::select! {
        result = ws_server::run(listener, service) => {
            if let Err(e) = &result {
                error!("WebSocket server error: {e}");
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    info!("hotlist shut down cleanly");
    Ok(())
}

/// Initialize tracing, writing to `hotlist.log` inside the configured log
/// directory, or to stderr when none is set.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .context("invalid logging filter")?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let log_file = std::fs::File::create(dir.join("hotlist.log"))?;
            let subscriber = builder.with_writer(log_file).with_ansi(false).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}
