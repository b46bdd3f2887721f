//! `luna-server` — serves the license gate over HTTP.
//!
//! Environment:
//! - `LUNA_CONFIG` — path to a TOML config file (default `luna.toml`; missing file means defaults)
//! - `LUNA_HTTP_BIND` — overrides `server.bind`
//! - `LUNA_LOG` — overrides `logging.level`

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use luna_core::runtime::RuntimeOptions;
use luna_core::tracing::init_tracing;
use luna_core::{LunaConfig, LunaRuntime};
use luna_server::{router, AppState};
use luna_storage::{Database, SqliteOptionStore, SqliteUserDirectory};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::var("LUNA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("luna.toml"));
    let config = LunaConfig::load(&config_path)?;
    init_tracing(&config.logging);

    let bind = env::var("LUNA_HTTP_BIND").unwrap_or_else(|_| config.server.effective_bind().to_string());
    let addr: SocketAddr = bind.parse()?;

    let db = Arc::new(if config.storage.in_memory {
        Database::open_in_memory()?
    } else {
        Database::open(Path::new(config.storage.effective_db_path()))?
    });
    let accounts = Arc::new(SqliteUserDirectory::new(db.clone()));
    let runtime = Arc::new(LunaRuntime::new(
        config,
        RuntimeOptions::new(Arc::new(SqliteOptionStore::new(db)), accounts.clone()),
    )?);
    runtime.seed()?;

    let app = router(AppState::new(runtime, accounts));
    info!(%addr, config = %config_path.display(), "luna-server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
