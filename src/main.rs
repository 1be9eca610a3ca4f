use std::sync::Arc;

use netra::api::server::start_server;
use netra::api::types::ApiContext;
use netra::config::{Config, APP_NAME, APP_VERSION};

#[tokio::main]
async fn main() {
    netra::init_tracing();
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    let config = Config::from_env();

    if let Err(e) = prepare(&config) {
        tracing::error!("startup failed: {e}");
        std::process::exit(1);
    }

    let ctx = ApiContext::new(Arc::new(config));
    let mut server = match start_server(ctx).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %server.addr, "listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutting down");
    server.shutdown();
}

/// Data directory, schema migrations, bootstrap admin.
fn prepare(config: &Config) -> Result<(), String> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("cannot create data dir: {e}"))?;
    }
    std::fs::create_dir_all(&config.uploads_dir)
        .map_err(|e| format!("cannot create uploads dir: {e}"))?;

    let conn =
        netra::db::open_database(&config.db_path).map_err(|e| format!("database setup: {e}"))?;
    netra::ensure_bootstrap_admin(&conn, config)
        .map_err(|e| format!("bootstrap admin: {e}"))?;
    Ok(())
}
