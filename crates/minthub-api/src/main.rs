//! minthub API server: wires configuration, the database, the
//! transaction executor, and the HTTP router.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use minthub_api::{app, AppState};
use minthub_core::defaults;
use minthub_db::Database;
use minthub_jobs::{ChainEnv, ExecutorBuilder, ExecutorConfig, HttpGateway};

/// Ensure the directory for a file-backed SQLite URL exists.
fn ensure_data_dir(database_url: &str) -> anyhow::Result<()> {
    if let Some(path) = database_url.strip_prefix("sqlite://") {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "minthub_api=debug,minthub_jobs=debug,tower_http=debug".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    // Connect to database
    info!("Connecting to database...");
    ensure_data_dir(&database_url)?;
    let db = Database::connect(&database_url).await?;
    info!("Database ready");

    // Build and start the transaction executor
    let config = ExecutorConfig::from_env();
    let gateway = Arc::new(HttpGateway::from_env());
    let chain_env = Arc::new(ChainEnv::new(config.clone(), gateway));
    let executor = ExecutorBuilder::new(Arc::new(db.jobs.clone()))
        .with_config(config)
        .with_handlers(chain_env.handlers())
        .build();
    let executor_handle = executor.start();

    // Serve the API
    let router = app(AppState { db });
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "minthub API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop polling; an in-flight job is awaited by the worker task.
    executor_handle.shutdown().await;
    Ok(())
}
