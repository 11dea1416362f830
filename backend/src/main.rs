// Use the library part of the `backend` crate instead of a local module.
use anyhow::Context;
use backend::{
    config::AppConfig,
    db::Database,
    identity::IdentityService,
    token::TokenKeys,
    web_server::{run_server, AppState},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Setup ---
    // 1. Initialize structured logging, INFO unless RUST_LOG says otherwise
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let tokens = TokenKeys::new(&config.jwt).context("failed to set up credential signing")?;

    // 2. Persistence: connect, then bring the schema up to date
    let db = Database::connect(&config.database)
        .await
        .context("failed to reach the database")?;
    if let Err(e) = db.sync().await {
        db.close().await;
        return Err(e).context("failed to synchronise the schema");
    }

    let identity = IdentityService::new(db.clone(), tokens, config.auth.bcrypt_cost);
    let app_state = AppState {
        identity,
        app_config: Arc::new(config),
    };

    // --- Run Server ---
    tracing::info!("Initializing server...");
    let served = run_server(app_state, shutdown_signal()).await;

    db.close().await;
    served.context("server stopped with an error")?;
    tracing::info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received.");
}
