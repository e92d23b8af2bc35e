use std::sync::Arc;

use anyhow::Context;
use bizcrm_core::{
    auth::JwtKeys,
    config::Config,
    create_router, seed,
    storage::{MemStorage, Storage},
    worker::OverdueSweeper,
    AppState,
};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting BizCRM server...");

    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = Arc::new(MemStorage::new());
    seed::seed_users(storage.as_ref(), config.bcrypt_cost).await?;
    if config.seed_demo_data {
        seed::seed_demo_data(storage.as_ref()).await?;
    }

    let sweeper = (config.overdue_sweep_interval_seconds > 0)
        .then(|| OverdueSweeper::new(storage.clone(), config.overdue_sweep_interval_seconds));
    if let Some(sweeper) = &sweeper {
        tokio::spawn(sweeper.clone().start());
    }

    let state = AppState::new(storage, JwtKeys::new(&config.jwt_secret, config.jwt_expiration_seconds));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("Server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
