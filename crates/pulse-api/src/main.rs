//! Pulse API Server
//!
//! Loads configuration, runs migrations, starts the blacklist sweeper and
//! serves the authentication API until ctrl-c.

use anyhow::Context;
use pulse_api::{auth::spawn_sweeper, create_router, logging::init_tracing, state::AppState};
use pulse_core::{
    migrate::migrate,
    store::{connect, PgBlacklistStore, PgUserStore},
    AppConfig, Clock, SystemClock,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match std::env::var("PULSE_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);

    config.validate().context("invalid configuration")?;
    if config.is_development() && config.auth.jwt_secret == pulse_core::config::DEFAULT_JWT_SECRET {
        tracing::warn!("using the built-in development JWT secret");
    }
    let config = Arc::new(config);

    let pool = connect(&config.database).await?;
    migrate(&pool).await.context("database migration failed")?;
    tracing::info!("database migrations applied");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(PgUserStore::from_pool(pool.clone())),
        Arc::new(PgBlacklistStore::from_pool(pool.clone())),
        clock.clone(),
    )?);

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        state.auth.blacklist().clone(),
        clock,
        config.blacklist.sweep_interval(),
        shutdown.clone(),
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Pulse API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    sweeper.await.ok();
    pool.close().await;

    Ok(())
}
