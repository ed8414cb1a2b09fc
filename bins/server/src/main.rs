//! LedgerBank API Server
//!
//! Main entry point for the LedgerBank backend service.

use std::time::Duration;

use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerbank_api::{AppState, create_router};
use ledgerbank_db::{SessionRepository, connect_with, migration::Migrator};
use ledgerbank_shared::{AppConfig, JwtConfig, JwtService};

/// How often expired session rows are purged.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerbank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    Migrator::up(&db, None)
        .await
        .context("failed to apply migrations")?;
    info!("Schema is up to date");

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.session.secret.clone(),
        session_ttl_secs: i64::try_from(config.session.ttl_secs)
            .context("session.ttl_secs is out of range")?,
    });

    tokio::spawn(sweep_expired_sessions(SessionRepository::new(db.clone())));

    let state = AppState::new(db, jwt_service, config.ledger.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        home_bank_id = config.ledger.home_bank_id,
        conflict_retries = config.ledger.conflict_retries,
        "Server listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn sweep_expired_sessions(sessions: SessionRepository) {
    let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        match sessions.cleanup_expired().await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "expired sessions purged"),
            Err(e) => warn!(error = %e, "session sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
