//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Bearer session authentication middleware
//! - The JSON error envelope

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use ledgerbank_core::ledger::{IdentifierPolicy, LedgerRegistry, LedgerStore, TransferEngine};
use ledgerbank_core::statement::{StatementReconstructor, StatementRenderer, TextStatementRenderer};
use ledgerbank_db::SeaOrmLedgerStore;
use ledgerbank_shared::JwtService;
use ledgerbank_shared::config::LedgerConfig;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, for users, sessions and banks.
    pub db: Arc<DatabaseConnection>,
    /// The ledger store every ledger component shares.
    pub ledger: Arc<dyn LedgerStore>,
    /// Executes transfers, top-ups and payments.
    pub engine: TransferEngine,
    /// Builds activity feeds and statements.
    pub statements: StatementReconstructor,
    /// Opens accounts, issues cards, sets special PINs.
    pub registry: LedgerRegistry,
    /// Renders statement documents.
    pub renderer: Arc<dyn StatementRenderer>,
    /// JWT service for session tokens.
    pub jwt_service: Arc<JwtService>,
    /// Ledger tuning.
    pub ledger_config: LedgerConfig,
}

impl AppState {
    /// Builds the state over a PostgreSQL ledger store.
    #[must_use]
    pub fn new(db: DatabaseConnection, jwt_service: JwtService, ledger_config: LedgerConfig) -> Self {
        let ledger: Arc<dyn LedgerStore> = Arc::new(SeaOrmLedgerStore::new(db.clone()));
        Self::with_ledger(db, ledger, jwt_service, ledger_config)
    }

    /// Builds the state over any ledger store.
    #[must_use]
    pub fn with_ledger(
        db: DatabaseConnection,
        ledger: Arc<dyn LedgerStore>,
        jwt_service: JwtService,
        ledger_config: LedgerConfig,
    ) -> Self {
        let identifiers = IdentifierPolicy::new(ledger_config.identifier_attempts);

        Self {
            db: Arc::new(db),
            engine: TransferEngine::new(Arc::clone(&ledger))
                .with_identifier_policy(identifiers)
                .with_conflict_retries(ledger_config.conflict_retries),
            statements: StatementReconstructor::new(Arc::clone(&ledger)).with_limits(
                ledger_config.movements_default_limit,
                ledger_config.movements_max_limit,
            ),
            registry: LedgerRegistry::new(Arc::clone(&ledger)).with_identifier_policy(identifiers),
            renderer: Arc::new(TextStatementRenderer::default()),
            ledger,
            jwt_service: Arc::new(jwt_service),
            ledger_config,
        }
    }

    /// Identifier retry policy from configuration.
    #[must_use]
    pub fn identifier_policy(&self) -> IdentifierPolicy {
        IdentifierPolicy::new(self.ledger_config.identifier_attempts)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
