//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Session token configuration.
    pub session: SessionConfig,
    /// Ledger engine tuning.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    900 // 15 minutes
}

/// Ledger engine tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Bank new registrations are opened at.
    #[serde(default = "default_home_bank_id")]
    pub home_bank_id: i32,
    /// Attempts at drawing a free identifier before giving up.
    #[serde(default = "default_identifier_attempts")]
    pub identifier_attempts: u32,
    /// Re-runs of a transfer after losing a concurrent balance race.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Movements returned when the caller gives no limit.
    #[serde(default = "default_movements_limit")]
    pub movements_default_limit: u64,
    /// Upper bound on a caller-supplied movements limit.
    #[serde(default = "default_movements_max_limit")]
    pub movements_max_limit: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            home_bank_id: default_home_bank_id(),
            identifier_attempts: default_identifier_attempts(),
            conflict_retries: default_conflict_retries(),
            movements_default_limit: default_movements_limit(),
            movements_max_limit: default_movements_max_limit(),
        }
    }
}

fn default_home_bank_id() -> i32 {
    1
}

fn default_identifier_attempts() -> u32 {
    5
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_movements_limit() -> u64 {
    10
}

fn default_movements_max_limit() -> u64 {
    100
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default.toml`,
    /// `config/{RUN_MODE}.toml`, then `LEDGERBANK__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGERBANK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_applies_defaults() {
        temp_env::with_vars(
            [
                ("LEDGERBANK__DATABASE__URL", Some("postgres://localhost/ledgerbank")),
                ("LEDGERBANK__SESSION__SECRET", Some("test-secret")),
                ("RUN_MODE", Some("test-missing-profile")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/ledgerbank");
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.session.ttl_secs, 900);
                assert_eq!(config.ledger.home_bank_id, 1);
                assert_eq!(config.ledger.identifier_attempts, 5);
                assert_eq!(config.ledger.movements_default_limit, 10);
            },
        );
    }

    #[test]
    fn test_load_requires_session_secret() {
        temp_env::with_vars(
            [
                ("LEDGERBANK__DATABASE__URL", Some("postgres://localhost/ledgerbank")),
                ("LEDGERBANK__SESSION__SECRET", None),
                ("RUN_MODE", Some("test-missing-profile")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.conflict_retries, 3);
        assert_eq!(ledger.movements_max_limit, 100);
    }
}
