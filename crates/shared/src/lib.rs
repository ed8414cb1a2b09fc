//! Shared types, errors, and configuration for LedgerBank.
//!
//! This crate provides common types used across all other crates:
//! - Decimal identifiers and their generator
//! - Application-wide error types
//! - Configuration management
//! - Session token claims and the JWT service

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{IssuedToken, JwtConfig, JwtError, JwtService};
