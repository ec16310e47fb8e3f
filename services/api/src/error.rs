//! services/api/src/error.rs
//!
//! Startup failures of the Analista+ API. Request-time failures never reach
//! this type; handlers turn `PortError`s into HTTP statuses instead.

use crate::config::ConfigError;
use analista_core::ports::PortError;

/// Everything that can stop the `api` binary before or while it serves.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An environment variable was missing or unparseable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The data directory or the Gemini client could not be set up.
    #[error("Startup failed: {0}")]
    Port(#[from] PortError),

    /// The usage statistics database was unreachable.
    #[error("Statistics database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The `generation_stats` migrations could not be applied.
    #[error("Statistics migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener or serving failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
