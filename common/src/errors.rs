//! Error types shared across the workspace.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application level error.
///
/// Per-company failures all surface as one of the connection, query or load
/// variants; everything else is a startup or tooling failure.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input such as a bad company descriptor or table name.
    #[error("validation error: {0}")]
    Validation(String),

    /// The source or target database could not be reached.
    #[error("connection failed: {0}")]
    DatabaseConnection(String),

    /// A statement was rejected or failed on the data source.
    #[error("query failed: {0}")]
    DatabaseQuery(String),

    /// The transform/load step failed.
    #[error("load failed: {0}")]
    Load(String),

    /// The extract statement contains a forbidden operation.
    #[error("unsafe sql: {0}")]
    UnsafeSql(String),

    /// The configured driver is not available in this build.
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// Filesystem failure (company list, table list).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Short label for the failure class, used in operator log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
            AppError::DatabaseConnection(_) => "connection",
            AppError::DatabaseQuery(_) | AppError::UnsafeSql(_) => "query",
            AppError::Load(_) => "load",
            AppError::UnsupportedDriver(_) => "driver",
            AppError::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(format!("invalid json: {}", err))
    }
}
