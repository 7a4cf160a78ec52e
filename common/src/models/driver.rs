//! Source driver selection.

use std::str::FromStr;

use crate::errors::AppError;

/// Driver used to read company files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDriver {
    /// ODBC driver for the accounting package (production).
    Odbc,
    /// SQLite exports of company files.
    Sqlite,
}

impl std::fmt::Display for SourceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceDriver::Odbc => write!(f, "odbc"),
            SourceDriver::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for SourceDriver {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "odbc" => Ok(SourceDriver::Odbc),
            "sqlite" => Ok(SourceDriver::Sqlite),
            other => Err(AppError::Config(format!("unknown source driver '{}'", other))),
        }
    }
}
