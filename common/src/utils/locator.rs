//! Connection locator builders.
//!
//! Turns a company descriptor into the string a source driver opens.

use crate::config::SourceConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{CompanyDescriptor, SourceDriver, SourceLocator};

/// Builds the driver connection string for `company`.
///
/// ODBC file locators are injected into the shared driver DSN
/// (`DSN=..;DFQ=<file>;OpenMode=..;`) so no per-company DSN has to exist.
///
/// # Errors
/// Returns `AppError::Validation` when the locator cannot be expressed for
/// the configured driver.
pub fn connection_locator(source: &SourceConfig, company: &CompanyDescriptor) -> AppResult<String> {
    match (source.driver, &company.locator) {
        (SourceDriver::Odbc, SourceLocator::File(path)) => Ok(format!(
            "DSN={};DFQ={};OpenMode={};",
            source.odbc_dsn, path, source.odbc_open_mode
        )),
        (SourceDriver::Odbc, SourceLocator::Dsn(name)) => Ok(format!("DSN={};", name)),
        (SourceDriver::Sqlite, SourceLocator::File(path)) => Ok(format!("sqlite:{}?mode=ro", path)),
        (SourceDriver::Sqlite, SourceLocator::Dsn(name)) => Err(AppError::Validation(format!(
            "company '{}': sqlite requires file_path, got dsn '{}'",
            company.id, name
        ))),
    }
}
