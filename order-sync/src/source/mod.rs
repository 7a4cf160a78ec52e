//! Source connectors.
//!
//! A connector turns a company descriptor into an open connection; the
//! connection answers queries with fully materialised row sets and must be
//! closed by its owner before the next company is processed.

#[cfg(feature = "odbc")]
mod odbc;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use common::config::SourceConfig;
use common::errors::{AppError, AppResult};
use common::models::{CompanyDescriptor, RowSet, SourceDriver};
use common::utils::SqlDialect;

#[cfg(feature = "odbc")]
pub use odbc::OdbcConnector;
pub use sqlite::SqliteConnector;

/// Opens connections to company data sources.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// SQL flavour of the connections this connector opens.
    fn dialect(&self) -> SqlDialect;

    /// Opens a connection for `company`.
    async fn connect(&self, company: &CompanyDescriptor) -> AppResult<Box<dyn SourceConnection>>;
}

/// An open connection to one company source.
#[async_trait]
pub trait SourceConnection: Send {
    /// Runs `sql` and returns every row.
    async fn query(&mut self, sql: &str) -> AppResult<RowSet>;

    /// Lists user table names from the driver catalog.
    async fn list_tables(&mut self) -> AppResult<Vec<String>>;

    /// Releases the connection. Closing twice is a no-op.
    async fn close(&mut self) -> AppResult<()>;
}

/// Builds the connector for the configured driver.
pub fn build_connector(source: &SourceConfig) -> AppResult<Arc<dyn SourceConnector>> {
    match source.driver {
        SourceDriver::Sqlite => Ok(Arc::new(SqliteConnector::new(source.clone()))),
        #[cfg(feature = "odbc")]
        SourceDriver::Odbc => Ok(Arc::new(OdbcConnector::new(source.clone()))),
        #[cfg(not(feature = "odbc"))]
        SourceDriver::Odbc => Err(AppError::UnsupportedDriver(
            "odbc support not compiled in (rebuild with `--features odbc`)".into(),
        )),
    }
}

pub(crate) fn closed_error() -> AppError {
    AppError::DatabaseConnection("connection already closed".into())
}
