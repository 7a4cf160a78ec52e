//! Application state for the order sync job.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{load_companies, CompanyDescriptor};

use crate::loader::PostgresLoader;
use crate::source::{build_connector, SourceConnector};

/// Configuration plus the collaborators built from it.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub connector: Arc<dyn SourceConnector>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let connector = build_connector(&config.source)?;
        Ok(Self { config, connector })
    }

    /// Reads the company list. Failure here is fatal to the command.
    pub fn companies(&self) -> AppResult<Vec<CompanyDescriptor>> {
        load_companies(&self.config.companies_file)
    }

    /// Looks up one company by id.
    pub fn company(&self, id: &str) -> AppResult<CompanyDescriptor> {
        self.companies()?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::Validation(format!("unknown company id '{}'", id)))
    }

    /// Builds the Postgres load target. Connections are opened on first use.
    pub fn loader(&self) -> AppResult<Arc<PostgresLoader>> {
        let loader = PostgresLoader::new(&self.config.target, &self.config.extract.order_key_column)?;
        Ok(Arc::new(loader))
    }
}
