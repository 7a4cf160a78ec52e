//! 多公司订单批处理执行器
//!
//! Walks the company list in order. Each company gets its own connection,
//! extract and load; any failure is logged against that company and the
//! loop moves on.

use std::sync::Arc;

use chrono::Local;
use tracing::Instrument;

use common::config::ExtractConfig;
use common::errors::AppResult;
use common::models::CompanyDescriptor;
use common::utils::{IdGenerator, SqlDialect, SqlValidator};

use crate::loader::OrderLoader;
use crate::source::{SourceConnection, SourceConnector};

/// Drives the per-company extract/load sequence.
pub struct BatchRunner {
    connector: Arc<dyn SourceConnector>,
    loader: Arc<dyn OrderLoader>,
    extract_sql: String,
}

impl BatchRunner {
    /// Creates a runner that executes `extract_sql` against every company.
    pub fn new(
        connector: Arc<dyn SourceConnector>,
        loader: Arc<dyn OrderLoader>,
        extract_sql: String,
    ) -> Self {
        Self {
            connector,
            loader,
            extract_sql,
        }
    }

    /// Resolves the extract statement: the configured override if any,
    /// otherwise the incremental window query for `dialect`.
    pub fn extract_statement(extract: &ExtractConfig, dialect: SqlDialect) -> AppResult<String> {
        match &extract.query_override {
            Some(sql) => {
                SqlValidator::validate_extract(sql)?;
                Ok(sql.clone())
            }
            None => dialect.incremental_extract(&extract.table, &extract.modified_column),
        }
    }

    /// Processes every company in list order.
    ///
    /// Per-company failures are logged and never abort the batch.
    pub async fn run(&self, companies: &[CompanyDescriptor]) {
        let span = tracing::info_span!("batch", run = %IdGenerator::short_id());
        async {
            tracing::info!(
                companies = companies.len(),
                started_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
                "Starting multi-company batch job"
            );

            for company in companies {
                tracing::info!(
                    company = %company.name,
                    id = %company.id,
                    locator = %company.locator,
                    "Processing company"
                );

                match self.process_company(company).await {
                    Ok(0) => tracing::info!(company = %company.name, "No new updates"),
                    Ok(count) => {
                        tracing::info!(company = %company.name, orders = count, "Orders processed")
                    }
                    Err(e) => tracing::error!(
                        company = %company.name,
                        kind = e.kind(),
                        error = %e,
                        "Error processing company"
                    ),
                }
            }

            tracing::info!(
                finished_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
                "Batch job completed"
            );
        }
        .instrument(span)
        .await
    }

    /// Connect, extract, load and close for one company.
    ///
    /// Returns the number of orders handed to the loader. Once a connection
    /// is obtained it is closed on every path before returning.
    async fn process_company(&self, company: &CompanyDescriptor) -> AppResult<usize> {
        let mut conn = self.connector.connect(company).await?;

        let outcome = self.extract_and_load(conn.as_mut(), company).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(company = %company.name, error = %e, "Failed to close source connection");
        }
        outcome
    }

    async fn extract_and_load(
        &self,
        conn: &mut dyn SourceConnection,
        company: &CompanyDescriptor,
    ) -> AppResult<usize> {
        let orders = conn.query(&self.extract_sql).await?;
        if orders.is_empty() {
            return Ok(0);
        }
        self.loader.load(&orders, &company.id).await?;
        Ok(orders.len())
    }
}
