//! Connection checks for company sources.

use std::time::{Duration, Instant};

use common::errors::AppResult;
use common::models::CompanyDescriptor;

use crate::source::SourceConnector;

/// Opens a connection, runs the dialect probe and closes it again.
///
/// Returns the probe latency and the number of columns it returned.
pub async fn test_connection(
    connector: &dyn SourceConnector,
    company: &CompanyDescriptor,
) -> AppResult<(Duration, usize)> {
    let mut conn = connector.connect(company).await?;

    let start = Instant::now();
    let probed = conn.query(connector.dialect().probe()).await;
    let latency = start.elapsed();

    if let Err(e) = conn.close().await {
        tracing::warn!(company = %company.name, error = %e, "Failed to close source connection");
    }
    let rows = probed?;
    Ok((latency, rows.columns.len()))
}

/// Checks every company and logs the result. Returns the number of failures.
pub async fn test_connections(
    connector: &dyn SourceConnector,
    companies: &[CompanyDescriptor],
) -> usize {
    let mut failures = 0;
    for company in companies {
        match test_connection(connector, company).await {
            Ok((latency, columns)) => tracing::info!(
                company = %company.name,
                latency_ms = latency.as_millis() as u64,
                columns,
                "Connection OK"
            ),
            Err(e) => {
                failures += 1;
                tracing::error!(company = %company.name, error = %e, "Connection failed");
            }
        }
    }
    failures
}
