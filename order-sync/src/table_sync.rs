//! Whole-table tooling: catalog listing and full table copies.

use std::path::Path;

use chrono::Local;

use common::errors::{AppError, AppResult};
use common::models::CompanyDescriptor;

use crate::loader::TableLoader;
use crate::source::{SourceConnection, SourceConnector};

const LIST_HEADER_PREFIX: &str = "List of";
const LIST_RULE_PREFIX: &str = "==";

/// Outcome counts of a table sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Extracts table names from a table list, skipping blanks and header lines.
pub fn parse_table_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with(LIST_HEADER_PREFIX)
                && !line.starts_with(LIST_RULE_PREFIX)
        })
        .map(String::from)
        .collect()
}

pub fn read_table_list(path: &Path) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read table list {}: {}", path.display(), e))
    })?;
    Ok(parse_table_list(&content))
}

/// Renders a table list file: a title, a rule, then one name per line.
pub fn render_table_list(source_name: &str, tables: &[String]) -> String {
    let mut out = format!("List of Tables in {}\n{}\n", source_name, "=".repeat(40));
    for table in tables {
        out.push_str(table);
        out.push('\n');
    }
    out
}

/// Writes the sorted catalog of `company` to `output`. Returns the table count.
pub async fn list_tables(
    connector: &dyn SourceConnector,
    company: &CompanyDescriptor,
    output: &Path,
) -> AppResult<usize> {
    let mut conn = connector.connect(company).await?;
    let listed = conn.list_tables().await;
    if let Err(e) = conn.close().await {
        tracing::warn!(company = %company.name, error = %e, "Failed to close source connection");
    }

    let mut tables = listed?;
    tables.sort();
    std::fs::write(output, render_table_list(&company.name, &tables))?;

    tracing::info!(
        company = %company.name,
        tables = tables.len(),
        output = %output.display(),
        "Table list written"
    );
    Ok(tables.len())
}

/// Copies every listed table of `company` into the target, replacing
/// destination tables of the same (lowercased) name.
///
/// A failing table is logged and counted; only a failed connection aborts.
pub async fn sync_tables(
    connector: &dyn SourceConnector,
    loader: &dyn TableLoader,
    company: &CompanyDescriptor,
    tables: &[String],
) -> AppResult<SyncSummary> {
    tracing::info!(
        company = %company.name,
        tables = tables.len(),
        started_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        "Starting full table sync"
    );

    let mut conn = connector.connect(company).await?;
    let mut summary = SyncSummary::default();
    let total = tables.len();

    for (i, table) in tables.iter().enumerate() {
        let position = format!("{}/{}", i + 1, total);
        match copy_table(connector, conn.as_mut(), loader, table).await {
            Ok(0) => {
                tracing::info!(%position, table = %table, "Created table schema (0 rows)");
                summary.succeeded += 1;
            }
            Ok(rows) => {
                tracing::info!(%position, table = %table, rows, "Table synced");
                summary.succeeded += 1;
            }
            Err(e) => {
                tracing::error!(%position, table = %table, error = %e, "Table sync failed");
                summary.failed += 1;
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::warn!(company = %company.name, error = %e, "Failed to close source connection");
    }

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        finished_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        "Full table sync completed"
    );
    Ok(summary)
}

async fn copy_table(
    connector: &dyn SourceConnector,
    conn: &mut dyn SourceConnection,
    loader: &dyn TableLoader,
    table: &str,
) -> AppResult<u64> {
    let sql = connector.dialect().select_all(table)?;
    let rows = conn.query(&sql).await?.with_lowercase_columns();
    loader.replace_table(&table.to_lowercase(), &rows).await
}
