//! ODBC company sources.
//!
//! The accounting driver is blocking, so every driver call runs under
//! `block_in_place`. Requires the multi-threaded runtime.

use std::sync::OnceLock;

use async_trait::async_trait;
use odbc_api::{Connection, ConnectionOptions, Cursor, Environment, ResultSetMetadata};
use serde_json::Value;

use common::config::SourceConfig;
use common::errors::{AppError, AppResult};
use common::models::{CompanyDescriptor, RowSet};
use common::utils::{connection_locator, SqlDialect};

use super::{closed_error, SourceConnection, SourceConnector};

/// TABLE_NAME column of the catalog `tables` result.
const CATALOG_TABLE_NAME: u16 = 3;

static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

fn environment() -> AppResult<&'static Environment> {
    if let Some(env) = ODBC_ENV.get() {
        return Ok(env);
    }
    let env = Environment::new()
        .map_err(|e| AppError::DatabaseConnection(format!("odbc environment: {}", e)))?;
    Ok(ODBC_ENV.get_or_init(|| env))
}

/// Opens one ODBC connection per company file.
pub struct OdbcConnector {
    source: SourceConfig,
}

impl OdbcConnector {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SourceConnector for OdbcConnector {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Odbc
    }

    async fn connect(&self, company: &CompanyDescriptor) -> AppResult<Box<dyn SourceConnection>> {
        let locator = connection_locator(&self.source, company)?;
        let env = environment()?;
        let conn = tokio::task::block_in_place(|| {
            env.connect_with_connection_string(&locator, ConnectionOptions::default())
        })
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        tracing::debug!(company = %company.id, "ODBC source opened");
        Ok(Box::new(OdbcSource { conn: Some(conn) }))
    }
}

struct OdbcSource {
    conn: Option<Connection<'static>>,
}

#[async_trait]
impl SourceConnection for OdbcSource {
    async fn query(&mut self, sql: &str) -> AppResult<RowSet> {
        let conn = self.conn.as_ref().ok_or_else(closed_error)?;
        tokio::task::block_in_place(|| fetch_all(conn, sql))
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))
    }

    async fn list_tables(&mut self) -> AppResult<Vec<String>> {
        let conn = self.conn.as_ref().ok_or_else(closed_error)?;
        tokio::task::block_in_place(|| table_names(conn))
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))
    }

    async fn close(&mut self) -> AppResult<()> {
        if let Some(conn) = self.conn.take() {
            tokio::task::block_in_place(|| drop(conn));
        }
        Ok(())
    }
}

/// Materialises the full result of `sql`. Cells are read as text.
fn fetch_all(conn: &Connection<'_>, sql: &str) -> Result<RowSet, odbc_api::Error> {
    let Some(mut cursor) = conn.execute(sql, ())? else {
        return Ok(RowSet::default());
    };

    let columns = cursor.column_names()?.collect::<Result<Vec<_>, _>>()?;
    let mut rows = RowSet::new(columns);
    let num_cols = rows.columns.len() as u16;

    let mut buf = Vec::new();
    while let Some(mut row) = cursor.next_row()? {
        let mut values = Vec::with_capacity(num_cols as usize);
        for col in 1..=num_cols {
            buf.clear();
            let value = if row.get_text(col, &mut buf)? {
                Value::String(String::from_utf8_lossy(&buf).into_owned())
            } else {
                Value::Null
            };
            values.push(value);
        }
        rows.push(values);
    }
    Ok(rows)
}

fn table_names(conn: &Connection<'_>) -> Result<Vec<String>, odbc_api::Error> {
    let mut cursor = conn.tables("", "", "", "TABLE")?;
    let mut names = Vec::new();
    let mut buf = Vec::new();
    while let Some(mut row) = cursor.next_row()? {
        buf.clear();
        if row.get_text(CATALOG_TABLE_NAME, &mut buf)? && !buf.is_empty() {
            names.push(String::from_utf8_lossy(&buf).into_owned());
        }
    }
    Ok(names)
}
