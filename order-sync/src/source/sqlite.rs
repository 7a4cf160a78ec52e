//! SQLite company sources.
//!
//! Reads SQLite exports of company files. Connections are opened read-only.

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};

use common::config::SourceConfig;
use common::errors::{AppError, AppResult};
use common::models::{CompanyDescriptor, RowSet, SourceLocator};
use common::utils::{connection_locator, SqlDialect};

use super::{closed_error, SourceConnection, SourceConnector};

/// Opens one SQLite connection per company file.
pub struct SqliteConnector {
    source: SourceConfig,
}

impl SqliteConnector {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SourceConnector for SqliteConnector {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    async fn connect(&self, company: &CompanyDescriptor) -> AppResult<Box<dyn SourceConnection>> {
        let locator = connection_locator(&self.source, company)?;
        let SourceLocator::File(path) = &company.locator else {
            return Err(AppError::Validation(format!(
                "company '{}': sqlite requires file_path",
                company.id
            )));
        };

        // Path is handed to SQLite verbatim, never parsed as a URL.
        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        tracing::debug!(company = %company.id, locator = %locator, "SQLite source opened");
        Ok(Box::new(SqliteSource { conn: Some(conn) }))
    }
}

struct SqliteSource {
    conn: Option<SqliteConnection>,
}

#[async_trait]
impl SourceConnection for SqliteSource {
    async fn query(&mut self, sql: &str) -> AppResult<RowSet> {
        let conn = self.conn.as_mut().ok_or_else(closed_error)?;

        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

        // An empty result carries no row metadata, so ask the planner for columns.
        let columns: Vec<String> = match rows.first() {
            Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
            None => conn
                .describe(sql)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        };

        let mut result = RowSet::new(columns);
        for row in &rows {
            let values = (0..row.len())
                .map(|i| decode_value(row, i))
                .collect::<AppResult<Vec<_>>>()?;
            result.push(values);
        }
        Ok(result)
    }

    async fn list_tables(&mut self) -> AppResult<Vec<String>> {
        let conn = self.conn.as_mut().ok_or_else(closed_error)?;
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn close(&mut self) -> AppResult<()> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Converts one SQLite cell into a JSON scalar based on its storage class.
fn decode_value(row: &SqliteRow, index: usize) -> AppResult<Value> {
    let decode_err = |e: sqlx::Error| AppError::DatabaseQuery(e.to_string());

    let raw = row.try_get_raw(index).map_err(decode_err)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index).map_err(decode_err)?),
        "REAL" => {
            let v = row.try_get::<f64, _>(index).map_err(decode_err)?;
            Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(decode_err)?;
            Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
        _ => Value::String(row.try_get::<String, _>(index).map_err(decode_err)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_company_file, seed_company_file_at, sqlite_source};
    use serde_json::json;

    fn connector() -> SqliteConnector {
        SqliteConnector::new(sqlite_source())
    }

    #[tokio::test]
    async fn test_incremental_extract_reads_recent_rows_only() {
        let path = seed_company_file().await;
        let company = CompanyDescriptor::file("A", "Acme", path.display().to_string());

        let mut conn = connector().connect(&company).await.unwrap();
        let sql = SqlDialect::Sqlite
            .incremental_extract("SalesOrder", "TimeModified")
            .unwrap();
        let rows = conn.query(&sql).await.unwrap();
        conn.close().await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows.columns[0], "TxnID");
        let record = rows.record(0).unwrap();
        assert_eq!(record["TxnID"], json!("1-A"));
        assert_eq!(record["RefNumber"], json!(1001));
        assert_eq!(record["Total"], json!(250.5));
        assert_eq!(record["Memo"], Value::Null);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let path = seed_company_file().await;
        let company = CompanyDescriptor::file("A", "Acme", path.display().to_string());

        let mut conn = connector().connect(&company).await.unwrap();
        let rows = conn
            .query("SELECT * FROM Customer")
            .await
            .unwrap();
        conn.close().await.unwrap();

        assert!(rows.is_empty());
        assert_eq!(rows.columns, vec!["ListID".to_string(), "Name".to_string()]);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_list_tables_and_close_twice() {
        let path = seed_company_file().await;
        let company = CompanyDescriptor::file("A", "Acme", path.display().to_string());

        let mut conn = connector().connect(&company).await.unwrap();
        let mut tables = conn.list_tables().await.unwrap();
        tables.sort();
        assert_eq!(tables, vec!["Customer".to_string(), "SalesOrder".to_string()]);

        conn.close().await.unwrap();
        conn.close().await.unwrap();
        assert!(matches!(
            conn.query("SELECT 1").await,
            Err(AppError::DatabaseConnection(_))
        ));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_path_with_percent_and_question_mark_opens_file() {
        let dir = std::env::temp_dir().join(format!("orders 100%25 ?dir-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = seed_company_file_at(dir.join("a?b%41.db")).await;
        let company = CompanyDescriptor::file("A", "Acme", path.display().to_string());

        let mut conn = connector().connect(&company).await.unwrap();
        let rows = conn.query("SELECT TxnID FROM SalesOrder").await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(rows.len(), 2);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_source_is_read_only() {
        let path = seed_company_file().await;
        let company = CompanyDescriptor::file("A", "Acme", path.display().to_string());

        let mut conn = connector().connect(&company).await.unwrap();
        let err = conn
            .query("INSERT INTO Customer VALUES ('C-1', 'Carl')")
            .await
            .unwrap_err();
        conn.close().await.unwrap();
        assert!(matches!(err, AppError::DatabaseQuery(_)));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_file_is_connection_error() {
        let company = CompanyDescriptor::file("X", "Missing", "/nonexistent/dir/missing.db");
        let err = connector().connect(&company).await.err().unwrap();
        assert!(matches!(err, AppError::DatabaseConnection(_)));
    }

    #[tokio::test]
    async fn test_bad_query_is_query_error() {
        let path = seed_company_file().await;
        let company = CompanyDescriptor::file("A", "Acme", path.display().to_string());

        let mut conn = connector().connect(&company).await.unwrap();
        let err = conn.query("SELECT * FROM NoSuchTable").await.unwrap_err();
        conn.close().await.unwrap();
        assert!(matches!(err, AppError::DatabaseQuery(_)));

        let _ = std::fs::remove_file(path);
    }
}
