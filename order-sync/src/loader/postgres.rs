//! Postgres load target.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::OnceCell;

use common::config::TargetConfig;
use common::errors::{AppError, AppResult};
use common::models::{value_to_text, RowSet};
use common::utils::SqlValidator;

use super::{OrderLoader, TableLoader};

/// Postgres caps a statement at 65535 bind parameters.
const PG_MAX_BIND_PARAMS: usize = 65_535;
/// Rows per INSERT when copying whole tables.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Loads orders and table copies into Postgres.
pub struct PostgresLoader {
    pool: PgPool,
    order_key_column: String,
    staging_ready: OnceCell<()>,
}

impl PostgresLoader {
    /// Builds a lazy pool for the target.
    ///
    /// No connection is made here. The target is first reached by a load, so
    /// an unreachable database fails each company instead of the whole run.
    pub fn new(target: &TargetConfig, order_key_column: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(target.max_connections)
            .acquire_timeout(Duration::from_secs(target.connect_timeout_secs))
            .connect_lazy(&target.database_url)
            .map_err(|e| AppError::Config(format!("invalid target database url: {}", e)))?;

        Ok(Self {
            pool,
            order_key_column: order_key_column.to_string(),
            staging_ready: OnceCell::new(),
        })
    }

    /// Creates the order staging table if it does not exist.
    async fn ensure_staging_table(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sales_order_staging (
                company_id   TEXT        NOT NULL,
                order_key    TEXT        NOT NULL,
                payload      JSONB       NOT NULL,
                extracted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (company_id, order_key)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Load(format!("Failed to create staging table: {}", e)))?;

        tracing::info!("Staging table `sales_order_staging` ensured");
        Ok(())
    }
}

#[async_trait]
impl OrderLoader for PostgresLoader {
    async fn load(&self, orders: &RowSet, company_id: &str) -> AppResult<()> {
        let staged = stage_orders(orders, &self.order_key_column)?;
        self.staging_ready
            .get_or_try_init(|| self.ensure_staging_table())
            .await?;

        let mut tx = self.pool.begin().await.map_err(load_err)?;
        for (order_key, payload) in &staged {
            sqlx::query(
                "INSERT INTO sales_order_staging (company_id, order_key, payload)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (company_id, order_key)
                 DO UPDATE SET payload = EXCLUDED.payload, extracted_at = now()",
            )
            .bind(company_id)
            .bind(order_key)
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(load_err)?;
        }
        tx.commit().await.map_err(load_err)?;

        tracing::debug!(company = %company_id, rows = staged.len(), "Orders staged");
        Ok(())
    }
}

#[async_trait]
impl TableLoader for PostgresLoader {
    async fn replace_table(&self, table: &str, rows: &RowSet) -> AppResult<u64> {
        let table_ident = SqlValidator::quote_identifier(table)?;
        let column_idents = rows
            .columns
            .iter()
            .map(|c| SqlValidator::quote_identifier(c))
            .collect::<AppResult<Vec<_>>>()?;

        let mut tx = self.pool.begin().await.map_err(load_err)?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table_ident))
            .execute(&mut *tx)
            .await
            .map_err(load_err)?;

        let column_defs = column_idents
            .iter()
            .map(|c| format!("{} TEXT", c))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!("CREATE TABLE {} ({})", table_ident, column_defs))
            .execute(&mut *tx)
            .await
            .map_err(load_err)?;

        let mut written = 0u64;
        if !column_idents.is_empty() {
            let insert_head = format!(
                "INSERT INTO {} ({}) ",
                table_ident,
                column_idents.join(", ")
            );
            for chunk in rows.rows.chunks(insert_chunk_rows(column_idents.len())) {
                let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&insert_head);
                builder.push_values(chunk, |mut b, row| {
                    for value in row {
                        b.push_bind(value_to_text(value));
                    }
                });
                written += builder
                    .build()
                    .execute(&mut *tx)
                    .await
                    .map_err(load_err)?
                    .rows_affected();
            }
        }

        tx.commit().await.map_err(load_err)?;
        Ok(written)
    }
}

fn load_err(e: sqlx::Error) -> AppError {
    AppError::Load(e.to_string())
}

/// Pairs every row with its order key and a JSON object payload.
fn stage_orders(orders: &RowSet, key_column: &str) -> AppResult<Vec<(String, Value)>> {
    let key_index = orders.column_index(key_column).ok_or_else(|| {
        AppError::Load(format!(
            "order key column '{}' missing from extract",
            key_column
        ))
    })?;

    orders
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| -> AppResult<(String, Value)> {
            let key = row
                .get(key_index)
                .and_then(value_to_text)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AppError::Load(format!("row {} has no order key", i)))?;
            let payload = orders
                .record(i)
                .map(Value::Object)
                .unwrap_or(Value::Null);
            Ok((key, payload))
        })
        .collect()
}

/// Rows per INSERT that stay within the bind-parameter limit.
fn insert_chunk_rows(num_columns: usize) -> usize {
    if num_columns == 0 {
        return INSERT_CHUNK_ROWS;
    }
    (PG_MAX_BIND_PARAMS / num_columns).clamp(1, INSERT_CHUNK_ROWS)
}
