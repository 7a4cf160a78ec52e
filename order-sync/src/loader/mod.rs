//! Transform/load collaborators.
//!
//! The batch runner only knows these traits; the Postgres implementations
//! live in `postgres`.

mod postgres;

use async_trait::async_trait;

use common::errors::AppResult;
use common::models::RowSet;

pub use postgres::PostgresLoader;

/// Persists extracted sales orders for one company.
#[async_trait]
pub trait OrderLoader: Send + Sync {
    /// Maps and stores `orders`, tagging every record with `company_id`.
    async fn load(&self, orders: &RowSet, company_id: &str) -> AppResult<()>;
}

/// Replaces a whole destination table with a source table's rows.
#[async_trait]
pub trait TableLoader: Send + Sync {
    /// Drops and recreates `table`, then inserts `rows`. Returns rows written.
    async fn replace_table(&self, table: &str, rows: &RowSet) -> AppResult<u64>;
}
