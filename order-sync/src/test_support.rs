//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, Executor, SqliteConnection};

use common::config::SourceConfig;
use common::errors::{AppError, AppResult};
use common::models::{CompanyDescriptor, RowSet, SourceDriver};
use common::utils::SqlDialect;

use crate::loader::{OrderLoader, TableLoader};
use crate::source::{SourceConnection, SourceConnector};

/// One observable interaction with a fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(String),
    Query(String, String),
    Load(String, usize),
    Close(String),
}

/// Ordered record of every fake interaction.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// Scripted behaviour of one fake company source.
#[derive(Debug, Clone)]
pub enum FakeSource {
    Rows(RowSet),
    ConnectFails,
    QueryFails,
}

/// Connector whose behaviour is scripted per company id.
pub struct FakeConnector {
    sources: HashMap<String, FakeSource>,
    tables: Vec<String>,
    log: CallLog,
}

impl FakeConnector {
    pub fn new(log: CallLog) -> Self {
        Self {
            sources: HashMap::new(),
            tables: Vec::new(),
            log,
        }
    }

    pub fn with(mut self, company_id: &str, source: FakeSource) -> Self {
        self.sources.insert(company_id.to_string(), source);
        self
    }

    pub fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables = tables.iter().map(|t| t.to_string()).collect();
        self
    }
}

#[async_trait]
impl SourceConnector for FakeConnector {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Odbc
    }

    async fn connect(&self, company: &CompanyDescriptor) -> AppResult<Box<dyn SourceConnection>> {
        self.log.push(Call::Connect(company.id.clone()));
        let source = self
            .sources
            .get(&company.id)
            .cloned()
            .unwrap_or_else(|| FakeSource::Rows(RowSet::default()));
        if let FakeSource::ConnectFails = source {
            return Err(AppError::DatabaseConnection(format!(
                "cannot open {}",
                company.id
            )));
        }
        Ok(Box::new(FakeConnection {
            company_id: company.id.clone(),
            source,
            tables: self.tables.clone(),
            log: self.log.clone(),
        }))
    }
}

struct FakeConnection {
    company_id: String,
    source: FakeSource,
    tables: Vec<String>,
    log: CallLog,
}

#[async_trait]
impl SourceConnection for FakeConnection {
    async fn query(&mut self, sql: &str) -> AppResult<RowSet> {
        self.log
            .push(Call::Query(self.company_id.clone(), sql.to_string()));
        match &self.source {
            FakeSource::Rows(rows) => Ok(rows.clone()),
            _ => Err(AppError::DatabaseQuery("query timed out".into())),
        }
    }

    async fn list_tables(&mut self) -> AppResult<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.log.push(Call::Close(self.company_id.clone()));
        Ok(())
    }
}

/// Loader that records every call and can fail for chosen companies or tables.
pub struct FakeLoader {
    log: CallLog,
    fail_for: Vec<String>,
    pub loads: Mutex<Vec<(String, RowSet)>>,
}

impl FakeLoader {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_for: Vec::new(),
            loads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, target: &str) -> Self {
        self.fail_for.push(target.to_string());
        self
    }

    fn record(&self, target: &str, rows: &RowSet) -> AppResult<()> {
        self.log.push(Call::Load(target.to_string(), rows.len()));
        if self.fail_for.iter().any(|f| f == target) {
            return Err(AppError::Load(format!("target rejected {}", target)));
        }
        self.loads
            .lock()
            .unwrap()
            .push((target.to_string(), rows.clone()));
        Ok(())
    }
}

#[async_trait]
impl OrderLoader for FakeLoader {
    async fn load(&self, orders: &RowSet, company_id: &str) -> AppResult<()> {
        self.record(company_id, orders)
    }
}

#[async_trait]
impl TableLoader for FakeLoader {
    async fn replace_table(&self, table: &str, rows: &RowSet) -> AppResult<u64> {
        self.record(table, rows)?;
        Ok(rows.len() as u64)
    }
}

/// Row set with `n` order rows.
pub fn order_rows(n: usize) -> RowSet {
    let mut rows = RowSet::new(vec!["TxnID".into(), "RefNumber".into()]);
    for i in 0..n {
        rows.push(vec![json!(format!("{}-TXN", i)), json!(1000 + i)]);
    }
    rows
}

pub fn sqlite_source() -> SourceConfig {
    SourceConfig {
        driver: SourceDriver::Sqlite,
        odbc_dsn: "QuickBooks Data".into(),
        odbc_open_mode: "F".into(),
    }
}

/// Creates a SQLite company file with one recent and one stale order.
pub async fn seed_company_file() -> PathBuf {
    seed_company_file_at(std::env::temp_dir().join(format!("order-sync-{}.db", uuid::Uuid::new_v4())))
        .await
}

/// Same as [`seed_company_file`] at an explicit path.
pub async fn seed_company_file_at(path: PathBuf) -> PathBuf {
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    conn.execute(
        "CREATE TABLE SalesOrder (
            TxnID TEXT PRIMARY KEY,
            RefNumber INTEGER,
            Total REAL,
            Memo TEXT,
            TimeModified TEXT NOT NULL
        );
        CREATE TABLE Customer (ListID TEXT PRIMARY KEY, Name TEXT);
        INSERT INTO SalesOrder VALUES ('1-A', 1001, 250.5, NULL, datetime('now'));
        INSERT INTO SalesOrder VALUES ('2-B', 1002, 10.0, 'old', '2000-01-01 00:00:00');",
    )
    .await
    .unwrap();
    conn.close().await.unwrap();
    path
}

/// Captures formatted log output of the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Installs a thread-local subscriber writing into the returned buffer.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
