//! Environment driven configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory. Variables already set in the environment win.

use std::path::PathBuf;

use url::Url;

use crate::errors::{AppError, AppResult};
use crate::models::SourceDriver;

const DEFAULT_COMPANIES_FILE: &str = "companies.json";
const DEFAULT_TABLE_LIST_FILE: &str = "QuickBooks_Tables_List.txt";
const DEFAULT_ODBC_DSN: &str = "QuickBooks Data";
const DEFAULT_ODBC_OPEN_MODE: &str = "F";
const DEFAULT_ORDER_TABLE: &str = "SalesOrder";
const DEFAULT_MODIFIED_COLUMN: &str = "TimeModified";
const DEFAULT_ORDER_KEY_COLUMN: &str = "TxnID";

/// Source connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub driver: SourceDriver,
    /// DSN that file locators are opened through.
    pub odbc_dsn: String,
    /// `OpenMode` option passed alongside file locators.
    pub odbc_open_mode: String,
}

/// What the incremental extract reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    pub table: String,
    pub modified_column: String,
    /// Full statement replacing the derived one.
    pub query_override: Option<String>,
    /// Natural key used when upserting into the staging table.
    pub order_key_column: String,
}

/// Postgres load target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl TargetConfig {
    /// Database URL with the password masked, for log output.
    pub fn redacted_url(&self) -> String {
        match Url::parse(&self.database_url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

/// Complete job configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub service_name: String,
    pub companies_file: PathBuf,
    pub table_list_file: PathBuf,
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub target: TargetConfig,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the configuration from the environment.
    pub fn load_with_service(service_name: &str) -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(AppError::Config(format!("cannot read .env: {}", e)));
            }
        }
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let driver = match get("SOURCE_DRIVER") {
            Some(v) => v.parse()?,
            None => SourceDriver::Odbc,
        };

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => build_postgres_url(
                &get_or("PG_HOST", "localhost"),
                parse_number(&get, "PG_PORT", 5432)?,
                &get_or("PG_DB", "postgres"),
                &get_or("PG_USER", "postgres"),
                &lookup("PG_PASS").unwrap_or_default(),
            )?,
        };

        Ok(Self {
            service_name: service_name.to_string(),
            companies_file: PathBuf::from(get_or("COMPANIES_FILE", DEFAULT_COMPANIES_FILE)),
            table_list_file: PathBuf::from(get_or("TABLE_LIST_FILE", DEFAULT_TABLE_LIST_FILE)),
            source: SourceConfig {
                driver,
                odbc_dsn: get_or("ODBC_DSN", DEFAULT_ODBC_DSN),
                odbc_open_mode: get_or("ODBC_OPEN_MODE", DEFAULT_ODBC_OPEN_MODE),
            },
            extract: ExtractConfig {
                table: get_or("ORDER_TABLE", DEFAULT_ORDER_TABLE),
                modified_column: get_or("MODIFIED_COLUMN", DEFAULT_MODIFIED_COLUMN),
                query_override: get("EXTRACT_QUERY"),
                order_key_column: get_or("ORDER_KEY_COLUMN", DEFAULT_ORDER_KEY_COLUMN),
            },
            target: TargetConfig {
                database_url,
                max_connections: parse_number(&get, "PG_MAX_CONNECTIONS", 5)?,
                connect_timeout_secs: parse_number(&get, "CONNECT_TIMEOUT_SECS", 30)?,
            },
        })
    }
}

fn parse_number<T, F>(get: &F, key: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}

/// Builds a Postgres URL, percent-encoding the credentials.
fn build_postgres_url(
    host: &str,
    port: u16,
    database: &str,
    username: &str,
    password: &str,
) -> AppResult<String> {
    let mut url = Url::parse(&format!("postgres://{}:{}/{}", host, port, database))
        .map_err(|e| AppError::Config(format!("invalid postgres host or database: {}", e)))?;
    url.set_username(username)
        .map_err(|_| AppError::Config("invalid postgres username".into()))?;
    if !password.is_empty() {
        url.set_password(Some(password))
            .map_err(|_| AppError::Config("invalid postgres password".into()))?;
    }
    Ok(url.to_string())
}
