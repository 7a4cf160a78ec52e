//! SQL statement validation and per-driver statement rendering.

use crate::errors::{AppError, AppResult};

/// Validates SQL statements for security.
pub struct SqlValidator;

/// Keywords that must never appear in an extract statement.
const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "TRUNCATE", "DELETE", "ALTER", "INSERT", "UPDATE", "CREATE",
];

impl SqlValidator {
    /// Validates a SQL statement for forbidden operations.
    ///
    /// Keywords match as whole words outside quoted literals and identifiers,
    /// so `LastUpdate` or `LIKE '%CREATE %'` pass.
    ///
    /// # Errors
    /// Returns `AppError::UnsafeSql` if the SQL contains forbidden keywords.
    pub fn validate(sql: &str) -> AppResult<()> {
        let code = blank_quoted(sql).to_uppercase();
        let forbidden = code
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .find(|word| FORBIDDEN_KEYWORDS.contains(word));
        match forbidden {
            Some(keyword) => Err(AppError::UnsafeSql(format!(
                "forbidden operation: {}",
                keyword
            ))),
            None => Ok(()),
        }
    }

    /// Checks if the SQL is a SELECT query.
    pub fn is_select(sql: &str) -> bool {
        sql.trim().to_uppercase().starts_with("SELECT")
    }

    /// Accepts only read-only SELECT statements.
    pub fn validate_extract(sql: &str) -> AppResult<()> {
        if !Self::is_select(sql) {
            return Err(AppError::UnsafeSql(
                "extract statement must be a SELECT".into(),
            ));
        }
        Self::validate(sql)
    }

    /// Checks that a table or column name is a plain word (letters, digits, `_`).
    pub fn validate_identifier(name: &str) -> AppResult<()> {
        let valid = !name.is_empty()
            && !name.starts_with(|c: char| c.is_ascii_digit())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(AppError::Validation(format!("invalid identifier '{}'", name)))
        }
    }

    /// Wraps a name in double quotes, escaping embedded quotes.
    ///
    /// Table lists may contain names with spaces, so those are quoted rather
    /// than validated.
    pub fn quote_identifier(name: &str) -> AppResult<String> {
        if name.trim().is_empty() || name.chars().any(char::is_control) {
            return Err(AppError::Validation(format!("invalid identifier '{}'", name)));
        }
        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Replaces the contents of `'...'` and `"..."` spans with spaces.
///
/// A doubled quote inside a span closes and reopens it, which blanks the
/// same characters.
fn blank_quoted(sql: &str) -> String {
    let mut open: Option<char> = None;
    sql.chars()
        .map(|c| match open {
            Some(q) if c == q => {
                open = None;
                c
            }
            Some(_) => ' ',
            None => {
                if c == '\'' || c == '"' {
                    open = Some(c);
                }
                c
            }
        })
        .collect()
}

/// SQL flavour spoken by a source driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// ODBC escape syntax (`{fn NOW()}`) understood by the accounting driver.
    Odbc,
    Sqlite,
}

impl SqlDialect {
    /// Selects every row of `table` modified within one day of query time.
    ///
    /// The window is evaluated by the data source, not by this process.
    pub fn incremental_extract(&self, table: &str, modified_column: &str) -> AppResult<String> {
        SqlValidator::validate_identifier(table)?;
        SqlValidator::validate_identifier(modified_column)?;
        Ok(match self {
            SqlDialect::Odbc => format!(
                "SELECT * FROM {} WHERE {} >= {{fn NOW()}} - 1",
                table, modified_column
            ),
            SqlDialect::Sqlite => format!(
                "SELECT * FROM \"{}\" WHERE \"{}\" >= datetime('now', '-1 day')",
                table, modified_column
            ),
        })
    }

    /// Selects every row of `table`.
    pub fn select_all(&self, table: &str) -> AppResult<String> {
        Ok(format!("SELECT * FROM {}", SqlValidator::quote_identifier(table)?))
    }

    /// Cheap statement proving the connection answers queries.
    pub fn probe(&self) -> &'static str {
        match self {
            SqlDialect::Odbc => "SELECT TOP 1 * FROM CompanyInfo",
            SqlDialect::Sqlite => "SELECT 1",
        }
    }
}
