//! Company descriptors.
//!
//! One descriptor per legacy company file. The list is read once at startup
//! and handed to the runner as-is.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Where a company's data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Path to the company data file, opened through the driver DSN.
    File(String),
    /// Name of a preconfigured data source.
    Dsn(String),
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocator::File(path) => write!(f, "file:{}", path),
            SourceLocator::Dsn(name) => write!(f, "dsn:{}", name),
        }
    }
}

/// Immutable description of one company source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyDescriptor {
    /// Identifier stamped on every loaded record.
    pub id: String,
    /// Display name used in log lines.
    pub name: String,
    /// Connection locator.
    pub locator: SourceLocator,
}

impl CompanyDescriptor {
    /// Creates a descriptor backed by a company data file.
    pub fn file(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locator: SourceLocator::File(path.into()),
        }
    }

    /// Creates a descriptor backed by a named data source.
    pub fn dsn(id: impl Into<String>, name: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locator: SourceLocator::Dsn(dsn.into()),
        }
    }
}

/// Raw entry as written in the company list file.
#[derive(Debug, Deserialize, Validate)]
struct CompanyEntry {
    #[validate(length(min = 1, max = 64, message = "id must be 1-64 characters"))]
    id: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    name: String,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    dsn_name: Option<String>,
}

impl CompanyEntry {
    fn into_descriptor(self) -> AppResult<CompanyDescriptor> {
        self.validate()
            .map_err(|e| AppError::Validation(format!("company '{}': {}", self.id, e)))?;

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let locator = match (non_empty(self.file_path), non_empty(self.dsn_name)) {
            (Some(path), None) => SourceLocator::File(path),
            (None, Some(dsn)) => SourceLocator::Dsn(dsn),
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(format!(
                    "company '{}': set either file_path or dsn_name, not both",
                    self.id
                )))
            }
            (None, None) => {
                return Err(AppError::Validation(format!(
                    "company '{}': file_path or dsn_name is required",
                    self.id
                )))
            }
        };

        Ok(CompanyDescriptor {
            id: self.id,
            name: self.name,
            locator,
        })
    }
}

/// Parses a JSON array of company entries, preserving list order.
///
/// # Errors
/// Returns `AppError::Config` for malformed JSON and `AppError::Validation`
/// for invalid or duplicate entries.
pub fn parse_companies(json: &str) -> AppResult<Vec<CompanyDescriptor>> {
    let entries: Vec<CompanyEntry> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    let mut companies = Vec::with_capacity(entries.len());
    for entry in entries {
        let company = entry.into_descriptor()?;
        if !seen.insert(company.id.clone()) {
            return Err(AppError::Validation(format!(
                "duplicate company id '{}'",
                company.id
            )));
        }
        companies.push(company);
    }
    Ok(companies)
}

/// Reads and parses the company list file.
pub fn load_companies(path: &Path) -> AppResult<Vec<CompanyDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read company list {}: {}", path.display(), e))
    })?;
    let companies = parse_companies(&content)?;
    tracing::debug!(path = %path.display(), count = companies.len(), "Company list loaded");
    Ok(companies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_list_order() {
        let companies = parse_companies(
            r#"[
                {"id": "B", "name": "Beta", "file_path": "/data/b.qbw"},
                {"id": "A", "name": "Acme", "dsn_name": "Acme QB"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            companies,
            vec![
                CompanyDescriptor::file("B", "Beta", "/data/b.qbw"),
                CompanyDescriptor::dsn("A", "Acme", "Acme QB"),
            ]
        );
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(
            CompanyDescriptor::file("A", "Acme", "/data/a.qbw").locator.to_string(),
            "file:/data/a.qbw"
        );
        assert_eq!(CompanyDescriptor::dsn("B", "Beta", "Beta QB").locator.to_string(), "dsn:Beta QB");
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(parse_companies("[]").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = parse_companies(
            r#"[
                {"id": "A", "name": "Acme", "file_path": "/a.qbw"},
                {"id": "A", "name": "Acme 2", "file_path": "/a2.qbw"}
            ]"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_locator_is_required_and_exclusive() {
        let missing = parse_companies(r#"[{"id": "A", "name": "Acme"}]"#).unwrap_err();
        assert!(matches!(missing, AppError::Validation(_)));

        let both = parse_companies(
            r#"[{"id": "A", "name": "Acme", "file_path": "/a.qbw", "dsn_name": "A"}]"#,
        )
        .unwrap_err();
        assert!(matches!(both, AppError::Validation(msg) if msg.contains("not both")));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let err = parse_companies(r#"[{"id": "A", "name": "", "file_path": "/a.qbw"}]"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(parse_companies("{"), Err(AppError::Config(_))));
    }
}
