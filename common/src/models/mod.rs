//! Shared data models.

pub mod company;
pub mod driver;
pub mod rows;

// Re-export commonly used types
pub use company::{load_companies, parse_companies, CompanyDescriptor, SourceLocator};
pub use driver::SourceDriver;
pub use rows::{value_to_text, OrderRecord, RowSet};
