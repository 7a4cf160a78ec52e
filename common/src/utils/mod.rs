//! Utility functions and helpers.

pub mod id_generator;
pub mod locator;
pub mod sql_validator;

// Re-export commonly used types
pub use id_generator::IdGenerator;
pub use locator::connection_locator;
pub use sql_validator::{SqlDialect, SqlValidator};
