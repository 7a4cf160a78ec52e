//! Shared building blocks for the order sync job.
//!
//! - `config`: environment driven configuration
//! - `errors`: error taxonomy shared by every module
//! - `logging`: tracing bootstrap
//! - `models`: company descriptors and extracted row sets
//! - `utils`: connection locators, SQL dialects and id helpers

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod utils;
