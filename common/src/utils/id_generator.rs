//! Unique ID generator.

use uuid::Uuid;

/// Generates identifiers for runs and log correlation.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates a short unique ID (first 8 characters of UUID).
    ///
    /// # Returns
    /// An 8-character unique string.
    pub fn short_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }
}
