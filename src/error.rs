//! Error types for the data warehouse catalog and the aggregate navigator.
//!
//! Catalog construction surfaces [`WarehouseError::Config`] and is fatal at
//! startup. Every other variant is raised while attempting an optimization
//! and is recovered by the navigator, which then returns the query unchanged.

use std::path::PathBuf;

/// Result type for catalog and navigator operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WarehouseError {
    /// Malformed or out-of-order catalog definitions.
    #[error("Invalid catalog definition: {0}")]
    Config(String),

    /// The catalog file could not be read.
    #[error("Failed to read catalog file '{path}': {message}")]
    Io { path: PathBuf, message: String },

    /// A table name is not registered in the catalog.
    #[error("Unknown table: '{0}'")]
    UnknownTable(String),

    /// A column cannot be attributed to any registered table.
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// No table reference could be found in the SQL text.
    #[error("Cannot parse SQL: {0}")]
    Parse(String),
}

impl WarehouseError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        WarehouseError::Config(message.into())
    }

    /// True for errors that only mean "optimization not possible".
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WarehouseError::Config(_) | WarehouseError::Io { .. })
    }
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for WarehouseError {
    fn from(err: toml::de::Error) -> Self {
        WarehouseError::Config(err.to_string())
    }
}
