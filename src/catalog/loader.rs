//! Catalog loading from disk.
//!
//! The format is chosen by file extension:
//! - `.json` - the original `datawarehouse.json` layout
//! - `.toml` - the same three lists as TOML arrays of tables

use std::fs;
use std::path::Path;

use super::Catalog;
use crate::error::{WarehouseError, WarehouseResult};

/// Load and build a catalog from a definition file.
pub fn load_catalog(path: &Path) -> WarehouseResult<Catalog> {
    let content = fs::read_to_string(path).map_err(|e| WarehouseError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let catalog = match extension {
        "json" => Catalog::from_json_str(&content)?,
        "toml" => Catalog::from_toml_str(&content)?,
        other => {
            return Err(WarehouseError::config(format!(
                "unsupported catalog file extension '{}' (expected .json or .toml)",
                other
            )))
        }
    };

    tracing::info!(
        path = %path.display(),
        tables = catalog.len(),
        aggregates = catalog.aggregates().len(),
        "loaded data warehouse catalog"
    );
    Ok(catalog)
}
