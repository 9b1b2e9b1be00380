//! Fact tables: foreign keys to dimensions plus measure columns.

use super::dimension::{primary_key_for, Dimension};
use super::table::Table;

/// A fact table.
///
/// Its columns are exactly the `<dimension>_id` foreign keys followed by the
/// measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    table: Table,
    dimensions: Vec<String>,
    measures: Vec<String>,
}

impl Fact {
    pub fn new(name: &str, dimensions: &[String], measures: &[String]) -> Self {
        let columns = dimensions
            .iter()
            .map(|d| primary_key_for(d))
            .chain(measures.iter().cloned());
        Self {
            table: Table::new(name, columns),
            dimensions: dimensions.to_vec(),
            measures: measures.to_vec(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    /// Names of the joined dimensions.
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[String] {
        &self.measures
    }

    pub fn has_measure(&self, column: &str) -> bool {
        self.measures.iter().any(|m| m == column)
    }

    /// Foreign key columns, one per dimension.
    pub fn foreign_keys(&self) -> &[String] {
        &self.table.columns()[..self.dimensions.len()]
    }

    /// True when this fact carries the dimension's primary key.
    pub fn has_dimension(&self, dimension: &Dimension) -> bool {
        self.table.has_column(dimension.primary_key())
    }

    pub fn has_dimensions(&self, dimensions: &[&Dimension]) -> bool {
        dimensions.iter().all(|d| self.has_dimension(d))
    }
}
