// src/model/dimension.rs
use super::table::Table;
use super::KEY_SUFFIX;

/// A dimension table.
///
/// The first column is always the primary key, `<name>_id`. A dimension may
/// declare roll-ups: coarser dimensions over the same attribute space
/// (`dim_date` rolls up to `dim_month`). Roll-ups are stored by name and
/// resolved through the [`Catalog`](crate::catalog::Catalog) that owns both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    table: Table,
    base: Option<String>,
    roll_ups: Vec<String>,
}

impl Dimension {
    pub fn new(name: &str, attributes: &[String], base: Option<String>) -> Self {
        let columns = std::iter::once(primary_key_for(name)).chain(attributes.iter().cloned());
        Self {
            table: Table::new(name, columns),
            base,
            roll_ups: Vec::new(),
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

    pub fn primary_key(&self) -> &str {
        &self.table.columns()[0]
    }

    /// Non-key attribute columns.
    pub fn attributes(&self) -> &[String] {
        &self.table.columns()[1..]
    }

    /// Name of the dimension this one rolls up, if any.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Names of the declared roll-ups, in declaration order.
    pub fn roll_ups(&self) -> &[String] {
        &self.roll_ups
    }

    pub(crate) fn add_roll_up(&mut self, name: &str) {
        if !self.roll_ups.iter().any(|r| r == name) {
            self.roll_ups.push(name.to_string());
        }
    }
}

/// Primary key column of a dimension: `<dimension>_id`.
pub fn primary_key_for(dimension: &str) -> String {
    format!("{dimension}{KEY_SUFFIX}")
}
