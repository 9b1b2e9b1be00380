// src/model/table.rs

/// A named table with an ordered set of unique column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
}

impl Table {
    /// Create a table; repeated column names are kept once, first position wins.
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for column in columns {
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        Self {
            name: name.into(),
            columns: unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// True when every given column belongs to this table.
    pub fn has_columns<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        columns.iter().all(|c| self.has_column(c.as_ref()))
    }

    /// The given columns that belong to this table, in input order.
    pub fn intersect_columns<'a, S: AsRef<str>>(&self, columns: &'a [S]) -> Vec<&'a str> {
        columns
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| self.has_column(c))
            .collect()
    }
}
