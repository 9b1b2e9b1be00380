//! Star-schema table model: dimensions, facts and aggregates.

pub mod aggregate;
pub mod dimension;
pub mod fact;
pub mod table;
pub mod types;

pub use aggregate::{count_column_for, Aggregate, AggregateMap, AggregatedMeasure};
pub use dimension::{primary_key_for, Dimension};
pub use fact::Fact;
pub use table::Table;
pub use types::AggregationType;

/// Suffix shared by every dimension primary key and fact foreign key.
pub const KEY_SUFFIX: &str = "_id";

/// True for structural key columns (`<dimension>_id`).
pub fn is_key_column(column: &str) -> bool {
    column.ends_with(KEY_SUFFIX)
}

/// A registered catalog table of any kind.
#[derive(Debug, Clone, Copy)]
pub enum TableRef<'a> {
    Dimension(&'a Dimension),
    Fact(&'a Fact),
    Aggregate(&'a Aggregate),
}

impl<'a> TableRef<'a> {
    pub fn table(&self) -> &'a Table {
        match self {
            TableRef::Dimension(d) => d.table(),
            TableRef::Fact(f) => f.table(),
            TableRef::Aggregate(a) => a.fact().table(),
        }
    }

    pub fn name(&self) -> &'a str {
        self.table().name()
    }

    pub fn columns(&self) -> &'a [String] {
        self.table().columns()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TableRef::Dimension(_) => "dimension",
            TableRef::Fact(_) => "fact",
            TableRef::Aggregate(_) => "aggregate",
        }
    }
}
