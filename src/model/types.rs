// src/model/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation applied to a base-fact measure when an aggregate table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregationType {
    /// SQL function name, e.g. `SUM`.
    pub fn function(&self) -> &'static str {
        match self {
            AggregationType::Sum => "SUM",
            AggregationType::Avg => "AVG",
            AggregationType::Min => "MIN",
            AggregationType::Max => "MAX",
            AggregationType::Count => "COUNT",
        }
    }

    /// Suffix of the pre-computed column, e.g. `cput_sum`.
    pub fn suffix(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Count => "count",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
