//! Report query construction.
//!
//! [`ReportQuery`] assembles the single-fact star queries the reports run,
//! from explicit builder calls and/or a [`ReportParams`] request. The
//! rendered SQL goes through the [`AggregateNavigator`](crate::navigator::AggregateNavigator)
//! before it is handed out, together with its bind parameters.

pub mod builder;
pub mod model;
pub mod params;

pub use builder::{Limit, OrderBy, ReportQuery, WhereClause};
pub use model::{ModelSpec, ReportModel};
pub use params::{parse_date, ReportParams, TimeFilter};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Result type for query construction.
pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid date '{0}', expected MM/DD/YYYY")]
    InvalidDate(String),

    #[error("A date range needs both start_date and end_date")]
    IncompleteDateRange,

    #[error("Invalid sort direction '{0}', expected ASC or DESC")]
    InvalidDirection(String),

    #[error("Unknown report model '{0}'")]
    UnknownModel(String),

    #[error("Invalid value for '{key}': '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("Value for '{key}' out of range: {value}")]
    OutOfRange { key: String, value: i64 },
}

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindValue::Int(v) => write!(f, "{}", v),
            BindValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        BindValue::Int(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::Text(v.to_string())
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::Text(v)
    }
}

/// Bind parameters keyed by placeholder, colon included (`:dim_user_id`).
pub type BindParams = BTreeMap<String, BindValue>;

/// Rendered SQL and its bind parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: BindParams,
}

/// Job activity metrics, as `(alias, expression)` pairs over `fact_job`.
pub const JOB_ACTIVITY: &[(&str, &str)] = &[
    ("jobs", "COUNT(*)"),
    ("wallt", "ROUND(SUM(wallt) / 86400, 1)"),
    ("avg_wallt", "ROUND(AVG(wallt) / 86400, 1)"),
    ("max_wallt", "ROUND(MAX(wallt) / 86400, 1)"),
    ("cput", "ROUND(SUM(cput) / 86400, 1)"),
    ("avg_cput", "ROUND(AVG(cput) / 86400, 1)"),
    ("max_cput", "ROUND(MAX(cput) / 86400, 1)"),
    ("avg_mem", "ROUND(AVG(mem) / 1024, 1)"),
    ("max_mem", "ROUND(MAX(mem) / 1024, 1)"),
    ("avg_vmem", "ROUND(AVG(vmem) / 1024, 1)"),
    ("max_vmem", "ROUND(MAX(vmem) / 1024, 1)"),
    ("avg_wait", "ROUND(AVG(wait) / 3600, 1)"),
    ("avg_exect", "ROUND(AVG(exect) / 3600, 1)"),
    ("max_nodes", "ROUND(MAX(nodes), 1)"),
    ("avg_nodes", "ROUND(AVG(nodes), 1)"),
    ("max_cpus", "ROUND(MAX(cpus), 1)"),
    ("avg_cpus", "ROUND(AVG(cpus), 1)"),
];
