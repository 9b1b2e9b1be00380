//! # ubmod-dw
//!
//! Aggregate navigation for a job-accounting star schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Catalog definition (datawarehouse.json)           │
//! │   (dimensions + roll-ups, facts, aggregate tables)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [catalog]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Catalog (immutable, shared)                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!  ReportParams ──▶ [query] ReportQuery::render
//!                          │ SQL against the base fact
//!                          ▼ [navigator]
//! ┌─────────────────────────────────────────────────────────┐
//! │   usage ──▶ selector (roll-up backtracking) ──▶ rewrite  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!        SQL against an aggregate, or the input unchanged
//! ```
//!
//! ## Example
//!
//! ```
//! use ubmod_dw::prelude::*;
//!
//! let catalog = Catalog::from_json_str(r#"{
//!   "dimensions": [
//!     { "name": "dim_date",  "attributes": ["date", "month", "year"] },
//!     { "name": "dim_month", "attributes": ["month", "year"], "base": "dim_date" },
//!     { "name": "dim_user",  "attributes": ["name"] }
//!   ],
//!   "facts": [
//!     { "name": "fact_job", "dimensions": ["dim_date", "dim_user"], "facts": ["cput"] }
//!   ],
//!   "aggregates": [
//!     { "name": "agg_month", "base": "fact_job", "dimensions": ["dim_month"],
//!       "facts": [{ "base": "cput", "type": "sum" }] }
//!   ]
//! }"#).unwrap();
//!
//! let navigator = AggregateNavigator::new(&catalog);
//! let sql = navigator.optimize(
//!     "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6",
//! );
//! assert_eq!(
//!     sql,
//!     "SELECT SUM(cput_sum) AS cput FROM agg_month JOIN dim_month USING (dim_month_id) WHERE month = 6",
//! );
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod navigator;
pub mod query;
pub mod telemetry;

pub use error::{WarehouseError, WarehouseResult};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::catalog::{load_catalog, Catalog, CatalogDefinition};
    pub use crate::error::{WarehouseError, WarehouseResult};
    pub use crate::model::{Aggregate, AggregationType, Dimension, Fact, Table};
    pub use crate::navigator::{AggregateNavigator, NavigatorOptions, Optimization};
    pub use crate::query::{BuiltQuery, ReportModel, ReportParams, ReportQuery, WhereClause};
}
