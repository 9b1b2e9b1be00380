//! Declarative catalog definitions, as read from `datawarehouse.json`.
//!
//! ```json
//! {
//!   "dimensions": [
//!     { "name": "dim_date",  "attributes": ["date", "month", "year"] },
//!     { "name": "dim_month", "attributes": ["month", "year"], "base": "dim_date" }
//!   ],
//!   "facts": [
//!     { "name": "fact_job", "dimensions": ["dim_date"], "facts": ["cput"] }
//!   ],
//!   "aggregates": [
//!     { "name": "agg_month", "base": "fact_job", "dimensions": ["dim_month"],
//!       "facts": [{ "base": "cput", "type": "sum" }] }
//!   ]
//! }
//! ```
//!
//! The lists are applied in order: base dimensions before their roll-ups,
//! dimensions and facts before aggregates.

use serde::{Deserialize, Serialize};

use crate::model::{AggregatedMeasure, AggregationType};

/// The whole catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub dimensions: Vec<DimensionDef>,
    #[serde(default)]
    pub facts: Vec<FactDef>,
    #[serde(default)]
    pub aggregates: Vec<AggregateDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDef {
    pub name: String,
    pub attributes: Vec<String>,
    /// Dimension this one is a roll-up of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactDef {
    pub name: String,
    pub dimensions: Vec<String>,
    #[serde(rename = "facts")]
    pub measures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDef {
    pub name: String,
    /// The fact table being aggregated.
    pub base: String,
    pub dimensions: Vec<String>,
    #[serde(rename = "facts")]
    pub measures: Vec<AggregateMeasureDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMeasureDef {
    /// Measure column of the base fact.
    #[serde(rename = "base")]
    pub measure: String,
    #[serde(rename = "type")]
    pub types: AggregationTypes,
}

/// `"sum"` or `["sum", "max"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationTypes {
    One(AggregationType),
    Many(Vec<AggregationType>),
}

impl AggregationTypes {
    pub fn to_vec(&self) -> Vec<AggregationType> {
        match self {
            AggregationTypes::One(t) => vec![*t],
            AggregationTypes::Many(ts) => ts.clone(),
        }
    }
}

impl From<&AggregateMeasureDef> for AggregatedMeasure {
    fn from(def: &AggregateMeasureDef) -> Self {
        AggregatedMeasure {
            measure: def.measure.clone(),
            types: def.types.to_vec(),
        }
    }
}
