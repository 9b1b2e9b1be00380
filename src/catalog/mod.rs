//! The schema catalog.
//!
//! Owns every dimension, fact and aggregate known to the warehouse and
//! indexes them by name. A catalog is built once from a
//! [`CatalogDefinition`] and is read-only afterwards; share it behind a
//! reference or an `Arc` with every request that needs to optimize SQL.

pub mod definition;
pub mod loader;

pub use definition::{
    AggregateDef, AggregateMeasureDef, AggregationTypes, CatalogDefinition, DimensionDef, FactDef,
};
pub use loader::load_catalog;

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{WarehouseError, WarehouseResult};
use crate::model::{AggregatedMeasure, Aggregate, Dimension, Fact, TableRef};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Dimension(usize),
    Fact(usize),
    Aggregate(usize),
}

/// Registry of all warehouse tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, Slot>,
    dimensions: Vec<Dimension>,
    facts: Vec<Fact>,
    aggregates: Vec<Aggregate>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog by applying every definition in document order.
    pub fn from_definition(def: CatalogDefinition) -> WarehouseResult<Self> {
        let mut catalog = Catalog::new();
        for dimension in def.dimensions {
            catalog.add_dimension(dimension)?;
        }
        for fact in def.facts {
            catalog.add_fact(fact)?;
        }
        for aggregate in def.aggregates {
            catalog.add_aggregate(aggregate)?;
        }
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> WarehouseResult<Self> {
        Self::from_definition(serde_json::from_str(json)?)
    }

    pub fn from_toml_str(toml: &str) -> WarehouseResult<Self> {
        Self::from_definition(toml::from_str(toml)?)
    }

    /// Register a dimension and wire it as a roll-up of its base, if any.
    ///
    /// The base dimension must already be registered.
    pub fn add_dimension(&mut self, def: DimensionDef) -> WarehouseResult<&Dimension> {
        let context = format!("dimension '{}'", def.name);
        self.check_new_name(&def.name)?;
        check_identifiers(&def.attributes, &context)?;

        let base_index = match &def.base {
            Some(base) => match self.tables.get(base) {
                Some(Slot::Dimension(i)) => Some(*i),
                _ => {
                    return Err(WarehouseError::config(format!(
                        "base dimension '{}' of {} is not registered",
                        base, context
                    )))
                }
            },
            None => None,
        };

        let dimension = Dimension::new(&def.name, &def.attributes, def.base.clone());
        if let Some(i) = base_index {
            self.dimensions[i].add_roll_up(&def.name);
        }

        let index = self.dimensions.len();
        self.dimensions.push(dimension);
        self.tables.insert(def.name, Slot::Dimension(index));
        Ok(&self.dimensions[index])
    }

    pub fn add_fact(&mut self, def: FactDef) -> WarehouseResult<&Fact> {
        let context = format!("fact '{}'", def.name);
        self.check_new_name(&def.name)?;
        self.check_dimensions(&def.dimensions, &context)?;
        check_identifiers(&def.measures, &context)?;

        let fact = Fact::new(&def.name, &def.dimensions, &def.measures);
        let index = self.facts.len();
        self.facts.push(fact);
        self.tables.insert(def.name, Slot::Fact(index));
        Ok(&self.facts[index])
    }

    /// Register an aggregate of an already registered fact.
    pub fn add_aggregate(&mut self, def: AggregateDef) -> WarehouseResult<&Aggregate> {
        let context = format!("aggregate '{}'", def.name);
        self.check_new_name(&def.name)?;
        self.check_dimensions(&def.dimensions, &context)?;

        let base = self.fact(&def.base).ok_or_else(|| {
            WarehouseError::config(format!(
                "base fact '{}' of {} is not registered",
                def.base, context
            ))
        })?;
        for name in &def.dimensions {
            let covered = self.dimension(name).is_some_and(|dimension| {
                base.dimensions().iter().any(|d| {
                    d.as_str() == dimension.name() || Some(d.as_str()) == dimension.base()
                })
            });
            if !covered {
                return Err(WarehouseError::config(format!(
                    "{} uses dimension '{}', which is neither a dimension of '{}' nor a roll-up of one",
                    context, name, def.base
                )));
            }
        }
        for measure in &def.measures {
            if !base.has_measure(&measure.measure) {
                return Err(WarehouseError::config(format!(
                    "{} aggregates '{}', which is not a measure of '{}'",
                    context, measure.measure, def.base
                )));
            }
            if measure.types.to_vec().is_empty() {
                return Err(WarehouseError::config(format!(
                    "{} declares no aggregation type for '{}'",
                    context, measure.measure
                )));
            }
        }

        let measures: Vec<AggregatedMeasure> = def.measures.iter().map(Into::into).collect();
        let aggregate = Aggregate::new(&def.name, &def.base, &def.dimensions, &measures);
        let index = self.aggregates.len();
        self.aggregates.push(aggregate);
        self.tables.insert(def.name, Slot::Aggregate(index));
        Ok(&self.aggregates[index])
    }

    /// Look up a table of any kind.
    pub fn table(&self, name: &str) -> Option<TableRef<'_>> {
        self.tables.get(name).map(|slot| match *slot {
            Slot::Dimension(i) => TableRef::Dimension(&self.dimensions[i]),
            Slot::Fact(i) => TableRef::Fact(&self.facts[i]),
            Slot::Aggregate(i) => TableRef::Aggregate(&self.aggregates[i]),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// All columns of a registered table.
    pub fn columns_of(&self, name: &str) -> WarehouseResult<&[String]> {
        self.table(name)
            .map(|t| t.columns())
            .ok_or_else(|| WarehouseError::UnknownTable(name.to_string()))
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        match self.tables.get(name) {
            Some(Slot::Dimension(i)) => Some(&self.dimensions[*i]),
            _ => None,
        }
    }

    /// Look up a base fact. Aggregates are not returned here.
    pub fn fact(&self, name: &str) -> Option<&Fact> {
        match self.tables.get(name) {
            Some(Slot::Fact(i)) => Some(&self.facts[*i]),
            _ => None,
        }
    }

    pub fn aggregate(&self, name: &str) -> Option<&Aggregate> {
        match self.tables.get(name) {
            Some(Slot::Aggregate(i)) => Some(&self.aggregates[*i]),
            _ => None,
        }
    }

    /// Dimensions in registration order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Aggregates in registration order.
    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    /// Aggregates built from the named fact, in registration order.
    pub fn aggregates_of<'a>(&'a self, fact: &str) -> impl Iterator<Item = &'a Aggregate> + 'a {
        let fact = fact.to_string();
        self.aggregates.iter().filter(move |a| a.base_name() == fact)
    }

    /// Declared roll-ups of a dimension, in declaration order.
    pub fn roll_ups_of<'a>(
        &'a self,
        dimension: &'a Dimension,
    ) -> impl Iterator<Item = &'a Dimension> + 'a {
        dimension
            .roll_ups()
            .iter()
            .filter_map(move |name| self.dimension(name))
    }

    /// Find the smallest roll-up of `dimension` that has all the given columns.
    ///
    /// Only direct roll-ups are considered. Ties on column count go to the
    /// roll-up declared first.
    pub fn find_roll_up_with<'a, S: AsRef<str>>(
        &'a self,
        dimension: &'a Dimension,
        columns: &[S],
    ) -> Option<&'a Dimension> {
        self.roll_ups_of(dimension)
            .filter(|r| r.table().has_columns(columns))
            .fold(None, |best: Option<&Dimension>, candidate| match best {
                Some(b) if b.columns().len() <= candidate.columns().len() => Some(b),
                _ => Some(candidate),
            })
    }

    /// The dimension whose primary key is `key`.
    pub fn dimension_for_key(&self, key: &str) -> WarehouseResult<&Dimension> {
        self.dimensions
            .iter()
            .find(|d| d.primary_key() == key)
            .ok_or_else(|| WarehouseError::UnknownColumn(key.to_string()))
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn check_new_name(&self, name: &str) -> WarehouseResult<()> {
        if !IDENTIFIER.is_match(name) {
            return Err(WarehouseError::config(format!(
                "'{}' is not a valid table name",
                name
            )));
        }
        if self.tables.contains_key(name) {
            return Err(WarehouseError::config(format!(
                "table '{}' is defined more than once",
                name
            )));
        }
        Ok(())
    }

    fn check_dimensions(&self, dimensions: &[String], context: &str) -> WarehouseResult<()> {
        for name in dimensions {
            if self.dimension(name).is_none() {
                return Err(WarehouseError::config(format!(
                    "dimension '{}' of {} is not registered",
                    name, context
                )));
            }
        }
        Ok(())
    }
}

fn check_identifiers(columns: &[String], context: &str) -> WarehouseResult<()> {
    match columns.iter().find(|c| !IDENTIFIER.is_match(c)) {
        Some(bad) => Err(WarehouseError::config(format!(
            "'{}' in {} is not a valid column name",
            bad, context
        ))),
        None => Ok(()),
    }
}
