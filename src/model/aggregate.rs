//! Aggregate (roll-up) tables.
//!
//! An aggregate is a fact table pre-computed from a base fact at a coarser
//! grain. Besides its own columns it carries an [`AggregateMap`] describing
//! how aggregate expressions written against the base fact are expressed
//! against the aggregate's columns:
//!
//! ```text
//! COUNT(*)   -> SUM(fact_job_count)
//! SUM(cput)  -> SUM(cput_sum)
//! AVG(cput)  -> SUM(cput_sum)/SUM(fact_job_count)
//! ```

use super::fact::Fact;
use super::types::AggregationType;

/// A measure of the base fact and the aggregations stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedMeasure {
    pub measure: String,
    pub types: Vec<AggregationType>,
}

/// Ordered mapping from base-fact expressions to aggregate expressions.
///
/// Insertion order is kept so substitutions are applied deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateMap {
    entries: Vec<(String, String)>,
}

impl AggregateMap {
    /// Insert a mapping; an existing key keeps its position and gets the new value.
    pub fn insert(&mut self, expression: String, replacement: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == expression) {
            Some(entry) => entry.1 = replacement,
            None => self.entries.push((expression, replacement)),
        }
    }

    pub fn get(&self, expression: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == expression)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.get(expression).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A pre-computed roll-up of a base fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    fact: Fact,
    base: String,
    aggregates: AggregateMap,
}

impl Aggregate {
    pub fn new(
        name: &str,
        base: &str,
        dimensions: &[String],
        measures: &[AggregatedMeasure],
    ) -> Self {
        let count_column = count_column_for(base);

        let mut aggregates = AggregateMap::default();
        aggregates.insert("COUNT(*)".to_string(), format!("SUM({count_column})"));

        let mut columns: Vec<String> = Vec::new();
        for measure in measures {
            for agg in &measure.types {
                let column = stored_column(&measure.measure, *agg);
                if !columns.contains(&column) {
                    columns.push(column);
                }
                add_mapping(&mut aggregates, &measure.measure, *agg, &count_column);
                // sum implies avg
                if *agg == AggregationType::Sum {
                    add_mapping(&mut aggregates, &measure.measure, AggregationType::Avg, &count_column);
                }
            }
        }
        columns.push(count_column);

        Self {
            fact: Fact::new(name, dimensions, &columns),
            base: base.to_string(),
            aggregates,
        }
    }

    /// The aggregate viewed as a fact table.
    pub fn fact(&self) -> &Fact {
        &self.fact
    }

    pub fn name(&self) -> &str {
        self.fact.name()
    }

    pub fn columns(&self) -> &[String] {
        self.fact.columns()
    }

    /// Name of the fact this aggregates.
    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn aggregates(&self) -> &AggregateMap {
        &self.aggregates
    }
}

/// Row-count column of aggregates built from `base`: `<base>_count`.
pub fn count_column_for(base: &str) -> String {
    format!("{base}_count")
}

// avg is stored as a sum and recombined with the row count
fn stored_column(measure: &str, agg: AggregationType) -> String {
    match agg {
        AggregationType::Avg => format!("{measure}_sum"),
        other => format!("{measure}_{}", other.suffix()),
    }
}

fn add_mapping(map: &mut AggregateMap, measure: &str, agg: AggregationType, count_column: &str) {
    let expression = format!("{}({measure})", agg.function());
    let replacement = match agg {
        AggregationType::Avg => format!("SUM({measure}_sum)/SUM({count_column})"),
        AggregationType::Count => format!("SUM({measure}_count)"),
        other => format!("{}({measure}_{})", other.function(), other.suffix()),
    };
    map.insert(expression, replacement);
}
