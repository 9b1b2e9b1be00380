//! Aggregate selection.
//!
//! Given the usage of a query, find the aggregate table that can answer it:
//!
//! 1. Identify the single base fact among the used tables.
//! 2. Identify the joined dimensions.
//! 3. Replace each dimension by its smallest roll-up that still has every
//!    column the query uses from it.
//! 4. Look for an aggregate of the fact that carries all the resulting
//!    dimensions.
//! 5. If none does, undo the most recently applied roll-up and retry, until
//!    an aggregate matches or no roll-up is left.
//!
//! Undoing roll-ups in stack order gives one deterministic path from the most
//! aggressive roll-up to none at all.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::usage::{references_key_outside_join, word_regex, Usage, STRING_LITERAL};
use crate::catalog::Catalog;
use crate::error::WarehouseResult;
use crate::model::{Aggregate, Dimension, Fact};

static ALIAS_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAS\s+`?(\w+)`?").unwrap());

static ORDER_BY_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bORDER\s+BY\s+(.+?)(\s+LIMIT\b|\)|$)").unwrap()
});

static ORDER_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:ASC|DESC)$").unwrap());

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\w+").unwrap());

/// A dimension substituted by one of its roll-ups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollUp<'c> {
    pub original: &'c Dimension,
    pub roll_up: &'c Dimension,
}

/// The aggregate chosen for a query and the roll-ups it relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'c> {
    pub fact: &'c Fact,
    pub aggregate: &'c Aggregate,
    pub roll_ups: Vec<RollUp<'c>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome<'c> {
    Selected(Selection<'c>),
    /// None of the used tables is a base fact.
    NoFact,
    /// More than one base fact is used; not supported.
    MultipleFacts(Vec<String>),
    /// No aggregate can answer the query at any roll-up level.
    NoAggregate,
}

pub struct AggregateSelector<'c> {
    catalog: &'c Catalog,
    debug: bool,
}

impl<'c> AggregateSelector<'c> {
    pub fn new(catalog: &'c Catalog, debug: bool) -> Self {
        Self { catalog, debug }
    }

    pub fn select(&self, sql: &str, usage: &Usage) -> WarehouseResult<SelectionOutcome<'c>> {
        let facts = self.find_facts(&usage.tables);
        let fact = match facts.as_slice() {
            [] => return Ok(SelectionOutcome::NoFact),
            [fact] => *fact,
            many => {
                return Ok(SelectionOutcome::MultipleFacts(
                    many.iter().map(|f| f.name().to_string()).collect(),
                ))
            }
        };

        let dimensions = self.find_dimensions(&usage.tables);
        let non_key_columns = usage.non_key_columns();
        if self.debug {
            tracing::debug!(fact = fact.name(), columns = ?non_key_columns, "query uses columns");
        }

        let mut optimal: Vec<&'c Dimension> = dimensions.clone();
        // (position in `optimal`, roll-up applied there), in application order
        let mut applied: Vec<(usize, RollUp<'c>)> = Vec::new();

        for (position, &dimension) in dimensions.iter().enumerate() {
            if references_key_outside_join(sql, dimension.primary_key())? {
                if self.debug {
                    tracing::debug!(
                        dimension = dimension.name(),
                        "primary key used outside its join, keeping dimension"
                    );
                }
                continue;
            }

            let columns = dimension.table().intersect_columns(&non_key_columns);
            if self.debug {
                tracing::debug!(dimension = dimension.name(), columns = ?columns, "dimension intersection");
            }
            if let Some(roll_up) = self.catalog.find_roll_up_with(dimension, &columns) {
                if self.debug {
                    tracing::debug!(
                        dimension = dimension.name(),
                        roll_up = roll_up.name(),
                        "found roll-up"
                    );
                }
                optimal[position] = roll_up;
                applied.push((
                    position,
                    RollUp {
                        original: dimension,
                        roll_up,
                    },
                ));
            }
        }

        let loose_keys = self.loose_foreign_keys(fact, &dimensions, usage)?;
        let measures = MeasureReferences::scan(sql, fact, usage);

        loop {
            if let Some(aggregate) = self.find_aggregate_with(fact, &optimal, &loose_keys, &measures)? {
                if self.debug {
                    tracing::debug!(aggregate = aggregate.name(), "found aggregate");
                }
                return Ok(SelectionOutcome::Selected(Selection {
                    fact,
                    aggregate,
                    roll_ups: applied.into_iter().map(|(_, r)| r).collect(),
                }));
            }

            match applied.pop() {
                Some((position, undone)) => {
                    if self.debug {
                        tracing::debug!(
                            dimension = undone.original.name(),
                            roll_up = undone.roll_up.name(),
                            "no aggregate found, undoing roll-up"
                        );
                    }
                    optimal[position] = undone.original;
                }
                None => return Ok(SelectionOutcome::NoAggregate),
            }
        }
    }

    /// Distinct base facts, in order of first appearance.
    fn find_facts(&self, tables: &[String]) -> Vec<&'c Fact> {
        let mut facts: Vec<&'c Fact> = Vec::new();
        for fact in tables.iter().filter_map(|t| self.catalog.fact(t)) {
            if !facts.iter().any(|f| f.name() == fact.name()) {
                facts.push(fact);
            }
        }
        facts
    }

    /// Distinct dimensions, in order of first appearance.
    fn find_dimensions(&self, tables: &[String]) -> Vec<&'c Dimension> {
        let mut dimensions: Vec<&'c Dimension> = Vec::new();
        for dimension in tables.iter().filter_map(|t| self.catalog.dimension(t)) {
            if !dimensions.iter().any(|d| d.name() == dimension.name()) {
                dimensions.push(dimension);
            }
        }
        dimensions
    }

    /// Foreign keys of the fact that the query references without joining
    /// their dimension. An aggregate must carry them as they are.
    fn loose_foreign_keys(
        &self,
        fact: &Fact,
        joined: &[&Dimension],
        usage: &Usage,
    ) -> WarehouseResult<Vec<String>> {
        let mut keys = Vec::new();
        for key in fact.foreign_keys().iter().filter(|k| usage.uses_column(k)) {
            let dimension = self.catalog.dimension_for_key(key)?;
            if !joined.iter().any(|d| d.name() == dimension.name()) {
                keys.push(key.clone());
            }
        }
        Ok(keys)
    }

    fn find_aggregate_with(
        &self,
        fact: &'c Fact,
        dimensions: &[&Dimension],
        loose_keys: &[String],
        measures: &MeasureReferences,
    ) -> WarehouseResult<Option<&'c Aggregate>> {
        for aggregate in self.catalog.aggregates_of(fact.name()) {
            if !aggregate.fact().has_dimensions(dimensions) {
                continue;
            }
            if !aggregate.fact().table().has_columns(loose_keys) {
                continue;
            }
            if !measures.covered_by(aggregate)? {
                continue;
            }
            return Ok(Some(aggregate));
        }
        Ok(None)
    }
}

/// Base-fact measures referenced by the query, and where.
struct MeasureReferences<'a> {
    sql: &'a str,
    measures: Vec<&'a str>,
    aliases: HashSet<String>,
}

impl<'a> MeasureReferences<'a> {
    fn scan(sql: &'a str, fact: &'a Fact, usage: &Usage) -> Self {
        let measures = fact
            .measures()
            .iter()
            .map(String::as_str)
            .filter(|m| usage.uses_column(m))
            .collect();
        let aliases = ALIAS_DECLARATION
            .captures_iter(sql)
            .map(|caps| caps[1].to_lowercase())
            .collect();
        Self {
            sql,
            measures,
            aliases,
        }
    }

    /// True when every measure reference sits inside an expression the
    /// aggregate map rewrites. A word that is also a select alias is skipped
    /// only where it names the alias: after `AS` and as an `ORDER BY` item.
    fn covered_by(&self, aggregate: &Aggregate) -> WarehouseResult<bool> {
        if self.measures.is_empty() {
            return Ok(true);
        }

        let mut remaining = STRING_LITERAL.replace_all(self.sql, "''").into_owned();
        for (expression, _) in aggregate.aggregates().iter() {
            remaining = remaining.replace(expression, " ");
        }
        let remaining = PLACEHOLDER.replace_all(&remaining, " ");
        let remaining = ALIAS_DECLARATION.replace_all(&remaining, " ");
        let remaining = self.strip_ordered_aliases(&remaining);

        for measure in &self.measures {
            if word_regex(measure, true)?.is_match(&remaining) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Drop `ORDER BY` items that name a select alias.
    fn strip_ordered_aliases(&self, sql: &str) -> String {
        ORDER_BY_CLAUSE
            .replace_all(sql, |caps: &Captures| {
                let kept: Vec<&str> = caps[1]
                    .split(',')
                    .map(str::trim)
                    .filter(|item| {
                        let name = ORDER_DIRECTION.replace(item, "");
                        !self
                            .aliases
                            .contains(&name.trim_matches('`').to_lowercase())
                    })
                    .collect();
                format!("ORDER BY {}{}", kept.join(", "), &caps[2])
            })
            .into_owned()
    }
}
