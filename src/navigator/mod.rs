//! The aggregate navigator.
//!
//! Rewrites star-schema queries to read from pre-computed aggregate tables
//! when one can answer them:
//!
//! ```text
//!   SQL ──▶ usage ──▶ selector ──▶ rewrite ──▶ SQL'
//!             │           │
//!             └───────────┴──▶ no match / error ──▶ SQL (unchanged)
//! ```
//!
//! Optimization is an acceleration only. [`AggregateNavigator::optimize`]
//! never fails: any error, or the absence of a usable aggregate, yields the
//! input text byte for byte.

pub mod rewrite;
pub mod selector;
pub mod usage;

pub use rewrite::{replace_word, rewrite};
pub use selector::{AggregateSelector, RollUp, Selection, SelectionOutcome};
pub use usage::{extract_usage, references_key_outside_join, Usage};

use serde::{Deserialize, Serialize};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use crate::catalog::Catalog;
use crate::error::WarehouseResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorOptions {
    /// Emit each decision at `debug` level.
    pub debug: bool,
    /// Reject rewrites that no longer parse as MySQL when the input did.
    pub verify_syntax: bool,
}

/// Why a query was left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    NoFact,
    MultipleFacts(Vec<String>),
    NoAggregate,
    SyntaxCheckFailed(String),
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::NoFact => write!(f, "no fact table referenced"),
            Fallback::MultipleFacts(facts) => {
                write!(f, "more than one fact table referenced: {}", facts.join(", "))
            }
            Fallback::NoAggregate => write!(f, "no aggregate found"),
            Fallback::SyntaxCheckFailed(msg) => {
                write!(f, "rewritten query failed to parse: {}", msg)
            }
        }
    }
}

/// Outcome of [`AggregateNavigator::navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimization {
    Rewritten {
        sql: String,
        aggregate: String,
        /// `(dimension, roll-up)` name pairs applied by the rewrite.
        roll_ups: Vec<(String, String)>,
    },
    Unchanged {
        reason: Fallback,
    },
}

impl Optimization {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Optimization::Rewritten { .. })
    }

    /// The SQL to execute: the rewrite, or `original` when unchanged.
    pub fn into_sql(self, original: &str) -> String {
        match self {
            Optimization::Rewritten { sql, .. } => sql,
            Optimization::Unchanged { .. } => original.to_string(),
        }
    }
}

/// Request-scoped entry point over a shared, read-only catalog.
#[derive(Debug, Clone, Copy)]
pub struct AggregateNavigator<'c> {
    catalog: &'c Catalog,
    options: NavigatorOptions,
}

impl<'c> AggregateNavigator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self::with_options(catalog, NavigatorOptions::default())
    }

    pub fn with_options(catalog: &'c Catalog, options: NavigatorOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn options(&self) -> NavigatorOptions {
        self.options
    }

    /// Rewrite `sql` onto an aggregate if possible, or the input unchanged.
    pub fn optimize(&self, sql: &str) -> String {
        match self.navigate(sql) {
            Ok(optimization) => optimization.into_sql(sql),
            Err(err) => {
                if self.options.debug {
                    tracing::debug!(error = %err, "optimization failed, using original query");
                } else {
                    tracing::trace!(error = %err, "optimization failed, using original query");
                }
                sql.to_string()
            }
        }
    }

    /// Run the navigator and report what it decided.
    pub fn navigate(&self, sql: &str) -> WarehouseResult<Optimization> {
        let debug = self.options.debug;

        let usage = extract_usage(self.catalog, sql)?;
        if debug {
            tracing::debug!(tables = ?usage.tables, columns = ?usage.columns, "query usage");
        }

        let selector = AggregateSelector::new(self.catalog, debug);
        let selection = match selector.select(sql, &usage)? {
            SelectionOutcome::Selected(selection) => selection,
            SelectionOutcome::NoFact => return Ok(self.unchanged(Fallback::NoFact)),
            SelectionOutcome::MultipleFacts(facts) => {
                return Ok(self.unchanged(Fallback::MultipleFacts(facts)))
            }
            SelectionOutcome::NoAggregate => return Ok(self.unchanged(Fallback::NoAggregate)),
        };

        let rewritten = rewrite(sql, &selection)?;

        if self.options.verify_syntax {
            if let Err(err) = check_syntax(&rewritten) {
                if check_syntax(sql).is_ok() {
                    return Ok(self.unchanged(Fallback::SyntaxCheckFailed(err)));
                }
            }
        }

        if debug {
            tracing::debug!(
                aggregate = selection.aggregate.name(),
                sql = %rewritten,
                "optimized query"
            );
        }

        Ok(Optimization::Rewritten {
            sql: rewritten,
            aggregate: selection.aggregate.name().to_string(),
            roll_ups: selection
                .roll_ups
                .iter()
                .map(|r| (r.original.name().to_string(), r.roll_up.name().to_string()))
                .collect(),
        })
    }

    fn unchanged(&self, reason: Fallback) -> Optimization {
        if self.options.debug {
            tracing::debug!(%reason, "query left unchanged");
        } else {
            tracing::trace!(%reason, "query left unchanged");
        }
        Optimization::Unchanged { reason }
    }
}

fn check_syntax(sql: &str) -> Result<(), String> {
    Parser::parse_sql(&MySqlDialect {}, sql)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
