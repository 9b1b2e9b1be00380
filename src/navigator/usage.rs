//! Usage extraction: which catalog tables and columns a query touches.
//!
//! This is a token scan, not a SQL parser. It understands the shape the
//! report [`query`](crate::query) builder emits: one `FROM <table>`, any
//! number of `JOIN <table> USING (<key>)`, and column names written as bare
//! (optionally back-quoted) words. Column names inside string literals or
//! comments are reported as used, and aliased columns are not recognised.
//!
//! Matching here ignores case, but [`rewrite`](super::rewrite) replaces
//! names case-sensitively. A query that spells a table or key in upper case
//! (`USING (DIM_DATE_ID)`) is still selected for an aggregate, yet its key
//! is not renamed. Write table and key names in lower case as the builder
//! does.

use regex::Regex;
use std::sync::LazyLock;

use crate::catalog::Catalog;
use crate::error::{WarehouseError, WarehouseResult};
use crate::model::is_key_column;

static TABLE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\b(?:FROM|JOIN)\s+`?(\w+)`?").unwrap());

/// A single-quoted SQL string literal.
pub(crate) static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^'\\]|\\.|'')*'").unwrap());

/// Tables and columns referenced by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    /// Table names in textual order, duplicates kept.
    pub tables: Vec<String>,
    /// Catalog columns of those tables that occur as words in the SQL.
    pub columns: Vec<String>,
}

impl Usage {
    /// Attribute and measure columns; `_id` keys are structural and excluded.
    pub fn non_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !is_key_column(c))
            .collect()
    }

    pub fn key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| is_key_column(c))
            .collect()
    }

    pub fn uses_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Find the tables named after `FROM`/`JOIN` and the catalog columns used.
///
/// Fails with [`WarehouseError::Parse`] when no table reference exists and
/// with [`WarehouseError::UnknownTable`] when a referenced table is not in
/// the catalog.
pub fn extract_usage(catalog: &Catalog, sql: &str) -> WarehouseResult<Usage> {
    let tables: Vec<String> = TABLE_REFERENCE
        .captures_iter(sql)
        .map(|caps| caps[1].to_string())
        .collect();

    if tables.is_empty() {
        return Err(WarehouseError::Parse(
            "no FROM or JOIN table reference found".to_string(),
        ));
    }

    let mut candidates: Vec<&String> = Vec::new();
    for table in &tables {
        for column in catalog.columns_of(table)? {
            if !candidates.contains(&column) {
                candidates.push(column);
            }
        }
    }

    let mut columns = Vec::new();
    for column in candidates {
        if word_regex(column, true)?.is_match(sql) {
            columns.push(column.clone());
        }
    }

    Ok(Usage { tables, columns })
}

/// True when `key` occurs anywhere other than a `USING (<key>)` join clause
/// or a `:<key>` bind placeholder.
pub fn references_key_outside_join(sql: &str, key: &str) -> WarehouseResult<bool> {
    let escaped = regex::escape(key);
    let all = word_regex(key, true)?.find_iter(sql).count();
    let joins = compile(&format!(r"(?i)\bUSING\s*\(\s*`?{escaped}`?\s*\)"))?
        .find_iter(sql)
        .count();
    let placeholders = compile(&format!(r"(?i):{escaped}\b"))?.find_iter(sql).count();
    Ok(all > joins + placeholders)
}

/// Whole-word matcher for an identifier.
pub(crate) fn word_regex(word: &str, case_insensitive: bool) -> WarehouseResult<Regex> {
    let flags = if case_insensitive { "(?i)" } else { "" };
    compile(&format!(r"{flags}\b{}\b", regex::escape(word)))
}

pub(crate) fn compile(pattern: &str) -> WarehouseResult<Regex> {
    Regex::new(pattern).map_err(|e| WarehouseError::Parse(e.to_string()))
}
