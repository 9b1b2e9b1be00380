//! Textual query rewriting onto a selected aggregate.

use regex::Captures;

use super::selector::Selection;
use super::usage::{compile, STRING_LITERAL};
use crate::error::WarehouseResult;

/// Rewrite `sql` to read from the selected aggregate.
///
/// Substitutions are applied in order:
/// 1. base fact name to aggregate name;
/// 2. per retained roll-up, dimension name and primary key to the roll-up's;
/// 3. every aggregate map expression to its replacement.
///
/// Names are replaced as whole, case-sensitive words, so hand-written SQL
/// must spell table and key names exactly as the catalog does.
/// Bind placeholders (`:name`) and single-quoted literals are left alone,
/// which keeps the parameter mapping and quoted column labels intact.
pub fn rewrite(sql: &str, selection: &Selection<'_>) -> WarehouseResult<String> {
    let mut rewritten = String::with_capacity(sql.len());
    let mut last = 0;
    for literal in STRING_LITERAL.find_iter(sql) {
        rewritten.push_str(&rewrite_segment(&sql[last..literal.start()], selection)?);
        rewritten.push_str(literal.as_str());
        last = literal.end();
    }
    rewritten.push_str(&rewrite_segment(&sql[last..], selection)?);
    Ok(rewritten)
}

fn rewrite_segment(sql: &str, selection: &Selection<'_>) -> WarehouseResult<String> {
    let mut rewritten = replace_word(sql, selection.fact.name(), selection.aggregate.name())?;

    for roll_up in &selection.roll_ups {
        rewritten = replace_word(&rewritten, roll_up.original.name(), roll_up.roll_up.name())?;
        rewritten = replace_word(
            &rewritten,
            roll_up.original.primary_key(),
            roll_up.roll_up.primary_key(),
        )?;
    }

    for (expression, replacement) in selection.aggregate.aggregates().iter() {
        rewritten = rewritten.replace(expression, replacement);
    }

    Ok(rewritten)
}

/// Replace whole-word occurrences of `from` that are not bind placeholders.
pub fn replace_word(sql: &str, from: &str, to: &str) -> WarehouseResult<String> {
    let pattern = compile(&format!(r"(^|[^:\w]){}\b", regex::escape(from)))?;
    Ok(pattern
        .replace_all(sql, |caps: &Captures| format!("{}{}", &caps[1], to))
        .into_owned())
}
