//! Report query builder.
//!
//! Renders one fact table, its dimension joins and the usual
//! filter/group/order/limit tail:
//!
//! ```text
//! SELECT <expr> AS <alias>, ... FROM <fact>
//!   [JOIN <dim> USING (<dim>_id) ...]
//!   [WHERE <clause> AND ...]
//!   [GROUP BY <expr>] [ORDER BY <alias> [DESC]] [LIMIT n [OFFSET m]]
//! ```

use super::model::ReportModel;
use super::params::ReportParams;
use super::{BindParams, BindValue, BuiltQuery, QueryResult};
use crate::model::primary_key_for;
use crate::navigator::AggregateNavigator;

// =============================================================================
// Clauses
// =============================================================================

/// One ANDed WHERE fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhereClause {
    /// `<column> <op> :<column>`; the value is bound when present.
    Comparison {
        column: String,
        op: String,
        value: Option<BindValue>,
    },
    /// Verbatim SQL with its own bind parameters.
    Raw { sql: String, params: BindParams },
}

impl WhereClause {
    pub fn comparison(
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<BindValue>,
    ) -> Self {
        WhereClause::Comparison {
            column: column.into(),
            op: op.into(),
            value: Some(value.into()),
        }
    }

    pub fn raw(sql: impl Into<String>, params: BindParams) -> Self {
        WhereClause::Raw {
            sql: sql.into(),
            params,
        }
    }

    fn render(&self, params: &mut BindParams) -> String {
        match self {
            WhereClause::Comparison { column, op, value } => {
                let key = format!(":{}", column);
                if let Some(value) = value {
                    params.insert(key.clone(), value.clone());
                }
                format!("{} {} {}", column, op, key)
            }
            WhereClause::Raw { sql, params: own } => {
                params.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
                sql.clone()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub expr: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub row_count: u64,
    pub offset: Option<u64>,
}

// =============================================================================
// Report Query
// =============================================================================

/// A single-fact report query.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct ReportQuery {
    fact: String,
    /// `(alias, expression)`, aliases unique.
    select: Vec<(String, String)>,
    dimensions: Vec<String>,
    wheres: Vec<WhereClause>,
    filter_expression: Option<String>,
    group_by: Option<String>,
    order_by: Option<OrderBy>,
    limit: Option<Limit>,
}

impl ReportQuery {
    pub fn new(fact: impl Into<String>) -> Self {
        Self {
            fact: fact.into(),
            select: Vec::new(),
            dimensions: Vec::new(),
            wheres: Vec::new(),
            filter_expression: None,
            group_by: None,
            order_by: None,
            limit: None,
        }
    }

    /// Add `expr AS alias`; an existing alias gets the new expression in place.
    pub fn select(mut self, alias: impl Into<String>, expr: impl Into<String>) -> Self {
        let (alias, expr) = (alias.into(), expr.into());
        match self.select.iter_mut().find(|(a, _)| *a == alias) {
            Some(entry) => entry.1 = expr,
            None => self.select.push((alias, expr)),
        }
        self
    }

    /// Add an expression aliased as its own quoted text.
    pub fn select_expr(self, expr: impl Into<String>) -> Self {
        let expr = expr.into();
        let alias = format!("'{}'", expr);
        self.select(alias, expr)
    }

    pub fn select_all<I, A, E>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = (A, E)>,
        A: Into<String>,
        E: Into<String>,
    {
        columns
            .into_iter()
            .fold(self, |query, (alias, expr)| query.select(alias, expr))
    }

    /// Join a dimension on its primary key. Joining twice is a no-op.
    pub fn join_dimension(mut self, dimension: impl Into<String>) -> Self {
        let dimension = dimension.into();
        if !self.dimensions.contains(&dimension) {
            self.dimensions.push(dimension);
        }
        self
    }

    /// Expression matched by the free-text `filter` parameter.
    pub fn filter_expression(mut self, expr: impl Into<String>) -> Self {
        self.filter_expression = Some(expr.into());
        self
    }

    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.wheres.push(clause);
        self
    }

    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.group_by = Some(expr.into());
        self
    }

    pub fn order_by(mut self, expr: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            expr: expr.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, row_count: u64, offset: Option<u64>) -> Self {
        self.limit = Some(Limit { row_count, offset });
        self
    }

    pub fn clear_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Join the model's dimension and add its grouping, filter expression
    /// and select columns.
    pub fn with_model(self, model: ReportModel) -> Self {
        let spec = model.spec();
        self.join_dimension(spec.dimension)
            .group_by(spec.group_by)
            .filter_expression(spec.filter)
            .select_all(spec.columns.iter().copied())
    }

    /// Apply report parameters: model, id filters, dates, text search, tag,
    /// sorting and paging.
    pub fn with_params(self, params: &ReportParams) -> QueryResult<Self> {
        let mut query = match params.report_model()? {
            Some(model) => self.with_model(model),
            None => self,
        };

        let ids = [
            ("dim_cluster_id", params.cluster_id),
            ("dim_queue_id", params.queue_id),
            ("dim_user_id", params.user_id),
            ("dim_group_id", params.group_id),
            ("dim_cpus_id", params.cpus_id),
        ];
        for (column, id) in ids {
            if let Some(id) = id {
                query = query.where_clause(WhereClause::comparison(column, "=", id));
            }
        }

        if let Some(time) = params.time_filter()? {
            let (sql, binds) = time.to_sql();
            query = query
                .where_clause(WhereClause::raw(sql, binds))
                .join_dimension("dim_date");
        }

        let filter = match (&params.filter, &query.filter_expression) {
            (Some(text), Some(expr)) => {
                let mut binds = BindParams::new();
                binds.insert(":filter".to_string(), BindValue::Text(format!("%{}%", text)));
                Some(WhereClause::raw(format!("{} LIKE :filter", expr), binds))
            }
            _ => None,
        };
        if let Some(clause) = filter {
            query = query.where_clause(clause);
        }

        if let Some(tag) = &params.tag {
            // tags are stored as a JSON array of strings
            let encoded = serde_json::to_string(tag).unwrap_or_else(|_| format!("\"{}\"", tag));
            query = query
                .join_dimension("dim_user")
                .where_clause(WhereClause::comparison("tags", "LIKE", format!("%{}%", encoded)));
        }

        if let Some(sort) = &params.sort {
            if query.has_alias(sort) {
                let descending = params.descending()?;
                query = query.order_by(sort.clone(), descending);
            }
        }

        if let Some((row_count, offset)) = params.limit()? {
            query = query.limit(row_count, offset);
        }

        Ok(query)
    }

    pub fn fact(&self) -> &str {
        &self.fact
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.select.iter().any(|(a, _)| a == alias)
    }

    /// Render without optimization.
    pub fn render(&self) -> BuiltQuery {
        let select = if self.select.is_empty() {
            "*".to_string()
        } else {
            self.select
                .iter()
                .map(|(alias, expr)| format!("{} AS {}", expr, alias))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut params = BindParams::new();
        let mut sql = format!("SELECT {}{}", select, self.render_from(&mut params));

        if let Some(group_by) = &self.group_by {
            sql.push_str(&format!(" GROUP BY {}", group_by));
        }

        if let Some(order_by) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {}", order_by.expr));
            if order_by.descending {
                sql.push_str(" DESC");
            }
        }

        if let Some(limit) = &self.limit {
            sql.push_str(&format!(" LIMIT {}", limit.row_count));
            if let Some(offset) = limit.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        BuiltQuery { sql, params }
    }

    /// Render the row-count variant without optimization.
    pub fn render_count(&self) -> BuiltQuery {
        let count = match &self.group_by {
            Some(group_by) => format!("COUNT(DISTINCT {})", group_by),
            None => "COUNT(*)".to_string(),
        };

        let mut params = BindParams::new();
        let sql = format!("SELECT {} AS count{}", count, self.render_from(&mut params));
        BuiltQuery { sql, params }
    }

    /// Render and pass the SQL through the aggregate navigator.
    pub fn build(&self, navigator: &AggregateNavigator<'_>) -> BuiltQuery {
        let BuiltQuery { sql, params } = self.render();
        BuiltQuery {
            sql: navigator.optimize(&sql),
            params,
        }
    }

    pub fn build_count(&self, navigator: &AggregateNavigator<'_>) -> BuiltQuery {
        let BuiltQuery { sql, params } = self.render_count();
        BuiltQuery {
            sql: navigator.optimize(&sql),
            params,
        }
    }

    // ` FROM ... [JOIN ...] [WHERE ...]`
    fn render_from(&self, params: &mut BindParams) -> String {
        let mut sql = format!(" FROM {}", self.fact);

        for dimension in &self.dimensions {
            sql.push_str(&format!(
                " JOIN {} USING ({})",
                dimension,
                primary_key_for(dimension)
            ));
        }

        if !self.wheres.is_empty() {
            let clauses: Vec<String> = self.wheres.iter().map(|w| w.render(params)).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql
    }
}
