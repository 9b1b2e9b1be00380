//! Runs original and rewritten queries against an in-memory warehouse and
//! compares their results.

#[path = "../common/mod.rs"]
mod common;

use rusqlite::types::Value;
use rusqlite::{params, Connection, ToSql};
use ubmod_dw::catalog::Catalog;
use ubmod_dw::navigator::AggregateNavigator;
use ubmod_dw::query::{
    BindParams, BindValue, BuiltQuery, ReportParams, ReportQuery, WhereClause,
};

const DIMENSION_ROWS: &str = r#"
INSERT INTO dim_date VALUES
  (1, '2011-05-30', 5, 2011),
  (2, '2011-06-01', 6, 2011),
  (3, '2011-06-15', 6, 2011),
  (4, '2011-07-01', 7, 2011),
  (5, '2012-06-01', 6, 2012);
INSERT INTO dim_month VALUES (1, 5, 2011), (2, 6, 2011), (3, 7, 2011), (4, 6, 2012);
INSERT INTO dim_year VALUES (1, 2011), (2, 2012);
INSERT INTO dim_user VALUES
  (1, 'alice', 'Alice Archer', '["physics"]'),
  (2, 'bob', NULL, '["chemistry","physics"]'),
  (3, 'carol', 'Carol Chen', NULL);
INSERT INTO dim_cluster VALUES (1, 'edge', 'east'), (2, 'rush', 'east'), (3, 'lake', 'west');
INSERT INTO dim_site VALUES (1, 'east'), (2, 'west');
"#;

const AGGREGATE_ROWS: &str = r#"
INSERT INTO agg_date_site (dim_date_id, dim_site_id, cput_sum, fact_job_count)
  SELECT f.dim_date_id, s.dim_site_id, SUM(f.cput), COUNT(*)
  FROM fact_job f
  JOIN dim_cluster c ON c.dim_cluster_id = f.dim_cluster_id
  JOIN dim_site s ON s.site = c.site
  GROUP BY f.dim_date_id, s.dim_site_id;
INSERT INTO agg_month_cluster
  (dim_month_id, dim_user_id, dim_cluster_id, cput_sum, cput_max, wallt_sum, fact_job_count)
  SELECT m.dim_month_id, f.dim_user_id, f.dim_cluster_id,
         SUM(f.cput), MAX(f.cput), SUM(f.wallt), COUNT(*)
  FROM fact_job f
  JOIN dim_date d ON d.dim_date_id = f.dim_date_id
  JOIN dim_month m ON m.month = d.month AND m.year = d.year
  GROUP BY m.dim_month_id, f.dim_user_id, f.dim_cluster_id;
INSERT INTO agg_year (dim_year_id, dim_user_id, dim_cluster_id, cput_sum, fact_job_count)
  SELECT y.dim_year_id, f.dim_user_id, f.dim_cluster_id, SUM(f.cput), COUNT(*)
  FROM fact_job f
  JOIN dim_date d ON d.dim_date_id = f.dim_date_id
  JOIN dim_year y ON y.year = d.year
  GROUP BY y.dim_year_id, f.dim_user_id, f.dim_cluster_id;
"#;

/// Create every catalog table and load a small job history.
fn warehouse(catalog: &Catalog) -> Connection {
    let conn = Connection::open_in_memory().unwrap();

    let tables = catalog
        .dimensions()
        .iter()
        .map(|d| d.table())
        .chain(catalog.facts().iter().map(|f| f.table()))
        .chain(catalog.aggregates().iter().map(|a| a.fact().table()));
    for table in tables {
        conn.execute(
            &format!("CREATE TABLE {} ({})", table.name(), table.columns().join(", ")),
            [],
        )
        .unwrap();
    }

    conn.execute_batch(DIMENSION_ROWS).unwrap();

    // dyadic measure values keep floating point sums exact in any order
    for i in 0..48_i64 {
        conn.execute(
            "INSERT INTO fact_job (dim_date_id, dim_user_id, dim_cluster_id, cput, wallt, mem) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                i % 5 + 1,
                (i / 5) % 3 + 1,
                (i / 3) % 3 + 1,
                ((i * 7) % 13) as f64 + 0.5,
                ((i * 5) % 9) as f64 * 0.25 + 2.0,
                ((i * 3) % 17) as f64,
            ],
        )
        .unwrap();
    }

    conn.execute_batch(AGGREGATE_ROWS).unwrap();
    conn
}

fn bind_value(value: &BindValue) -> Value {
    match value {
        BindValue::Int(v) => Value::Integer(*v),
        BindValue::Text(v) => Value::Text(v.clone()),
    }
}

/// Execute a query and return its rows in a canonical order.
fn run(conn: &Connection, built: &BuiltQuery) -> Vec<Vec<Value>> {
    let values: Vec<(String, Value)> = built
        .params
        .iter()
        .map(|(k, v)| (k.clone(), bind_value(v)))
        .collect();
    let named: Vec<(&str, &dyn ToSql)> = values
        .iter()
        .map(|(k, v)| (k.as_str(), v as &dyn ToSql))
        .collect();

    let mut stmt = conn
        .prepare(&built.sql)
        .unwrap_or_else(|e| panic!("failed to prepare {}: {}", built.sql, e));
    let width = stmt.column_count();
    let mut rows = stmt.query(named.as_slice()).unwrap();

    let mut result = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        let values: Vec<Value> = (0..width).map(|i| row.get::<_, Value>(i).unwrap()).collect();
        result.push(values);
    }
    result.sort_by_key(|row| format!("{:?}", row));
    result
}

/// Assert that `sql` is rewritten and that both versions agree.
fn assert_equivalent(conn: &Connection, navigator: &AggregateNavigator<'_>, original: BuiltQuery) {
    let rewritten = BuiltQuery {
        sql: navigator.optimize(&original.sql),
        params: original.params.clone(),
    };
    assert_ne!(rewritten.sql, original.sql, "query was not rewritten");

    let expected = run(conn, &original);
    assert!(!expected.is_empty(), "no rows for {}", original.sql);
    assert_eq!(
        run(conn, &rewritten),
        expected,
        "\noriginal:  {}\nrewritten: {}",
        original.sql,
        rewritten.sql
    );
}

/// Assert that `original` is not rewritten and still runs.
fn assert_left_alone(conn: &Connection, navigator: &AggregateNavigator<'_>, original: BuiltQuery) {
    assert_eq!(navigator.optimize(&original.sql), original.sql);
    assert!(!run(conn, &original).is_empty(), "no rows for {}", original.sql);
}

fn column_names(conn: &Connection, sql: &str) -> Vec<String> {
    let stmt = conn.prepare(sql).unwrap();
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    names
}

fn plain(sql: &str) -> BuiltQuery {
    BuiltQuery {
        sql: sql.to_string(),
        params: BindParams::new(),
    }
}

fn jobs_and_cput() -> ReportQuery {
    ReportQuery::new("fact_job")
        .select("jobs", "COUNT(*)")
        .select("cput", "SUM(cput)")
}

#[test]
fn test_month_total() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    assert_equivalent(
        &conn,
        &navigator,
        plain("SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6"),
    );
}

#[test]
fn test_count_average_and_max() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    assert_equivalent(
        &conn,
        &navigator,
        plain(
            "SELECT year AS year, COUNT(*) AS jobs, AVG(cput) AS avg_cput, MAX(cput) AS peak, \
             SUM(wallt) AS wallt FROM fact_job JOIN dim_date USING (dim_date_id) \
             WHERE month BETWEEN 5 AND 7 GROUP BY year",
        ),
    );
}

#[test]
fn test_backtracked_site_grouping() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    for sql in [
        "SELECT site AS site, SUM(cput) AS cput FROM fact_job \
         JOIN dim_date USING (dim_date_id) JOIN dim_cluster USING (dim_cluster_id) \
         WHERE month = 6 GROUP BY site",
        "SELECT site AS site, SUM(cput) AS cput FROM fact_job \
         JOIN dim_cluster USING (dim_cluster_id) JOIN dim_date USING (dim_date_id) \
         WHERE month = 6 GROUP BY site",
    ] {
        assert_equivalent(&conn, &navigator, plain(sql));
    }
}

#[test]
fn test_pinned_day_grouping() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    assert_equivalent(
        &conn,
        &navigator,
        plain(
            "SELECT dim_date_id AS day, SUM(cput) AS cput FROM fact_job \
             JOIN dim_date USING (dim_date_id) WHERE month = 6 GROUP BY dim_date_id",
        ),
    );
}

#[test]
fn test_user_report() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let params = ReportParams::from_pairs([
        ("model", "user"),
        ("year", "2011"),
        ("month", "6"),
        ("sort", "jobs"),
        ("dir", "DESC"),
        ("limit", "100"),
    ])
    .unwrap();
    let query = jobs_and_cput().with_params(&params).unwrap();

    assert_equivalent(&conn, &navigator, query.render());
    assert_equivalent(&conn, &navigator, query.render_count());
}

#[test]
fn test_text_filter() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let params = ReportParams::from_pairs([
        ("model", "user"),
        ("year", "2011"),
        ("month", "6"),
        ("filter", "o"),
    ])
    .unwrap();
    let query = jobs_and_cput().with_params(&params).unwrap();
    assert_equivalent(&conn, &navigator, query.render());
}

#[test]
fn test_tag_and_cluster_report() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let params = ReportParams::from_pairs([
        ("model", "cluster"),
        ("year", "2011"),
        ("tag", "physics"),
    ])
    .unwrap();
    let query = jobs_and_cput().with_params(&params).unwrap();

    let built = query.build(&navigator);
    assert!(built.sql.contains("FROM agg_year "), "{}", built.sql);
    assert_equivalent(&conn, &navigator, query.render());
}

#[test]
fn test_unjoined_id_filter() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let params = ReportParams::from_pairs([("cluster_id", "1"), ("year", "2011")]).unwrap();
    let query = jobs_and_cput().with_params(&params).unwrap();
    assert_equivalent(&conn, &navigator, query.render());
}

#[test]
fn test_day_level_query_is_left_alone() {
    let catalog = common::warehouse_catalog();
    let navigator = AggregateNavigator::new(&catalog);

    let params =
        ReportParams::from_pairs([("start_date", "06/01/2011"), ("end_date", "06/15/2011")])
            .unwrap();
    let query = jobs_and_cput().with_params(&params).unwrap();
    assert_eq!(query.build(&navigator), query.render());
}

#[test]
fn test_sort_by_measure_alias() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let params = ReportParams::from_pairs([
        ("model", "user"),
        ("year", "2011"),
        ("sort", "cput"),
        ("dir", "DESC"),
    ])
    .unwrap();
    let query = jobs_and_cput().with_params(&params).unwrap();
    assert_equivalent(&conn, &navigator, query.render());
}

#[test]
fn test_measure_alias_used_as_raw_column() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let query = jobs_and_cput()
        .join_dimension("dim_date")
        .where_clause(WhereClause::comparison("cput", ">", 100_i64))
        .where_clause(WhereClause::comparison("year", "=", 2011_i64));
    assert_left_alone(&conn, &navigator, query.render());

    assert_left_alone(
        &conn,
        &navigator,
        plain(
            "SELECT SUM(cput * 2) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) \
             WHERE year = 2011",
        ),
    );
}

#[test]
fn test_quoted_labels_survive_rewrite() {
    let catalog = common::warehouse_catalog();
    let conn = warehouse(&catalog);
    let navigator = AggregateNavigator::new(&catalog);

    let query = ReportQuery::new("fact_job")
        .select_expr("COUNT(*)")
        .select_expr("SUM(cput)")
        .join_dimension("dim_date")
        .where_clause(WhereClause::comparison("year", "=", 2011_i64));

    let built = query.build(&navigator);
    assert!(built.sql.contains("FROM agg_year "), "{}", built.sql);
    assert_eq!(column_names(&conn, &built.sql), vec!["COUNT(*)", "SUM(cput)"]);
    assert_equivalent(&conn, &navigator, query.render());
}
