//! Tests for aggregate selection and roll-up backtracking.

#[path = "../common/mod.rs"]
mod common;

use ubmod_dw::catalog::Catalog;
use ubmod_dw::navigator::{extract_usage, AggregateSelector, Selection, SelectionOutcome};

fn select<'c>(catalog: &'c Catalog, sql: &str) -> SelectionOutcome<'c> {
    let usage = extract_usage(catalog, sql).unwrap();
    AggregateSelector::new(catalog, true).select(sql, &usage).unwrap()
}

fn selected<'c>(catalog: &'c Catalog, sql: &str) -> Selection<'c> {
    match select(catalog, sql) {
        SelectionOutcome::Selected(selection) => selection,
        other => panic!("expected a selection for {sql}, got {:?}", other),
    }
}

fn roll_up_names(selection: &Selection<'_>) -> Vec<(String, String)> {
    selection
        .roll_ups
        .iter()
        .map(|r| (r.original.name().to_string(), r.roll_up.name().to_string()))
        .collect()
}

#[test]
fn test_month_query_uses_month_aggregate() {
    let catalog = common::scenario_catalog();
    let selection = selected(
        &catalog,
        "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6",
    );
    assert_eq!(selection.fact.name(), "fact_job");
    assert_eq!(selection.aggregate.name(), "agg_month");
    assert_eq!(
        roll_up_names(&selection),
        vec![("dim_date".to_string(), "dim_month".to_string())]
    );
}

#[test]
fn test_column_missing_from_every_roll_up() {
    let catalog = common::scenario_catalog();
    let outcome = select(
        &catalog,
        "SELECT date, SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) GROUP BY date",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);
}

#[test]
fn test_dimension_without_aggregate() {
    let catalog = common::scenario_catalog();
    let outcome = select(
        &catalog,
        "SELECT name, SUM(cput) AS cput FROM fact_job JOIN dim_user USING (dim_user_id) GROUP BY name",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);
}

#[test]
fn test_smallest_roll_up_is_tried_first() {
    let catalog = common::warehouse_catalog();
    let selection = selected(
        &catalog,
        "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) WHERE year = 2011",
    );
    assert_eq!(selection.aggregate.name(), "agg_year");
    assert_eq!(
        roll_up_names(&selection),
        vec![("dim_date".to_string(), "dim_year".to_string())]
    );
}

#[test]
fn test_last_roll_up_is_undone_first() {
    let catalog = common::warehouse_catalog();
    // dim_month + dim_site matches nothing; dropping the site roll-up does
    let selection = selected(
        &catalog,
        "SELECT site AS site, SUM(cput) AS cput FROM fact_job \
         JOIN dim_date USING (dim_date_id) JOIN dim_cluster USING (dim_cluster_id) \
         WHERE month = 6 GROUP BY site",
    );
    assert_eq!(selection.aggregate.name(), "agg_month_cluster");
    assert_eq!(
        roll_up_names(&selection),
        vec![("dim_date".to_string(), "dim_month".to_string())]
    );
}

#[test]
fn test_join_order_decides_backtracking() {
    let catalog = common::warehouse_catalog();
    // same query with the joins swapped: the month roll-up is undone first
    let selection = selected(
        &catalog,
        "SELECT site AS site, SUM(cput) AS cput FROM fact_job \
         JOIN dim_cluster USING (dim_cluster_id) JOIN dim_date USING (dim_date_id) \
         WHERE month = 6 GROUP BY site",
    );
    assert_eq!(selection.aggregate.name(), "agg_date_site");
    assert_eq!(
        roll_up_names(&selection),
        vec![("dim_cluster".to_string(), "dim_site".to_string())]
    );
}

#[test]
fn test_aggregates_tried_in_registration_order() {
    let catalog = Catalog::from_json_str(
        r#"{
          "dimensions": [
            { "name": "dim_date",  "attributes": ["date", "month", "year"] },
            { "name": "dim_month", "attributes": ["month", "year"], "base": "dim_date" }
          ],
          "facts": [{ "name": "fact_job", "dimensions": ["dim_date"], "facts": ["cput"] }],
          "aggregates": [
            { "name": "agg_month", "base": "fact_job", "dimensions": ["dim_month"],
              "facts": [{ "base": "cput", "type": "sum" }] },
            { "name": "agg_day", "base": "fact_job", "dimensions": ["dim_date"],
              "facts": [{ "base": "cput", "type": "sum" }] }
          ]
        }"#,
    )
    .unwrap();

    let monthly = selected(
        &catalog,
        "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6",
    );
    assert_eq!(monthly.aggregate.name(), "agg_month");

    let daily = selected(
        &catalog,
        "SELECT date, SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) GROUP BY date",
    );
    assert_eq!(daily.aggregate.name(), "agg_day");
    assert!(daily.roll_ups.is_empty());
}

#[test]
fn test_pinned_dimension_is_not_rolled_up() {
    let catalog = common::warehouse_catalog();
    let selection = selected(
        &catalog,
        "SELECT dim_date_id AS day, SUM(cput) AS cput FROM fact_job \
         JOIN dim_date USING (dim_date_id) WHERE month = 6 GROUP BY dim_date_id",
    );
    assert_eq!(selection.aggregate.name(), "agg_date_site");
    assert!(selection.roll_ups.is_empty());
}

#[test]
fn test_loose_foreign_key_must_be_carried() {
    let catalog = common::warehouse_catalog();
    let outcome = select(
        &catalog,
        "SELECT dim_date_id AS day, SUM(cput) AS cput FROM fact_job \
         JOIN dim_date USING (dim_date_id) WHERE month = 6 AND dim_user_id = 7 GROUP BY dim_date_id",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);

    let selection = selected(
        &catalog,
        "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) \
         WHERE month = 6 AND dim_user_id = 7",
    );
    assert_eq!(selection.aggregate.name(), "agg_month_cluster");
}

#[test]
fn test_measure_not_stored_in_aggregate() {
    let catalog = common::warehouse_catalog();
    let outcome = select(
        &catalog,
        "SELECT SUM(mem) AS mem FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);
}

#[test]
fn test_aggregation_not_stored_in_aggregate() {
    let catalog = common::warehouse_catalog();
    let outcome = select(
        &catalog,
        "SELECT MIN(cput) AS low FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);

    let selection = selected(
        &catalog,
        "SELECT MAX(cput) AS peak FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6",
    );
    assert_eq!(selection.aggregate.name(), "agg_month_cluster");
}

#[test]
fn test_measure_named_like_its_alias() {
    let catalog = common::warehouse_catalog();
    // `wallt` is declared as an alias and then used outside any mapped expression
    let outcome = select(
        &catalog,
        "SELECT SUM(cput) AS wallt FROM fact_job JOIN dim_date USING (dim_date_id) \
         WHERE month = 6 ORDER BY wallt",
    );
    assert!(matches!(outcome, SelectionOutcome::Selected(_)));

    let outcome = select(
        &catalog,
        "SELECT SUM(cput) AS wallt, MAX(wallt) AS peak FROM fact_job \
         JOIN dim_date USING (dim_date_id) WHERE month = 6",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);
}

#[test]
fn test_measure_alias_compared_in_where_clause() {
    let catalog = common::warehouse_catalog();
    let outcome = select(
        &catalog,
        "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) \
         WHERE cput > :cput AND year = :year",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);
}

#[test]
fn test_measure_alias_over_unmapped_expression() {
    let catalog = common::warehouse_catalog();
    let outcome = select(
        &catalog,
        "SELECT SUM(cput * 2) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) \
         WHERE year = 2011",
    );
    assert_eq!(outcome, SelectionOutcome::NoAggregate);
}

#[test]
fn test_measure_alias_in_order_by_items() {
    let catalog = common::warehouse_catalog();
    let selection = selected(
        &catalog,
        "SELECT year AS year, SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) \
         WHERE year = 2011 GROUP BY year ORDER BY `cput` DESC, year LIMIT 5",
    );
    assert_eq!(selection.aggregate.name(), "agg_year");
}

#[test]
fn test_measure_name_inside_literal() {
    let catalog = common::warehouse_catalog();
    let selection = selected(
        &catalog,
        "SELECT SUM(cput) AS 'cput total' FROM fact_job JOIN dim_date USING (dim_date_id) \
         WHERE month = 6",
    );
    assert_eq!(selection.aggregate.name(), "agg_month_cluster");
}

#[test]
fn test_fact_detection() {
    let catalog = common::warehouse_catalog();

    assert_eq!(
        select(&catalog, "SELECT month FROM dim_date"),
        SelectionOutcome::NoFact
    );
    assert_eq!(
        select(&catalog, "SELECT SUM(cput_sum) FROM agg_month_cluster"),
        SelectionOutcome::NoFact
    );
    assert_eq!(
        select(
            &catalog,
            "SELECT SUM(cput) FROM fact_job JOIN dim_date USING (dim_date_id) \
             JOIN fact_storage USING (dim_date_id)"
        ),
        SelectionOutcome::MultipleFacts(vec!["fact_job".into(), "fact_storage".into()])
    );
}
