//! ubmod-dw CLI - inspect a warehouse catalog and optimize report SQL
//!
//! Usage:
//!   ubmod-dw [--catalog <file>] [--debug] optimize <sql | ->
//!   ubmod-dw [--catalog <file>] inspect
//!   ubmod-dw [--catalog <file>] report --model <model> [--param key=value ...] [--count]
//!
//! Examples:
//!   ubmod-dw optimize "SELECT SUM(cput) AS cput FROM fact_job JOIN dim_date USING (dim_date_id) WHERE month = 6"
//!   ubmod-dw report --model user --param year=2011 --param month=6 --param sort=jobs --param dir=DESC

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use ubmod_dw::catalog::{load_catalog, Catalog};
use ubmod_dw::config::Settings;
use ubmod_dw::navigator::{AggregateNavigator, NavigatorOptions, Optimization};
use ubmod_dw::query::{ReportParams, ReportQuery, JOB_ACTIVITY};
use ubmod_dw::telemetry;

#[derive(Parser)]
#[command(name = "ubmod-dw")]
#[command(about = "Rewrite star-schema report queries onto aggregate tables")]
#[command(version)]
struct Cli {
    /// Catalog definition file (overrides [warehouse] catalog)
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    /// Log every navigator decision
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a SQL query
    Optimize {
        /// The query, or "-" to read it from stdin
        sql: String,
    },

    /// List catalog tables, roll-ups and aggregate maps
    Inspect,

    /// Build a job activity report query
    Report {
        /// Report model: user, group, queue or cluster
        #[arg(short, long)]
        model: Option<String>,

        /// Report parameter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Build the row-count query instead
        #[arg(long)]
        count: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if cli.debug {
        settings.warehouse.debug = true;
        settings.logging.level = format!("{},{}", settings.logging.level, telemetry::debug_directive());
    }
    telemetry::init(&settings.logging);

    let catalog_path = match cli.catalog.clone().map(Ok).unwrap_or_else(|| settings.catalog_path()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let catalog = match load_catalog(&catalog_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = settings.navigator_options();
    match cli.command {
        Commands::Optimize { sql } => cmd_optimize(&catalog, options, sql),
        Commands::Inspect => cmd_inspect(&catalog),
        Commands::Report {
            model,
            params,
            count,
        } => cmd_report(&catalog, options, model, params, count),
    }
}

fn cmd_optimize(catalog: &Catalog, options: NavigatorOptions, sql: String) -> ExitCode {
    let sql = if sql == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Error reading stdin: {}", e);
            return ExitCode::FAILURE;
        }
        buf.trim().to_string()
    } else {
        sql
    };

    let navigator = AggregateNavigator::with_options(catalog, options);
    match navigator.navigate(&sql) {
        Ok(Optimization::Rewritten {
            sql: rewritten,
            aggregate,
            roll_ups,
        }) => {
            eprintln!("-- aggregate: {}", aggregate);
            for (dimension, roll_up) in &roll_ups {
                eprintln!("-- roll-up: {} -> {}", dimension, roll_up);
            }
            println!("{}", rewritten);
        }
        Ok(Optimization::Unchanged { reason }) => {
            eprintln!("-- unchanged: {}", reason);
            println!("{}", sql);
        }
        Err(e) => {
            eprintln!("-- unchanged: {}", e);
            println!("{}", sql);
        }
    }
    ExitCode::SUCCESS
}

fn cmd_inspect(catalog: &Catalog) -> ExitCode {
    println!("Dimensions:");
    for dimension in catalog.dimensions() {
        let roll_ups: Vec<&str> = catalog.roll_ups_of(dimension).map(|d| d.name()).collect();
        if roll_ups.is_empty() {
            println!("  - {} ({})", dimension.name(), dimension.columns().join(", "));
        } else {
            println!(
                "  - {} ({}) rolls up to: {}",
                dimension.name(),
                dimension.columns().join(", "),
                roll_ups.join(", ")
            );
        }
    }
    println!();

    println!("Facts:");
    for fact in catalog.facts() {
        println!("  - {} ({})", fact.name(), fact.columns().join(", "));
    }
    println!();

    if catalog.aggregates().is_empty() {
        println!("No aggregates defined.");
        return ExitCode::SUCCESS;
    }

    println!("Aggregates:");
    for aggregate in catalog.aggregates() {
        println!(
            "  - {} of {} ({})",
            aggregate.name(),
            aggregate.base_name(),
            aggregate.columns().join(", ")
        );
        for (expression, replacement) in aggregate.aggregates().iter() {
            println!("      {} -> {}", expression, replacement);
        }
    }

    ExitCode::SUCCESS
}

fn cmd_report(
    catalog: &Catalog,
    options: NavigatorOptions,
    model: Option<String>,
    params: Vec<String>,
    count: bool,
) -> ExitCode {
    let mut pairs = Vec::new();
    for param in &params {
        match param.split_once('=') {
            Some((key, value)) => pairs.push((key.trim(), value.trim())),
            None => {
                eprintln!("Invalid parameter '{}', expected key=value", param);
                return ExitCode::FAILURE;
            }
        }
    }
    if let Some(model) = &model {
        pairs.push(("model", model.as_str()));
    }

    let query = ReportParams::from_pairs(pairs).and_then(|report_params| {
        ReportQuery::new("fact_job")
            .select_all(JOB_ACTIVITY.iter().copied())
            .with_params(&report_params)
    });
    let query = match query {
        Ok(q) => q,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let navigator = AggregateNavigator::with_options(catalog, options);
    let built = if count {
        query.build_count(&navigator)
    } else {
        query.build(&navigator)
    };

    println!("{}", built.sql);
    match serde_json::to_string_pretty(&built.params) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error encoding parameters: {}", e);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
