//! attrition-explorer CLI

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value as JsonValue;

use attrition_explorer::config::DashboardConfig;
use attrition_explorer::dashboard::Dashboard;
use attrition_explorer::data::cache::TableCache;
use attrition_explorer::data::filter::{Bounds, EmptySelection};
use attrition_explorer::data::{ColumnType, LoadOptions, Table};

#[derive(Parser)]
#[command(name = "attrition-explorer")]
#[command(about = "Filter and summarise an employee attrition dataset")]
#[command(version)]
struct Cli {
    /// Log verbosity level (off, error, warn, info, debug, trace). Defaults to RUST_LOG or warn.
    #[arg(long, global = true)]
    log_level: Option<log::LevelFilter>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List columns with their detected type and number of distinct values
    Schema {
        /// Employee dataset (.csv, .json, .parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Keep EmployeeCount, EmployeeNumber and StandardHours
        #[arg(long)]
        keep_id_columns: bool,
    },

    /// Filter the dataset and compute every dashboard panel
    Dashboard {
        /// Employee dataset (.csv, .json, .parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// JSON config with filters, ranges and options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Categorical filter `COLUMN=V1,V2`. An empty list (`COLUMN=`) selects nothing.
        #[arg(long = "filter", value_name = "COLUMN=VALUES")]
        filters: Vec<String>,

        /// Inclusive numeric range `COLUMN=LO:HI`
        #[arg(long = "range", value_name = "COLUMN=LO:HI")]
        ranges: Vec<String>,

        /// Meaning of an empty selection: show-none or show-all
        #[arg(long)]
        empty_selection: Option<EmptySelection>,

        /// Keep EmployeeCount, EmployeeNumber and StandardHours
        #[arg(long)]
        keep_id_columns: bool,

        /// Rows in the filtered preview
        #[arg(long)]
        preview_rows: Option<usize>,

        /// Output file for the dashboard (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = cli.log_level {
        logger.filter_level(level);
    }
    logger.init();

    let cache = TableCache::new();

    match cli.command {
        Commands::Schema {
            input,
            keep_id_columns,
        } => {
            let options = LoadOptions {
                drop_identifier_columns: !keep_id_columns,
            };
            let table = cache
                .get_or_load(&input, &options)
                .with_context(|| format!("loading {}", input.display()))?;
            write_json(&schema_report(&table)?, None)
        }
        Commands::Dashboard {
            input,
            config,
            filters,
            ranges,
            empty_selection,
            keep_id_columns,
            preview_rows,
            output,
        } => {
            let mut cfg = match &config {
                Some(path) => DashboardConfig::from_file(path)?,
                None => DashboardConfig::default(),
            };
            if keep_id_columns {
                cfg.drop_identifier_columns = false;
            }
            if let Some(policy) = empty_selection {
                cfg.empty_selection = policy;
            }
            if let Some(n) = preview_rows {
                cfg.preview_rows = n;
            }
            for arg in &filters {
                let (column, values) = parse_filter(arg)?;
                cfg.filters.insert(column, values);
            }
            for arg in &ranges {
                let (column, bounds) = parse_range(arg)?;
                cfg.ranges.insert(column, bounds);
            }

            let table = cache
                .get_or_load(&input, &cfg.load_options())
                .with_context(|| format!("loading {}", input.display()))?;
            let filter_set = cfg.filter_set(&table)?;
            let dashboard = Dashboard::build(&table, &filter_set, cfg.empty_selection, cfg.preview_rows)?;
            write_json(&dashboard, output.as_deref())
        }
    }
}

#[derive(Serialize)]
struct ColumnInfo<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    ty: ColumnType,
    distinct: usize,
}

#[derive(Serialize)]
struct SchemaReport<'a> {
    rows: usize,
    columns: Vec<ColumnInfo<'a>>,
}

fn schema_report(table: &Table) -> Result<SchemaReport<'_>> {
    let mut columns = Vec::with_capacity(table.columns().len());
    for c in table.columns() {
        columns.push(ColumnInfo {
            name: &c.name,
            ty: c.ty,
            distinct: table.unique_values(&c.name)?.len(),
        });
    }
    Ok(SchemaReport {
        rows: table.len(),
        columns,
    })
}

/// `Department=Sales,Human Resources` → ("Department", ["Sales", "Human Resources"]).
fn parse_filter(arg: &str) -> Result<(String, Vec<JsonValue>)> {
    let Some((column, values)) = arg.split_once('=') else {
        bail!("--filter expects COLUMN=V1,V2, got '{arg}'");
    };
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| JsonValue::String(v.to_string()))
        .collect();
    Ok((column.trim().to_string(), values))
}

/// `Age=25:45` → ("Age", 25..=45).
fn parse_range(arg: &str) -> Result<(String, Bounds)> {
    let parsed = arg.split_once('=').and_then(|(column, bounds)| {
        let (lo, hi) = bounds.split_once(':')?;
        Some((column, lo.trim().parse::<f64>().ok()?, hi.trim().parse::<f64>().ok()?))
    });
    match parsed {
        Some((column, min, max)) => Ok((column.trim().to_string(), Bounds { min, max })),
        None => bail!("--range expects COLUMN=LO:HI with numeric bounds, got '{arg}'"),
    }
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, text + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{text}")?;
        }
    }
    Ok(())
}
