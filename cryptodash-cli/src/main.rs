//! Cryptodash CLI — run the dashboard pipeline and inspect its output.
//!
//! Commands:
//! - `run` — fetch all four sources, write the table, chart and manifest
//! - `status` — summarize the last persisted table
//! - `config` — print the effective configuration as TOML

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cryptodash_runner::{read_table_csv, DashboardConfig, RunReport, SourceState, TableSummary};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cryptodash",
    about = "Cryptodash CLI — daily crypto liquidity and leverage dashboard"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all sources and rewrite the table, chart and manifest.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Processing date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        run_date: Option<String>,

        /// Override the table output path.
        #[arg(long)]
        table_path: Option<PathBuf>,

        /// Override the chart output path.
        #[arg(long)]
        chart_path: Option<PathBuf>,

        /// Override the manifest output path.
        #[arg(long)]
        manifest_path: Option<PathBuf>,

        /// Fetch the sources concurrently.
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Summarize the last persisted table.
    Status {
        /// Path to a TOML config file (for the table path).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Table to inspect. Takes precedence over the config.
        #[arg(long)]
        table_path: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            run_date,
            table_path,
            chart_path,
            manifest_path,
            parallel,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(path) = table_path {
                config.output.table_path = path;
            }
            if let Some(path) = chart_path {
                config.output.chart_path = path;
            }
            if let Some(path) = manifest_path {
                config.output.manifest_path = path;
            }
            config.http.parallel |= parallel;
            run_dashboard(&config, run_date.as_deref())
        }
        Commands::Status { config, table_path } => {
            let table_path = match table_path {
                Some(path) => path,
                None => load_config(config.as_deref())?.output.table_path,
            };
            run_status(&table_path)
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(DashboardConfig::default()),
    }
}

fn run_dashboard(config: &DashboardConfig, run_date: Option<&str>) -> Result<()> {
    let run_date = run_date
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--run-date must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    info!(%run_date, days = config.window.days, "starting dashboard run");
    let report = cryptodash_runner::run(config, run_date)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    let manifest = &report.manifest;
    println!("Run date: {}  (window from {})", manifest.run_date, manifest.window_start);
    println!();
    println!("{:<24} {:<16} {:<8} {:>8} {:>8}", "Metric", "Provider", "State", "Points", "Rows");
    println!("{}", "-".repeat(68));
    for entry in &manifest.sources {
        let state = match entry.state {
            SourceState::Ok => "ok",
            SourceState::Failed => "FAILED",
        };
        println!(
            "{:<24} {:<16} {:<8} {:>8} {:>8}",
            entry.metric.column_name(),
            entry.provider,
            state,
            entry.points,
            entry.non_null_rows
        );
        if let Some(error) = &entry.error {
            println!("    {error}");
        }
    }
    println!();
    println!("Table: {} ({} rows)", report.table_path.display(), manifest.rows);
    match &report.chart_path {
        Some(path) => println!("Chart: {}", path.display()),
        None => println!("Chart: skipped (no data)"),
    }
    println!("Manifest: {}", report.manifest_path.display());
}

fn run_status(table_path: &Path) -> Result<()> {
    if !table_path.exists() {
        println!("No table yet: {}", table_path.display());
        return Ok(());
    }

    let table = read_table_csv(table_path)?;
    let summary = TableSummary::from_table(&table);

    println!("Table: {}", table_path.display());
    println!("Rows: {}", summary.rows);
    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => println!("Date range: {first} to {last}"),
        _ => println!("Date range: (empty)"),
    }
    println!();
    println!("{:<24} {:>10}", "Column", "Non-null");
    println!("{}", "-".repeat(35));
    for (metric, count) in summary.non_null {
        println!("{:<24} {:>10}", metric.column_name(), count);
    }
    Ok(())
}
