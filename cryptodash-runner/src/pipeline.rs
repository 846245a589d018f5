//! Single-pass dashboard pipeline.
//!
//! fetch (4 sources) → normalize → align → persist table → chart → manifest.
//!
//! Source failures never stop the run: each becomes an empty column and a
//! manifest entry. Only I/O errors on the output files are returned.

use crate::config::DashboardConfig;
use crate::reporting::{write_table_csv, ChartRenderer, RunManifest};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use cryptodash_core::data::align::window_start;
use cryptodash_core::{align, AlignedTable, HttpClient, HttpFetch, SeriesSource, SourceOutcome};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub manifest: RunManifest,
    pub table: AlignedTable,
    pub table_path: PathBuf,
    pub chart_path: Option<PathBuf>,
    pub manifest_path: PathBuf,
}

/// Call every source once, in order. With `parallel`, calls run on the rayon
/// pool; the output order still matches `sources`.
pub fn fetch_all(
    sources: &[Box<dyn SeriesSource>],
    client: &dyn HttpFetch,
    parallel: bool,
) -> Vec<(String, SourceOutcome)> {
    let fetch_one = |source: &Box<dyn SeriesSource>| {
        info!(metric = %source.metric(), provider = source.name(), "fetching");
        (source.name().to_string(), source.fetch(client))
    };

    if parallel {
        sources.par_iter().map(fetch_one).collect()
    } else {
        sources.iter().map(fetch_one).collect()
    }
}

/// Run the pipeline with a live HTTP client built from the config.
pub fn run(config: &DashboardConfig, run_date: NaiveDate) -> Result<RunReport> {
    let client = HttpClient::new(config.http.timeout(), &config.http.user_agent)
        .context("Failed to build HTTP client")?;
    run_with_client(config, &client, run_date)
}

/// Run the pipeline against any transport.
pub fn run_with_client(
    config: &DashboardConfig,
    client: &dyn HttpFetch,
    run_date: NaiveDate,
) -> Result<RunReport> {
    let sources = config.sources.adapters();
    let outcomes = fetch_all(&sources, client, config.http.parallel);

    let failed = outcomes.iter().filter(|(_, o)| !o.is_success()).count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "some sources produced no data this run");
    }

    let series = outcomes
        .iter()
        .map(|(_, outcome)| outcome.clone().into_series())
        .collect();
    let table = align(series, run_date, config.window.days);
    info!(rows = table.len(), vacuous = table.is_vacuous(), "aligned table built");

    let table_path = config.output.table_path.clone();
    write_table_csv(&table_path, &table)?;
    info!(path = %table_path.display(), "table written");

    let renderer = ChartRenderer::new(config.sources.etf.mode);
    let chart_written = renderer.write(&table, &config.output.chart_path)?;

    let manifest = RunManifest::build(
        run_date,
        window_start(run_date, config.window.days),
        &outcomes,
        &table,
        chart_written,
    );
    let manifest_path = config.output.manifest_path.clone();
    manifest.write(&manifest_path)?;

    Ok(RunReport {
        manifest,
        table,
        table_path,
        chart_path: chart_written.then(|| config.output.chart_path.clone()),
        manifest_path,
    })
}
