//! Run manifest (JSON): what each source returned and what was written.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cryptodash_core::{AlignedTable, Metric, SourceOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Current schema version for the manifest file.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub metric: Metric,
    pub provider: String,
    pub state: SourceState,
    /// Dates returned by the provider before windowing.
    pub points: usize,
    /// Non-null cells in the persisted column, after forward-fill.
    pub non_null_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_date: NaiveDate,
    pub window_start: NaiveDate,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub sources: Vec<SourceEntry>,
    pub chart_written: bool,
    /// BLAKE3 over the table contents; equal hashes mean identical snapshots.
    pub table_hash: String,
}

impl RunManifest {
    pub fn build(
        run_date: NaiveDate,
        window_start: NaiveDate,
        outcomes: &[(String, SourceOutcome)],
        table: &AlignedTable,
        chart_written: bool,
    ) -> Self {
        let sources = outcomes
            .iter()
            .map(|(provider, outcome)| {
                let metric = outcome.metric();
                let (state, points, error) = match outcome {
                    SourceOutcome::Success(series) => (SourceState::Ok, series.len(), None),
                    SourceOutcome::Failure { error, .. } => {
                        (SourceState::Failed, 0, Some(error.to_string()))
                    }
                };
                SourceEntry {
                    metric,
                    provider: provider.clone(),
                    state,
                    points,
                    non_null_rows: table.non_null_count(metric),
                    error,
                }
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            run_date,
            window_start,
            rows: table.len(),
            first_date: table.first_date(),
            last_date: table.last_date(),
            sources,
            chart_written,
            table_hash: table_hash(table),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create manifest directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create manifest {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .context("Failed to serialize run manifest")?;
        writer.flush()?;
        Ok(())
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|s| s.state == SourceState::Failed)
    }
}

/// Deterministic BLAKE3 hash over dates and values in canonical column order.
pub fn table_hash(table: &AlignedTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for metric in Metric::ALL {
        hasher.update(metric.column_name().as_bytes());
    }
    for row in table.rows() {
        hasher.update(row.date.to_string().as_bytes());
        for value in row.record.values() {
            match value {
                Some(v) => {
                    hasher.update(&[1]);
                    hasher.update(&v.to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}
