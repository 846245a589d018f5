//! Aligned table persistence (CSV).
//!
//! The file is a full snapshot: each run truncates and rewrites it. Header is
//! `date` followed by the four metric columns in canonical order; null cells
//! are empty.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use cryptodash_core::{AlignedRow, AlignedTable, Metric, MetricRecord};
use std::path::Path;

pub const DATE_COLUMN: &str = "date";

/// Write the table, creating the parent directory if needed.
pub fn write_table_csv(path: &Path, table: &AlignedTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create table directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create table CSV {}", path.display()))?;

    let mut header = vec![DATE_COLUMN];
    header.extend(Metric::ALL.iter().map(|m| m.column_name()));
    writer.write_record(&header)?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(5);
        record.push(row.date.format("%Y-%m-%d").to_string());
        record.extend(row.record.values().iter().map(|v| format_cell(*v)));
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush table CSV {}", path.display()))?;
    Ok(())
}

/// Read a table previously written by [`write_table_csv`].
pub fn read_table_csv(path: &Path) -> Result<AlignedTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open table CSV {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let expected: Vec<&str> = std::iter::once(DATE_COLUMN)
        .chain(Metric::ALL.iter().map(|m| m.column_name()))
        .collect();
    if headers.iter().collect::<Vec<_>>() != expected {
        bail!(
            "unexpected header in {}: {:?}",
            path.display(),
            headers.iter().collect::<Vec<_>>()
        );
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", line + 2))?;
        let date = NaiveDate::parse_from_str(&record[0], "%Y-%m-%d")
            .with_context(|| format!("Bad date on row {}: {:?}", line + 2, &record[0]))?;

        let mut values = MetricRecord::default();
        for metric in Metric::ALL {
            let cell = record.get(metric.index() + 1).unwrap_or("");
            let value = if cell.is_empty() {
                None
            } else {
                Some(cell.parse::<f64>().with_context(|| {
                    format!("Bad {} value on row {}: {cell:?}", metric, line + 2)
                })?)
            };
            values.set(metric, value);
        }
        rows.push(AlignedRow {
            date,
            record: values,
        });
    }

    Ok(AlignedTable::from_rows(rows))
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Row count, span and per-column coverage of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub non_null: [(Metric, usize); 4],
}

impl TableSummary {
    pub fn from_table(table: &AlignedTable) -> Self {
        Self {
            rows: table.len(),
            first_date: table.first_date(),
            last_date: table.last_date(),
            non_null: Metric::ALL.map(|m| (m, table.non_null_count(m))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_plain_decimals_or_empty() {
        assert_eq!(format_cell(Some(1234.5)), "1234.5");
        assert_eq!(format_cell(Some(1.5e11)), "150000000000");
        assert_eq!(format_cell(None), "");
    }

    #[test]
    fn summary_counts_coverage() {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let mut a = MetricRecord::default();
        a.set(Metric::BtcRealizedCap, Some(1.0));
        let table = AlignedTable::from_rows(vec![
            AlignedRow { date: d("2024-01-03"), record: a },
            AlignedRow { date: d("2024-01-02"), record: MetricRecord::default() },
        ]);
        let summary = TableSummary::from_table(&table);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.first_date, Some(d("2024-01-02")));
        assert_eq!(summary.non_null[Metric::BtcRealizedCap.index()], (Metric::BtcRealizedCap, 1));
        assert_eq!(summary.non_null[Metric::BinanceBtcOi.index()], (Metric::BinanceBtcOi, 0));
    }
}
