//! Run artifacts: persisted table, chart and manifest.

pub mod chart;
pub mod manifest;
pub mod table;

pub use chart::ChartRenderer;
pub use manifest::{RunManifest, SourceEntry, SourceState};
pub use table::{read_table_csv, write_table_csv, TableSummary};
