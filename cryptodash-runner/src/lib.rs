//! Cryptodash Runner — run orchestration, configuration and artifacts.
//!
//! This crate builds on `cryptodash-core` to provide:
//! - TOML configuration with per-source endpoint overrides
//! - The single-pass pipeline (fetch, align, persist, chart)
//! - CSV table persistence and read-back
//! - The static HTML chart
//! - A JSON run manifest with per-source status and a table hash

pub mod config;
pub mod pipeline;
pub mod reporting;

pub use config::{ConfigError, DashboardConfig, HttpConfig, OutputConfig, SourcesConfig, WindowConfig};
pub use pipeline::{fetch_all, run, run_with_client, RunReport};
pub use reporting::{
    read_table_csv, write_table_csv, ChartRenderer, RunManifest, SourceEntry, SourceState,
    TableSummary,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<DashboardConfig>();
        assert_sync::<DashboardConfig>();
    }

    #[test]
    fn run_artifacts_are_send_sync() {
        assert_send::<RunManifest>();
        assert_sync::<RunManifest>();
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }
}
