//! End-to-end pipeline runs against canned provider responses.

use chrono::NaiveDate;
use cryptodash_core::data::sources::{etf, open_interest, realized_cap, stablecoin};
use cryptodash_core::data::EtfMode;
use cryptodash_core::{CannedFetch, Metric};
use cryptodash_runner::{read_table_csv, run_with_client, DashboardConfig, SourceState};
use serde_json::json;
use std::path::Path;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn config_in(dir: &Path) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.output.table_path = dir.join("data/crypto_data.csv");
    config.output.chart_path = dir.join("docs/index.html");
    config.output.manifest_path = dir.join("data/run_manifest.json");
    config
}

fn chart_url() -> String {
    format!("{}/IBIT", etf::DEFAULT_CHART_URL)
}

/// Stablecoins on Jan 2-4 (plus one point far outside the window),
/// ETF bars on Jan 2-3, realized cap on Jan 2 and Jan 4, Binance geo-blocked.
fn mostly_healthy_fetch() -> CannedFetch {
    CannedFetch::new()
        .with_json(
            stablecoin::DEFAULT_URL,
            &json!([
                {"date": "1669852800", "totalCirculating": {"peggedUSD": 1.10e11}},
                {"date": "1704153600", "totalCirculating": {"peggedUSD": 1.30e11}},
                {"date": "1704240000", "totalCirculating": {"peggedUSD": 1.31e11}},
                {"date": "1704326400", "totalCirculating": {"peggedUSD": 1.32e11}}
            ]),
        )
        .with_json(
            &chart_url(),
            &json!({
                "chart": {
                    "result": [{
                        "meta": {"gmtoffset": -18000},
                        "timestamp": [1704205800, 1704292200],
                        "indicators": {"quote": [{
                            "close": [50.0, 51.0],
                            "volume": [1000.0, 2000.0]
                        }]}
                    }],
                    "error": null
                }
            }),
        )
        .with_json(
            realized_cap::DEFAULT_URL,
            &json!({"data": [
                {"asset": "btc", "time": "2024-01-02T00:00:00.000000000Z", "CapRealizedUSD": "440000000000"},
                {"asset": "btc", "time": "2024-01-04T00:00:00.000000000Z", "CapRealizedUSD": "442000000000"}
            ]}),
        )
        .with_json(
            open_interest::DEFAULT_URL,
            &json!({"code": 0, "msg": "Service unavailable from a restricted location"}),
        )
}

#[test]
fn all_sources_failing_still_writes_an_empty_snapshot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let report = run_with_client(&config, &CannedFetch::new(), d(2024, 1, 10)).unwrap();

    assert!(report.table.is_empty());
    assert!(report.chart_path.is_none());
    assert!(!config.output.chart_path.exists());

    let csv = std::fs::read_to_string(&config.output.table_path).unwrap();
    assert_eq!(
        csv.trim_end(),
        "date,Stablecoin_Market_Cap,ETF_Volume_Proxy,BTC_Realized_Cap,Binance_BTC_OI"
    );

    assert_eq!(report.manifest.failed_sources().count(), 4);
    assert!(!report.manifest.chart_written);
    assert!(config.output.manifest_path.exists());
}

#[test]
fn blocked_source_leaves_a_null_column_and_others_are_aligned() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let report = run_with_client(&config, &mostly_healthy_fetch(), d(2024, 1, 10)).unwrap();
    let table = &report.table;

    // The 2022 stablecoin point falls outside the trailing window.
    let dates: Vec<NaiveDate> = table.dates().collect();
    assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);

    assert!(table.column_is_null(Metric::BinanceBtcOi));
    let etf: Vec<Option<f64>> = table.column(Metric::EtfVolumeProxy).collect();
    assert_eq!(etf, vec![Some(50_000.0), Some(102_000.0), Some(102_000.0)]);
    let realized: Vec<Option<f64>> = table.column(Metric::BtcRealizedCap).collect();
    assert_eq!(realized, vec![Some(4.4e11), Some(4.4e11), Some(4.42e11)]);

    assert_eq!(report.chart_path.as_deref(), Some(config.output.chart_path.as_path()));
    let html = std::fs::read_to_string(&config.output.chart_path).unwrap();
    assert!(html.contains("<svg"));

    let failed: Vec<_> = report.manifest.failed_sources().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].metric, Metric::BinanceBtcOi);
    assert_eq!(failed[0].provider, "binance");
    assert!(failed[0].error.as_deref().unwrap().contains("restricted location"));

    let stable = &report.manifest.sources[Metric::StablecoinMarketCap.index()];
    assert_eq!(stable.state, SourceState::Ok);
    assert_eq!(stable.points, 4);
    assert_eq!(stable.non_null_rows, 3);
}

#[test]
fn persisted_table_reads_back_identically() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let report = run_with_client(&config, &mostly_healthy_fetch(), d(2024, 1, 10)).unwrap();
    let reloaded = read_table_csv(&config.output.table_path).unwrap();

    assert_eq!(reloaded, report.table);
}

#[test]
fn rerun_overwrites_the_snapshot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let first = run_with_client(&config, &mostly_healthy_fetch(), d(2024, 1, 10)).unwrap();
    assert_eq!(first.table.len(), 3);

    let second = run_with_client(&config, &CannedFetch::new(), d(2024, 1, 10)).unwrap();
    assert!(second.table.is_empty());
    assert!(read_table_csv(&config.output.table_path).unwrap().is_empty());
    assert_ne!(first.manifest.table_hash, second.manifest.table_hash);
}

#[test]
fn net_flow_table_fills_the_etf_column() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = config_in(temp_dir.path());
    config.sources.etf.mode = EtfMode::NetFlow;
    config.sources.etf.flow_url = Some("https://flows.test/btc-etf".to_string());
    config.validate().unwrap();

    let table_text = "Date,IBIT,FBTC,Total\n\
                      02 Jan 2024,\"$1,234.50\",0.0,\"$1,234.50\"\n\
                      03 Jan 2024,-,-,(200.0)\n\
                      Total,,,1034.5\n";
    let client = CannedFetch::new().with_body("https://flows.test/btc-etf", table_text);

    let report = run_with_client(&config, &client, d(2024, 1, 10)).unwrap();

    let flows: Vec<Option<f64>> = report.table.column(Metric::EtfVolumeProxy).collect();
    assert_eq!(flows, vec![Some(1234.5), Some(-200.0)]);
    assert_eq!(
        report.manifest.sources[Metric::EtfVolumeProxy.index()].provider,
        "etf_flow_table"
    );
    assert!(report.manifest.chart_written);
}

#[test]
fn parallel_fetch_matches_sequential() {
    let temp_dir = tempfile::tempdir().unwrap();
    let sequential = config_in(&temp_dir.path().join("seq"));
    let mut parallel = config_in(&temp_dir.path().join("par"));
    parallel.http.parallel = true;

    let a = run_with_client(&sequential, &mostly_healthy_fetch(), d(2024, 1, 10)).unwrap();
    let b = run_with_client(&parallel, &mostly_healthy_fetch(), d(2024, 1, 10)).unwrap();

    assert_eq!(a.table, b.table);
    assert_eq!(a.manifest.table_hash, b.manifest.table_hash);
}
