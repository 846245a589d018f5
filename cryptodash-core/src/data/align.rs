//! Multi-series time alignment and repair.
//!
//! Outer-joins the per-metric series on calendar date, restricts the result to
//! a trailing window, and forward-fills each column independently. Unlike
//! tradable price bars, these are slow-moving level metrics, so carrying the
//! last observation across a provider outage is the intended behaviour.

use super::metric::Metric;
use super::normalize::Normalize;
use super::series::NamedSeries;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum AlignError {
    #[error("join failure: metric {0} supplied by more than one series")]
    JoinFailure(Metric),
}

/// One row's values: exactly one optional field per metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricRecord {
    pub stablecoin_market_cap: Option<f64>,
    pub etf_volume_proxy: Option<f64>,
    pub btc_realized_cap: Option<f64>,
    pub binance_btc_oi: Option<f64>,
}

impl MetricRecord {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::StablecoinMarketCap => self.stablecoin_market_cap,
            Metric::EtfVolumeProxy => self.etf_volume_proxy,
            Metric::BtcRealizedCap => self.btc_realized_cap,
            Metric::BinanceBtcOi => self.binance_btc_oi,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::StablecoinMarketCap => &mut self.stablecoin_market_cap,
            Metric::EtfVolumeProxy => &mut self.etf_volume_proxy,
            Metric::BtcRealizedCap => &mut self.btc_realized_cap,
            Metric::BinanceBtcOi => &mut self.binance_btc_oi,
        };
        *slot = value;
    }

    /// Values in canonical column order.
    pub fn values(&self) -> [Option<f64>; 4] {
        Metric::ALL.map(|m| self.get(m))
    }

    pub fn is_all_null(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub record: MetricRecord,
}

/// The joined, windowed, gap-filled table.
///
/// Rows are strictly ascending by date. All four columns always exist, since
/// a row is a [`MetricRecord`]; an absent source is simply an all-null column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedTable {
    rows: Vec<AlignedRow>,
}

impl AlignedTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from rows in any order. Duplicate dates keep the last row.
    pub fn from_rows(rows: impl IntoIterator<Item = AlignedRow>) -> Self {
        let by_date: BTreeMap<NaiveDate, MetricRecord> =
            rows.into_iter().map(|r| (r.date, r.record)).collect();
        Self {
            rows: by_date
                .into_iter()
                .map(|(date, record)| AlignedRow { date, record })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    /// One column's values, row by row.
    pub fn column(&self, metric: Metric) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |r| r.record.get(metric))
    }

    pub fn non_null_count(&self, metric: Metric) -> usize {
        self.column(metric).filter(Option::is_some).count()
    }

    pub fn column_is_null(&self, metric: Metric) -> bool {
        self.non_null_count(metric) == 0
    }

    /// Zero rows, or no value anywhere. Charting is skipped for such tables.
    pub fn is_vacuous(&self) -> bool {
        self.rows.iter().all(|r| r.record.is_all_null())
    }

    /// Keep rows with `run_date - days <= date <= run_date`.
    pub fn retain_window(&mut self, run_date: NaiveDate, days: i64) {
        let cutoff = window_start(run_date, days);
        let before = self.rows.len();
        self.rows.retain(|r| r.date >= cutoff && r.date <= run_date);
        debug!(cutoff = %cutoff, dropped = before - self.rows.len(), "applied trailing window");
    }

    /// Replace each null with the nearest earlier non-null in the same column.
    /// Leading nulls stay null.
    pub fn forward_fill(&mut self) {
        for metric in Metric::ALL {
            let mut last = None;
            for row in &mut self.rows {
                match row.record.get(metric) {
                    Some(v) => last = Some(v),
                    None => row.record.set(metric, last),
                }
            }
        }
    }
}

/// First date kept by a trailing window of `days` ending at `run_date`.
pub fn window_start(run_date: NaiveDate, days: i64) -> NaiveDate {
    run_date - Duration::days(days)
}

/// Outer-join series on date. The result spans the union of all input dates.
///
/// Each metric may be supplied at most once; a second series for the same
/// metric leaves the join ambiguous and is rejected.
pub fn outer_join(series: Vec<NamedSeries>) -> Result<AlignedTable, AlignError> {
    let mut seen = [false; 4];
    let mut by_date: BTreeMap<NaiveDate, MetricRecord> = BTreeMap::new();

    for s in series {
        let idx = s.metric.index();
        if seen[idx] {
            return Err(AlignError::JoinFailure(s.metric));
        }
        seen[idx] = true;

        for (date, value) in s.points {
            by_date.entry(date).or_default().set(s.metric, value);
        }
    }

    Ok(AlignedTable {
        rows: by_date
            .into_iter()
            .map(|(date, record)| AlignedRow { date, record })
            .collect(),
    })
}

/// Join, window and repair the per-metric series into one table.
///
/// Never fails: a join failure yields an empty table, which the caller still
/// persists.
pub fn align(series: Vec<NamedSeries>, run_date: NaiveDate, window_days: i64) -> AlignedTable {
    // Re-normalize in front of the join; idempotent for adapter output.
    let series: Vec<NamedSeries> = series.into_iter().map(Normalize::normalize).collect();

    let mut table = match outer_join(series) {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "join failed, continuing with an empty table");
            AlignedTable::empty()
        }
    };

    if !table.is_empty() {
        table.retain_window(run_date, window_days);
        table.forward_fill();
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(metric: Metric, points: &[(&str, f64)]) -> NamedSeries {
        NamedSeries::from_points(metric, points.iter().map(|(date, v)| (d(date), Some(*v))))
    }

    #[test]
    fn join_spans_union_of_dates() {
        let a = series(Metric::StablecoinMarketCap, &[("2024-01-02", 1.0), ("2024-01-03", 2.0)]);
        let b = series(Metric::BinanceBtcOi, &[("2024-01-03", 30.0), ("2024-01-04", 40.0)]);

        let table = outer_join(vec![a, b]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0].record.binance_btc_oi, None);
        assert_eq!(table.rows()[2].record.stablecoin_market_cap, None);
        assert_eq!(table.rows()[1].record.values(), [Some(2.0), None, None, Some(30.0)]);
    }

    #[test]
    fn duplicate_metric_is_a_join_failure() {
        let a = series(Metric::BtcRealizedCap, &[("2024-01-02", 1.0)]);
        let b = series(Metric::BtcRealizedCap, &[("2024-01-03", 2.0)]);
        assert_eq!(
            outer_join(vec![a, b]),
            Err(AlignError::JoinFailure(Metric::BtcRealizedCap))
        );
    }

    #[test]
    fn align_recovers_from_join_failure_with_empty_table() {
        let a = series(Metric::BtcRealizedCap, &[("2024-01-02", 1.0)]);
        let table = align(vec![a.clone(), a], d("2024-01-10"), 365);
        assert!(table.is_empty());
        assert!(table.is_vacuous());
    }

    #[test]
    fn forward_fill_carries_last_observation() {
        let a = series(
            Metric::EtfVolumeProxy,
            &[("2024-01-02", 5.0), ("2024-01-03", 6.0), ("2024-01-04", 7.0)],
        );
        let b = series(Metric::BinanceBtcOi, &[("2024-01-02", 9.0)]);
        let table = align(vec![a, b], d("2024-01-05"), 365);

        let oi: Vec<_> = table.column(Metric::BinanceBtcOi).collect();
        assert_eq!(oi, vec![Some(9.0), Some(9.0), Some(9.0)]);
        let etf: Vec<_> = table.column(Metric::EtfVolumeProxy).collect();
        assert_eq!(etf, vec![Some(5.0), Some(6.0), Some(7.0)]);
    }

    #[test]
    fn leading_gaps_stay_null() {
        let a = series(Metric::StablecoinMarketCap, &[("2024-01-02", 1.0), ("2024-01-04", 3.0)]);
        let b = series(Metric::BtcRealizedCap, &[("2024-01-03", 8.0)]);
        let table = align(vec![a, b], d("2024-01-05"), 365);

        let rc: Vec<_> = table.column(Metric::BtcRealizedCap).collect();
        assert_eq!(rc, vec![None, Some(8.0), Some(8.0)]);
        let sc: Vec<_> = table.column(Metric::StablecoinMarketCap).collect();
        assert_eq!(sc, vec![Some(1.0), Some(1.0), Some(3.0)]);
    }

    #[test]
    fn window_drops_rows_before_cutoff() {
        let run_date = d("2024-12-31");
        let start = window_start(run_date, 365) - Duration::days(3);
        let points: Vec<_> = (0..40)
            .map(|i| (start + Duration::days(i), Some(i as f64)))
            .collect();
        // Shuffle the input order; the join sorts.
        let mut reversed = points.clone();
        reversed.reverse();
        let s = NamedSeries::from_points(Metric::StablecoinMarketCap, reversed);

        let table = align(vec![s], run_date, 365);
        assert_eq!(table.len(), 37);
        assert_eq!(table.first_date(), Some(window_start(run_date, 365)));
        assert!(table.rows().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn future_rows_are_dropped() {
        let s = series(Metric::BinanceBtcOi, &[("2024-01-02", 1.0), ("2024-01-09", 2.0)]);
        let table = align(vec![s], d("2024-01-05"), 365);
        assert_eq!(table.len(), 1);
        assert_eq!(table.last_date(), Some(d("2024-01-02")));
    }

    #[test]
    fn all_empty_inputs_give_vacuous_table() {
        let inputs = Metric::ALL.map(NamedSeries::empty).to_vec();
        let table = align(inputs, d("2024-01-05"), 365);
        assert!(table.is_empty());
        assert!(table.is_vacuous());
        for metric in Metric::ALL {
            assert!(table.column_is_null(metric));
        }
    }

    #[test]
    fn all_null_values_are_vacuous_but_keep_rows() {
        let s = NamedSeries::from_points(Metric::BtcRealizedCap, vec![(d("2024-01-02"), None)]);
        let table = align(vec![s], d("2024-01-05"), 365);
        assert_eq!(table.len(), 1);
        assert!(table.is_vacuous());
    }

    #[test]
    fn forward_fill_is_idempotent() {
        let a = series(Metric::EtfVolumeProxy, &[("2024-01-02", 5.0), ("2024-01-05", 7.0)]);
        let b = series(Metric::BinanceBtcOi, &[("2024-01-03", 9.0)]);
        let mut table = align(vec![a, b], d("2024-01-06"), 365);
        let once = table.clone();
        table.forward_fill();
        assert_eq!(table, once);
    }
}
