//! Raw and normalized series types.
//!
//! Adapters build a [`RawSeries`] straight from the provider's response, with
//! timestamps and values in whatever shape the provider used. The normalizer
//! turns it into a [`NamedSeries`]: one optional number per calendar date.

use super::metric::Metric;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::BTreeMap;

/// A timestamp as the provider sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Seconds since the Unix epoch (UTC). Fractional values are allowed.
    EpochSeconds(f64),
    /// Milliseconds since the Unix epoch (UTC).
    EpochMillis(f64),
    /// A timestamp carrying a UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// A wall-clock timestamp without zone information.
    Naive(NaiveDateTime),
    Date(NaiveDate),
    /// Unparsed text, e.g. `"2024-01-02T00:00:00.000000000Z"` or `"11 Jan 2024"`.
    Text(String),
}

/// A value as the provider sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Lift a JSON scalar into a raw value.
    ///
    /// DeFiLlama reports circulating supply as `{"peggedUSD": n}`; such objects
    /// unwrap to their `peggedUSD` member.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Missing),
            Value::String(s) => RawValue::Text(s.clone()),
            Value::Object(map) => map
                .get("peggedUSD")
                .map(RawValue::from_json)
                .unwrap_or(RawValue::Missing),
            _ => RawValue::Missing,
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

/// One provider's observations before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub metric: Metric,
    pub points: Vec<(RawTimestamp, RawValue)>,
}

impl RawSeries {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, ts: RawTimestamp, value: impl Into<RawValue>) {
        self.points.push((ts, value.into()));
    }
}

/// A metric's values indexed by calendar date.
///
/// Keys are unique and ordered. An empty series stands for a source that
/// produced nothing this run; its metric is still known.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub metric: Metric,
    pub points: BTreeMap<NaiveDate, Option<f64>>,
}

impl NamedSeries {
    pub fn empty(metric: Metric) -> Self {
        Self {
            metric,
            points: BTreeMap::new(),
        }
    }

    pub fn from_points(metric: Metric, points: impl IntoIterator<Item = (NaiveDate, Option<f64>)>) -> Self {
        Self {
            metric,
            points: points.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied().flatten()
    }

    /// Number of dates carrying an actual number.
    pub fn observed_count(&self) -> usize {
        self.points.values().filter(|v| v.is_some()).count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }
}
