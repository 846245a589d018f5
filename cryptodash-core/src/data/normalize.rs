//! Series normalizer.
//!
//! Reduces every timestamp to a timezone-free calendar date and every value to
//! an optional finite `f64`. Nothing here fails: an unreadable timestamp drops
//! its point, an unreadable value becomes null.
//!
//! Normalization is idempotent. The pipeline applies it right after each
//! adapter and again in front of the join.

use super::series::{NamedSeries, RawSeries, RawTimestamp, RawValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;

/// Text date layouts tried after RFC 3339, in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%d/%m/%Y", "%b %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Currency symbols removed before numeric parsing.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];

pub trait Normalize {
    fn normalize(self) -> NamedSeries;
}

impl Normalize for RawSeries {
    fn normalize(self) -> NamedSeries {
        let mut points = BTreeMap::new();
        let mut dropped = 0usize;

        for (ts, value) in &self.points {
            match timestamp_to_date(ts) {
                // Later observations for the same day replace earlier ones.
                Some(date) => {
                    points.insert(date, coerce_numeric(value));
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(metric = %self.metric, dropped, "dropped points with unreadable timestamps");
        }

        NamedSeries {
            metric: self.metric,
            points,
        }
    }
}

impl Normalize for NamedSeries {
    fn normalize(self) -> NamedSeries {
        let points = self
            .points
            .into_iter()
            .map(|(date, v)| (date, v.filter(|x| x.is_finite())))
            .collect();
        NamedSeries {
            metric: self.metric,
            points,
        }
    }
}

/// Reduce a raw timestamp to its calendar date.
///
/// Zoned timestamps keep their local wall-clock date (the offset is dropped,
/// not applied). Epoch timestamps are read as UTC.
pub fn timestamp_to_date(ts: &RawTimestamp) -> Option<NaiveDate> {
    match ts {
        RawTimestamp::EpochSeconds(secs) => {
            if !secs.is_finite() {
                return None;
            }
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9) as u32;
            DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.date_naive())
        }
        RawTimestamp::EpochMillis(ms) => {
            if !ms.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(ms.floor() as i64).map(|dt| dt.date_naive())
        }
        RawTimestamp::Zoned(dt) => Some(dt.naive_local().date()),
        RawTimestamp::Naive(dt) => Some(dt.date()),
        RawTimestamp::Date(d) => Some(*d),
        RawTimestamp::Text(s) => parse_date_text(s.trim()),
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// Coerce a raw value to a finite number, or null.
pub fn coerce_numeric(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(n) => Some(*n).filter(|x| x.is_finite()),
        RawValue::Text(s) => parse_numeric_text(s),
        RawValue::Missing => None,
    }
}

/// Parse provider-formatted numbers: `"$1,234.50"`, `"(12.3)"`, `" 42 "`.
fn parse_numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let parsed: f64 = cleaned.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    Some(if negative { -parsed } else { parsed })
}
