//! CoinMetrics community API: BTC realized capitalization.

use super::shape;
use crate::data::http::HttpFetch;
use crate::data::metric::Metric;
use crate::data::provider::{SeriesSource, SourceError, SourceOutcome};
use crate::data::series::{RawSeries, RawTimestamp, RawValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_URL: &str = "https://community-api.coinmetrics.io/v4/timeseries/asset-metrics";
const METRIC_FIELD: &str = "CapRealizedUSD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealizedCapSource {
    pub url: String,
    pub asset: String,
    pub page_size: u32,
}

impl Default for RealizedCapSource {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            asset: "btc".to_string(),
            page_size: 365,
        }
    }
}

impl RealizedCapSource {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("assets", self.asset.clone()),
            ("metrics", METRIC_FIELD.to_string()),
            ("frequency", "1d".to_string()),
            ("page_size", self.page_size.to_string()),
            // Newest page first, so page_size counts back from today.
            ("paging_from", "end".to_string()),
        ]
    }

    /// Parse `{"data": [{"time": "...Z", "CapRealizedUSD": "..."}]}`.
    ///
    /// A missing `data` key is a failure, never an empty or zero series.
    pub fn parse(value: &Value) -> Result<RawSeries, SourceError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SourceError::malformed(format!("expected an object, got {}", shape(value))))?;

        let data = match obj.get("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(SourceError::malformed(format!("'data' is {}", shape(other))));
            }
            None => {
                let reason = obj
                    .get("error")
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "missing 'data' key".to_string());
                return Err(SourceError::malformed(reason));
            }
        };

        let mut raw = RawSeries::new(Metric::BtcRealizedCap);
        for item in data {
            let time = item
                .get("time")
                .and_then(Value::as_str)
                .ok_or_else(|| SourceError::malformed("point without 'time'"))?;
            let value = item
                .get(METRIC_FIELD)
                .map(RawValue::from_json)
                .unwrap_or(RawValue::Missing);
            raw.push(RawTimestamp::Text(time.to_string()), value);
        }
        Ok(raw)
    }
}

impl SeriesSource for RealizedCapSource {
    fn metric(&self) -> Metric {
        Metric::BtcRealizedCap
    }

    fn name(&self) -> &str {
        "coinmetrics"
    }

    fn fetch(&self, client: &dyn HttpFetch) -> SourceOutcome {
        let result = client
            .get_json(&self.url, &self.query())
            .and_then(|body| Self::parse(&body));
        SourceOutcome::from_result(self.metric(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::http::CannedFetch;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn parses_string_values_and_nanosecond_times() {
        let body = json!({
            "data": [
                {"asset": "btc", "time": "2024-01-02T00:00:00.000000000Z", "CapRealizedUSD": "441234567890.12"},
                {"asset": "btc", "time": "2024-01-03T00:00:00.000000000Z", "CapRealizedUSD": "442000000000"}
            ],
            "next_page_token": "abc"
        });
        let fetch = CannedFetch::new().with_json(DEFAULT_URL, &body);
        let series = RealizedCapSource::default().fetch(&fetch).into_series();

        assert_eq!(series.len(), 2);
        assert_eq!(
            series.get(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Some(441_234_567_890.12)
        );
    }

    #[test]
    fn missing_data_key_is_failure_not_zero() {
        let body = json!({"error": {"type": "forbidden", "message": "rate limit"}});
        let fetch = CannedFetch::new().with_json(DEFAULT_URL, &body);
        let outcome = RealizedCapSource::default().fetch(&fetch);

        assert!(!outcome.is_success());
        assert!(outcome.into_series().is_empty());
    }

    #[test]
    fn list_response_is_malformed() {
        assert!(RealizedCapSource::parse(&json!([])).is_err());
    }
}
