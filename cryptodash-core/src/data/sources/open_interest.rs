//! Binance USDⓈ-M futures open interest history.

use super::{epoch_field, shape};
use crate::data::http::HttpFetch;
use crate::data::metric::Metric;
use crate::data::provider::{SeriesSource, SourceError, SourceOutcome};
use crate::data::series::{RawSeries, RawTimestamp, RawValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_URL: &str = "https://fapi.binance.com/futures/data/openInterestHist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenInterestSource {
    pub url: String,
    pub symbol: String,
    pub period: String,
    pub limit: u32,
}

impl Default for OpenInterestSource {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            symbol: "BTCUSDT".to_string(),
            period: "1d".to_string(),
            limit: 365,
        }
    }
}

impl OpenInterestSource {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", self.symbol.clone()),
            ("period", self.period.clone()),
            ("limit", self.limit.to_string()),
        ]
    }

    /// Parse `[{"timestamp": 1704153600000, "sumOpenInterestValue": "..."}]`.
    ///
    /// Binance answers geo-blocked callers with a single error object instead
    /// of the list; that shape is reported as a block.
    pub fn parse(value: &Value) -> Result<RawSeries, SourceError> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(obj) => {
                let msg = obj
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("object returned instead of list");
                return Err(SourceError::Blocked(msg.to_string()));
            }
            other => {
                return Err(SourceError::malformed(format!(
                    "expected a list, got {}",
                    shape(other)
                )));
            }
        };

        let mut raw = RawSeries::new(Metric::BinanceBtcOi);
        for item in items {
            let ms = epoch_field(item, "timestamp")?;
            let value = item
                .get("sumOpenInterestValue")
                .map(RawValue::from_json)
                .unwrap_or(RawValue::Missing);
            raw.push(RawTimestamp::EpochMillis(ms), value);
        }
        Ok(raw)
    }
}

impl SeriesSource for OpenInterestSource {
    fn metric(&self) -> Metric {
        Metric::BinanceBtcOi
    }

    fn name(&self) -> &str {
        "binance"
    }

    fn fetch(&self, client: &dyn HttpFetch) -> SourceOutcome {
        let result = client
            .get_json(&self.url, &self.query())
            .and_then(|body| Self::parse(&body));
        SourceOutcome::from_result(self.metric(), result)
    }
}
