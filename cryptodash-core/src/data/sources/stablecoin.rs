//! DeFiLlama aggregate stablecoin market cap.

use super::{epoch_field, expect_array};
use crate::data::http::HttpFetch;
use crate::data::metric::Metric;
use crate::data::provider::{SeriesSource, SourceError, SourceOutcome};
use crate::data::series::{RawSeries, RawTimestamp, RawValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_URL: &str = "https://stablecoins.llama.fi/stablecoincharts/all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StablecoinSource {
    pub url: String,
}

impl Default for StablecoinSource {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

impl StablecoinSource {
    /// Parse `[{"date": "1617235200", "totalCirculating": {"peggedUSD": n}}, ...]`.
    pub fn parse(value: &Value) -> Result<RawSeries, SourceError> {
        let items = expect_array(value, "daily stablecoin points")?;
        let mut raw = RawSeries::new(Metric::StablecoinMarketCap);

        for item in items {
            let secs = epoch_field(item, "date")?;
            let amount = item
                .get("totalCirculating")
                .or_else(|| item.get("totalCirculatingUSD"))
                .map(RawValue::from_json)
                .unwrap_or(RawValue::Missing);
            raw.push(RawTimestamp::EpochSeconds(secs), amount);
        }

        Ok(raw)
    }
}

impl SeriesSource for StablecoinSource {
    fn metric(&self) -> Metric {
        Metric::StablecoinMarketCap
    }

    fn name(&self) -> &str {
        "defillama"
    }

    fn fetch(&self, client: &dyn HttpFetch) -> SourceOutcome {
        let result = client
            .get_json(&self.url, &[])
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
    fn parses_pegged_usd_objects_and_string_epochs() {
        let body = json!([
            {"date": "1704153600", "totalCirculating": {"peggedUSD": 1.30e11}},
            {"date": "1704240000.0", "totalCirculating": {"peggedUSD": 1.31e11}}
        ]);
        let fetch = CannedFetch::new().with_json(DEFAULT_URL, &body);

        let series = StablecoinSource::default().fetch(&fetch).into_series();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.get(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            Some(1.31e11)
        );
    }

    #[test]
    fn error_object_is_a_failure() {
        let fetch = CannedFetch::new().with_json(DEFAULT_URL, &json!({"message": "rate limited"}));
        let outcome = StablecoinSource::default().fetch(&fetch);
        assert!(matches!(outcome.error(), Some(SourceError::Malformed(_))));
        assert_eq!(outcome.into_series().metric, Metric::StablecoinMarketCap);
    }

    #[test]
    fn unparseable_date_fails_the_whole_series() {
        let body = json!([{"date": "soon", "totalCirculating": {"peggedUSD": 1.0}}]);
        assert!(StablecoinSource::parse(&body).is_err());
    }
}
