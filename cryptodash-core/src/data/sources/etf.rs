//! Spot Bitcoin ETF activity.
//!
//! Two modes fill the same column:
//! - `VolumeProxy` (default): Yahoo Finance daily bars for the ETF ticker,
//!   valued as volume × close. This is traded dollar volume, not net flow.
//! - `NetFlow`: a published daily net-flow table, read from delimited text by
//!   locating its "Date" and "Total" columns.

use crate::data::http::HttpFetch;
use crate::data::metric::Metric;
use crate::data::provider::{SeriesSource, SourceError, SourceOutcome};
use crate::data::series::{RawSeries, RawTimestamp, RawValue};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtfMode {
    #[default]
    VolumeProxy,
    NetFlow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtfSource {
    pub mode: EtfMode,
    pub ticker: String,
    pub chart_url: String,
    /// Delimited net-flow table. Required in `NetFlow` mode; there is no
    /// default because the public flow trackers publish HTML, not CSV.
    pub flow_url: Option<String>,
}

impl Default for EtfSource {
    fn default() -> Self {
        Self {
            mode: EtfMode::VolumeProxy,
            ticker: "IBIT".to_string(),
            chart_url: DEFAULT_CHART_URL.to_string(),
            flow_url: None,
        }
    }
}

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl EtfSource {
    pub fn chart_endpoint(&self) -> String {
        format!("{}/{}", self.chart_url.trim_end_matches('/'), self.ticker)
    }

    /// Parse a chart response into volume × close per trading day.
    ///
    /// Bar timestamps are shifted into the exchange's offset before the date
    /// is taken, so each value lands on its local trading date.
    pub fn parse_chart(value: Value) -> Result<RawSeries, SourceError> {
        let resp: ChartResponse = serde_json::from_value(value)
            .map_err(|e| SourceError::malformed(format!("unexpected chart shape: {e}")))?;

        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) => SourceError::malformed(format!("{}: {}", err.code, err.description)),
            None => SourceError::malformed("empty result with no error"),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::malformed("result array is empty"))?;

        let timestamps = data.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            return Err(SourceError::malformed("empty history"));
        }

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::malformed("no quote data"))?;

        let offset = data
            .meta
            .and_then(|m| m.gmtoffset)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());

        let mut raw = RawSeries::new(Metric::EtfVolumeProxy);
        for (i, &ts) in timestamps.iter().enumerate() {
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays come back as all-null bars.
            if close.is_none() && volume.is_none() {
                continue;
            }

            let Some(utc) = DateTime::from_timestamp(ts, 0) else {
                continue;
            };
            let value = match (volume, close) {
                (Some(v), Some(c)) => RawValue::Number(v * c),
                _ => RawValue::Missing,
            };
            raw.push(RawTimestamp::Zoned(utc.with_timezone(&offset)), value);
        }

        Ok(raw)
    }

    /// Parse a delimited net-flow table.
    ///
    /// The date column is the first header containing "date" and the value
    /// column the first containing "total" (case-insensitive). If either is
    /// missing the table is rejected rather than guessing by position. Value
    /// cells keep their currency formatting; the normalizer strips it.
    pub fn parse_flow_table(text: &str) -> Result<RawSeries, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| SourceError::malformed(format!("unreadable table header: {e}")))?
            .clone();

        let find = |needle: &str| {
            headers
                .iter()
                .position(|h| h.to_ascii_lowercase().contains(needle))
        };
        let date_col = find("date").ok_or_else(|| SourceError::malformed("no 'Date' column"))?;
        let total_col = find("total").ok_or_else(|| SourceError::malformed("no 'Total' column"))?;

        let mut raw = RawSeries::new(Metric::EtfVolumeProxy);
        for record in reader.records() {
            let record =
                record.map_err(|e| SourceError::malformed(format!("unreadable table row: {e}")))?;
            let (Some(date), Some(total)) = (record.get(date_col), record.get(total_col)) else {
                continue;
            };
            // Summary rows ("Total", "Average") fail date parsing and drop out.
            raw.push(RawTimestamp::Text(date.to_string()), RawValue::Text(total.to_string()));
        }
        Ok(raw)
    }
}

impl SeriesSource for EtfSource {
    fn metric(&self) -> Metric {
        Metric::EtfVolumeProxy
    }

    fn name(&self) -> &str {
        match self.mode {
            EtfMode::VolumeProxy => "yahoo_finance",
            EtfMode::NetFlow => "etf_flow_table",
        }
    }

    fn fetch(&self, client: &dyn HttpFetch) -> SourceOutcome {
        let result = match self.mode {
            EtfMode::VolumeProxy => {
                let query = [("range", "1y".to_string()), ("interval", "1d".to_string())];
                client
                    .get_json(&self.chart_endpoint(), &query)
                    .and_then(Self::parse_chart)
            }
            EtfMode::NetFlow => match self.flow_url.as_deref() {
                Some(url) => client
                    .get_text(url, &[])
                    .and_then(|text| Self::parse_flow_table(&text)),
                None => Err(SourceError::Unavailable("no flow_url configured for net_flow mode".into())),
            },
        };
        SourceOutcome::from_result(self.metric(), result)
    }
}
