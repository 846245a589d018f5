//! Source adapter trait and structured error types.
//!
//! A [`SeriesSource`] wraps one upstream provider. Whatever goes wrong inside
//! it comes back as [`SourceOutcome::Failure`]; adapters never return `Err`
//! past their own boundary and never panic on provider input.

use super::http::HttpFetch;
use super::metric::Metric;
use super::normalize::Normalize;
use super::series::{NamedSeries, RawSeries};
use thiserror::Error;
use tracing::{info, warn};

/// Structured error types for a single source fetch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    Unavailable(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("provider blocked the request: {0}")]
    Blocked(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Coarse classification used in diagnostics and the run manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedResponse,
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Unavailable(_)
            | SourceError::Timeout { .. }
            | SourceError::HttpStatus { .. } => ErrorKind::SourceUnavailable,
            SourceError::Blocked(_) | SourceError::Malformed(_) => ErrorKind::MalformedResponse,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        SourceError::Malformed(msg.into())
    }
}

/// Result of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Success(NamedSeries),
    Failure { metric: Metric, error: SourceError },
}

impl SourceOutcome {
    /// Wrap a parse result: normalize on success, log and tag on failure.
    pub fn from_result(metric: Metric, result: Result<RawSeries, SourceError>) -> Self {
        match result {
            Ok(raw) => {
                let series = raw.normalize();
                info!(metric = %metric, points = series.len(), "source fetched");
                SourceOutcome::Success(series)
            }
            Err(error) => {
                warn!(metric = %metric, kind = ?error.kind(), %error, "source failed");
                SourceOutcome::Failure { metric, error }
            }
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            SourceOutcome::Success(series) => series.metric,
            SourceOutcome::Failure { metric, .. } => *metric,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&SourceError> {
        match self {
            SourceOutcome::Success(_) => None,
            SourceOutcome::Failure { error, .. } => Some(error),
        }
    }

    /// The fetched series, or an empty one carrying the right metric.
    pub fn into_series(self) -> NamedSeries {
        match self {
            SourceOutcome::Success(series) => series,
            SourceOutcome::Failure { metric, .. } => NamedSeries::empty(metric),
        }
    }
}

/// Trait for upstream sources (DeFiLlama, Yahoo Finance, CoinMetrics, Binance).
///
/// Implementations make exactly one request per call through the borrowed
/// transport and match the response against a fixed expected schema.
pub trait SeriesSource: Send + Sync {
    /// Metric this source fills.
    fn metric(&self) -> Metric;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Fetch and parse. Never panics, never retries.
    fn fetch(&self, client: &dyn HttpFetch) -> SourceOutcome;
}
