//! HTTP transport seam.
//!
//! Adapters only see [`HttpFetch`]. The orchestrator builds one [`HttpClient`]
//! per run and lends it to every adapter; tests lend a canned fetcher instead.

use super::provider::SourceError;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// One-shot GET requests. No retries at this layer.
pub trait HttpFetch: Send + Sync {
    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, SourceError>;

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, SourceError>;
}

/// Blocking reqwest client with a fixed per-call timeout and browser identity.
pub struct HttpClient {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn send(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::blocking::Response, SourceError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS {
            return Err(SourceError::Blocked(format!("HTTP {status} from {url}")));
        }
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

impl HttpFetch for HttpClient {
    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let resp = self.send(url, query)?;
        resp.json::<Value>().map_err(|e| {
            if e.is_timeout() {
                self.map_transport_error(e)
            } else {
                SourceError::Malformed(format!("response is not JSON: {e}"))
            }
        })
    }

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let resp = self.send(url, query)?;
        resp.text().map_err(|e| self.map_transport_error(e))
    }
}

/// Offline fetcher serving fixed bodies keyed by URL (query ignored). Test double
/// for [`HttpClient`].
#[derive(Debug, Default, Clone)]
pub struct CannedFetch {
    responses: HashMap<String, Result<String, SourceError>>,
}

impl CannedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<String>) -> Self {
        self.responses.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn with_json(self, url: &str, value: &Value) -> Self {
        self.with_body(url, value.to_string())
    }

    pub fn with_error(mut self, url: &str, error: SourceError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }
}

impl HttpFetch for CannedFetch {
    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let body = self.get_text(url, query)?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::Malformed(format!("response is not JSON: {e}")))
    }

    fn get_text(&self, url: &str, _query: &[(&str, String)]) -> Result<String, SourceError> {
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(SourceError::Unavailable(format!("no canned response for {url}"))))
    }
}
