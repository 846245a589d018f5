//! Serializable dashboard configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! reproduces the reference run: public endpoints, 15s timeout, 365-day
//! window, `data/crypto_data.csv` and `docs/index.html`.

use cryptodash_core::data::{
    EtfMode, EtfSource, OpenInterestSource, RealizedCapSource, SeriesSource, StablecoinSource,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub http: HttpConfig,
    pub window: WindowConfig,
    pub output: OutputConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout; an expired request counts as a source failure.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Fetch the four sources on the rayon pool instead of one after another.
    pub parallel: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            parallel: false,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Trailing window length in days, counted back from the run date.
    pub days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { days: 365 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub table_path: PathBuf,
    pub chart_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("data/crypto_data.csv"),
            chart_path: PathBuf::from("docs/index.html"),
            manifest_path: PathBuf::from("data/run_manifest.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub stablecoin: StablecoinSource,
    pub etf: EtfSource,
    pub realized_cap: RealizedCapSource,
    pub open_interest: OpenInterestSource,
}

impl SourcesConfig {
    /// The four adapters in canonical column order.
    pub fn adapters(&self) -> Vec<Box<dyn SeriesSource>> {
        vec![
            Box::new(self.stablecoin.clone()),
            Box::new(self.etf.clone()),
            Box::new(self.realized_cap.clone()),
            Box::new(self.open_interest.clone()),
        ]
    }
}

impl DashboardConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        if self.window.days <= 0 {
            return Err(ConfigError::Invalid("window.days must be positive".into()));
        }
        let paths = [
            ("output.table_path", &self.output.table_path),
            ("output.chart_path", &self.output.chart_path),
            ("output.manifest_path", &self.output.manifest_path),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        let etf = &self.sources.etf;
        if etf.mode == EtfMode::NetFlow && etf.flow_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "sources.etf.flow_url (a delimited table with Date and Total columns) is required when mode = \"net_flow\"".into(),
            ));
        }
        Ok(())
    }
}
