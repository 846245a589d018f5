//! Adapters for the four upstream providers.
//!
//! Each adapter doubles as its own configuration section: the fields are the
//! endpoint and query parameters, all defaulted to the public endpoints.

pub mod etf;
pub mod open_interest;
pub mod realized_cap;
pub mod stablecoin;

pub use etf::{EtfMode, EtfSource};
pub use open_interest::OpenInterestSource;
pub use realized_cap::RealizedCapSource;
pub use stablecoin::StablecoinSource;

use super::provider::SourceError;
use serde_json::Value;

/// Read an epoch field that may arrive as a JSON number or a numeric string.
///
/// Parsed as `f64` so fractional encodings are tolerated.
pub(crate) fn epoch_field(item: &Value, key: &str) -> Result<f64, SourceError> {
    let parsed = match item.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| SourceError::malformed(format!("field '{key}' is not an epoch timestamp")))
}

/// Require a JSON array, naming what was expected in the error.
pub(crate) fn expect_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, SourceError> {
    value
        .as_array()
        .ok_or_else(|| SourceError::malformed(format!("expected a list of {what}, got {}", shape(value))))
}

/// Short description of a JSON value's shape for diagnostics.
pub(crate) fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
