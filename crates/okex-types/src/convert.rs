//! Wire format normalization
//!
//! OKEx v3 encodes every number as a JSON string and every timestamp as
//! RFC 3339. These helpers turn them into `f64` and epoch milliseconds.

use chrono::DateTime;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

/// Deserialize a number sent either as a JSON string or a JSON number
///
/// An empty string is read as `0.0`; OKEx uses it for fields that do not
/// apply (e.g. `price` of a market order).
pub fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) if s.is_empty() => Ok(0.0),
        StringOrNumber::String(s) => s.parse::<f64>().map_err(D::Error::custom),
        StringOrNumber::Number(n) => n.as_f64().ok_or_else(|| D::Error::custom("invalid number")),
    }
}

/// Deserialize an integer sent either as a JSON string or a JSON number
pub fn de_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) if s.is_empty() => Ok(0),
        StringOrNumber::String(s) => s.parse::<i64>().map_err(D::Error::custom),
        StringOrNumber::Number(n) => n.as_i64().ok_or_else(|| D::Error::custom("invalid integer")),
    }
}

/// Deserialize an id that may arrive as a string or a number into a string
pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// Parse an RFC 3339 timestamp into epoch milliseconds
pub fn rfc3339_to_millis(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
