//! Decoding helpers for node responses.

use chrono::NaiveDateTime;
use serde_json::Value;

use sbi_types::Timestamp;

use crate::ChainError;

const CHAIN_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a chain timestamp (`2024-05-01T12:00:00`, UTC, optional `Z`).
pub fn parse_time(raw: &str) -> Result<Timestamp, ChainError> {
    let trimmed = raw.trim_end_matches('Z');
    let dt = NaiveDateTime::parse_from_str(trimmed, CHAIN_TIME_FORMAT)
        .map_err(|e| ChainError::Decode(format!("bad time '{raw}': {e}")))?;
    let secs = dt.and_utc().timestamp();
    Ok(Timestamp::new(secs.max(0) as u64))
}

/// Parse an asset string such as `"1.234 HBD"` into amount and symbol.
pub fn parse_asset(raw: &str) -> Result<(f64, String), ChainError> {
    let mut parts = raw.split_whitespace();
    let amount = parts
        .next()
        .and_then(|a| a.parse::<f64>().ok())
        .ok_or_else(|| ChainError::Decode(format!("bad asset '{raw}'")))?;
    let symbol = parts.next().unwrap_or_default().to_string();
    Ok((amount, symbol))
}

/// `(tags, app)` from a post's `json_metadata`. Malformed metadata yields
/// nothing rather than an error; authors write arbitrary JSON here.
pub fn parse_json_metadata(raw: &str) -> (Vec<String>, Option<String>) {
    let Ok(meta) = serde_json::from_str::<Value>(raw) else {
        return (Vec::new(), None);
    };
    let tags = meta
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();
    let app = meta.get("app").and_then(Value::as_str).map(str::to_string);
    (tags, app)
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Result<&'a str, ChainError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::Decode(format!("missing field '{key}'")))
}

/// Numeric field that nodes send either as a number or a string.
pub(crate) fn num_field(value: &Value, key: &str) -> Result<f64, ChainError> {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ChainError::Decode(format!("bad number in '{key}'"))),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| ChainError::Decode(format!("bad number in '{key}'"))),
        _ => Err(ChainError::Decode(format!("missing field '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_chain_time() {
        assert_eq!(parse_time("1970-01-02T00:00:00").unwrap(), Timestamp::new(86_400));
        assert_eq!(parse_time("1970-01-01T00:01:00Z").unwrap(), Timestamp::new(60));
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn parses_assets() {
        assert_eq!(parse_asset("1.234 HBD").unwrap(), (1.234, "HBD".to_string()));
        assert!(parse_asset("HBD").is_err());
    }

    #[test]
    fn metadata_tags_and_app() {
        let (tags, app) = parse_json_metadata(r#"{"tags":["Hive","sbi"],"app":"peakd/2024"}"#);
        assert_eq!(tags, vec!["hive", "sbi"]);
        assert_eq!(app.as_deref(), Some("peakd/2024"));
        assert_eq!(parse_json_metadata("not json"), (Vec::new(), None));
    }

    #[test]
    fn numbers_as_strings() {
        let v = json!({"a": "12", "b": 3});
        assert_eq!(num_field(&v, "a").unwrap(), 12.0);
        assert_eq!(num_field(&v, "b").unwrap(), 3.0);
        assert!(num_field(&v, "c").is_err());
    }
}
