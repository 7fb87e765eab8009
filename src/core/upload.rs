//! Validation of user-supplied point data before it is uploaded
//!
//! The input is a JSON array of `{"x", "y", "value", "time"}` objects where
//! `time` is either epoch seconds or a date string. Every entry is checked
//! before anything is sent.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::protocol::UploadBatch;

/// Shown to the user alongside any [`UploadError`]
pub const EXPECTED_SHAPE: &str = r#"Uploaded dataset must be a JSON array whose entries are "x" (number), "y" (number), "value" (number), "time" (epoch seconds or date string)"#;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("not an array")]
    NotAnArray,

    #[error("invalid entry at position {index}: {entry}")]
    InvalidEntry { index: usize, entry: String },

    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a date string into epoch seconds. Accepts RFC 3339, RFC 2822 and
/// plain `YYYY-MM-DD[ HH:MM[:SS]]` forms (read as UTC).
pub fn parse_date(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp() as f64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp() as f64);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp() as f64);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp() as f64)
}

/// Seconds since the epoch, rounded to the nearest second
fn epoch_seconds(time: &Value) -> Option<u32> {
    let seconds = match time {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_date(s)?,
        _ => return None,
    }
    .round();
    (seconds.is_finite() && seconds >= 0.0 && seconds <= u32::MAX as f64).then(|| seconds as u32)
}

fn number(entry: &Value, field: &str) -> Option<f32> {
    entry.get(field)?.as_f64().map(|v| v as f32)
}

/// Validate parsed JSON into an upload batch
pub fn batch_from_json(json: &Value) -> Result<UploadBatch, UploadError> {
    let entries = json.as_array().ok_or(UploadError::NotAnArray)?;
    let mut batch = UploadBatch {
        xs: Vec::with_capacity(entries.len()),
        ys: Vec::with_capacity(entries.len()),
        values: Vec::with_capacity(entries.len()),
        timestamps: Vec::with_capacity(entries.len()),
    };

    for (index, entry) in entries.iter().enumerate() {
        let fields = (
            number(entry, "x"),
            number(entry, "y"),
            number(entry, "value"),
            entry.get("time").and_then(epoch_seconds),
        );
        let (Some(x), Some(y), Some(value), Some(time)) = fields else {
            return Err(UploadError::InvalidEntry { index, entry: entry.to_string() });
        };
        batch.xs.push(x);
        batch.ys.push(y);
        batch.values.push(value);
        batch.timestamps.push(time);
    }

    debug!(points = batch.len(), "Upload data validated");
    Ok(batch)
}

/// Parse and validate upload file contents
pub fn parse_upload(text: &str) -> Result<UploadBatch, UploadError> {
    let json: Value = serde_json::from_str(text)?;
    batch_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload() {
        let text = r#"[
            {"x": 1.5, "y": -2, "value": 10, "time": 1600000000},
            {"x": 0, "y": 0, "value": 0.25, "time": "2020-09-13T12:26:40Z"},
            {"x": 3, "y": 4, "value": 1, "time": "2020-01-01"}
        ]"#;
        let batch = parse_upload(text).unwrap();
        assert_eq!(batch.xs, vec![1.5, 0.0, 3.0]);
        assert_eq!(batch.ys, vec![-2.0, 0.0, 4.0]);
        assert_eq!(batch.values, vec![10.0, 0.25, 1.0]);
        assert_eq!(batch.timestamps, vec![1_600_000_000, 1_600_000_000, 1_577_836_800]);
    }

    #[test]
    fn test_invalid_entry_position() {
        let text = r#"[
            {"x": 1, "y": 2, "value": 3, "time": 4},
            {"x": "1", "y": 2, "value": 3, "time": 4}
        ]"#;
        match parse_upload(text).unwrap_err() {
            UploadError::InvalidEntry { index, entry } => {
                assert_eq!(index, 1);
                assert!(entry.contains("\"1\""));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unparsable_time() {
        let text = r#"[{"x": 1, "y": 2, "value": 3, "time": "yesterday"}]"#;
        assert!(matches!(parse_upload(text), Err(UploadError::InvalidEntry { index: 0, .. })));
        let text = r#"[{"x": 1, "y": 2, "value": 3}]"#;
        assert!(matches!(parse_upload(text), Err(UploadError::InvalidEntry { index: 0, .. })));
        let text = r#"[{"x": 1, "y": 2, "value": 3, "time": -5}]"#;
        assert!(matches!(parse_upload(text), Err(UploadError::InvalidEntry { index: 0, .. })));
    }

    #[test]
    fn test_fractional_time_rounds() {
        let text = r#"[
            {"x": 0, "y": 0, "value": 0, "time": 1.6},
            {"x": 0, "y": 0, "value": 0, "time": 99.4},
            {"x": 0, "y": 0, "value": 0, "time": -0.4}
        ]"#;
        assert_eq!(parse_upload(text).unwrap().timestamps, vec![2, 99, 0]);
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(parse_upload(r#"{"x": 1}"#), Err(UploadError::NotAnArray)));
        assert!(matches!(parse_upload("[1,"), Err(UploadError::Json(_))));
    }

    #[test]
    fn test_parse_date_forms() {
        assert_eq!(parse_date("1970-01-02"), Some(86_400.0));
        assert_eq!(parse_date("1970-01-01 01:00"), Some(3_600.0));
        assert_eq!(parse_date("Thu, 01 Jan 1970 00:01:00 +0000"), Some(60.0));
        assert_eq!(parse_date("1970-01-01T00:00:00+01:00"), Some(-3_600.0));
        assert_eq!(parse_date("not a date"), None);
    }
}
