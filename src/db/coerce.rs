//! Value normalization between form text, wire values and display text

use crate::db::schema::SemanticType;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const WIRE_DATE: &str = "%Y-%m-%d";
const WIRE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

static FRACTION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)(\.\d+.*)?$").expect("static regex"));

/// Turn a non-empty form value into its wire representation.
///
/// Empty values pass through untouched so that clearing a nullable column
/// submits an empty value rather than a coerced date. Unparsable dates are
/// sent as typed; the server decides whether to reject them.
pub fn normalize_for_submit(value: &str, semantic_type: SemanticType) -> String {
    if value.is_empty() {
        return String::new();
    }
    match semantic_type {
        SemanticType::Date => match parse_date(value) {
            Some(d) => d.format(WIRE_DATE).to_string(),
            None => value.to_string(),
        },
        SemanticType::Timestamp => match parse_timestamp(value) {
            Some(dt) => dt.format(WIRE_TIMESTAMP).to_string(),
            None => value.to_string(),
        },
        _ => value.to_string(),
    }
}

/// Calendar date as written; an offset suffix does not shift the day
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    parse_naive(value).map(|dt| dt.date())
}

/// Wall-clock local time; offset-carrying input is converted to the local zone
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    parse_naive(value)
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Keep everything before a fractional-seconds part (and whatever follows it).
///
/// `2024-01-05 10:00:00.123+00` becomes `2024-01-05 10:00:00`.
pub fn strip_fractional(value: &str) -> String {
    FRACTION_SUFFIX
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Render a record value as the text the operator should see.
pub fn normalize_for_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        // Typed wrapper, e.g. {"type": "json", "value": "\"21\"", "null": false}
        Value::Object(obj) if obj.contains_key("value") => match &obj["value"] {
            Value::String(inner) => unquote(inner).to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::String(decoded)) => decoded,
            Ok(Value::Number(n)) => n.to_string(),
            _ => s.clone(),
        },
        other => other.to_string(),
    }
}

fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
