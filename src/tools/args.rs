//! Argument extraction for tool calls.
//!
//! JSON `null` is treated the same as an absent key. Type mismatches are
//! `invalid_input`; unparsable dates are `invalid_date`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::types::ToolError;
use crate::store::{Priority, Span};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Parse an ISO-8601 date or datetime into local wall-clock time.
///
/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DDTHH:MM[:SS[.fff]]`, and the
/// same with a `Z` or `±HH:MM` suffix, which is converted to the local zone.
pub fn parse_iso_datetime(input: &str) -> Result<NaiveDateTime, ToolError> {
    let text = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }

    let zoned = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(body) => format!("{body}+00:00"),
        None => text.to_owned(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&zoned, format) {
            return Ok(parsed.with_timezone(&Local).naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed);
        }
    }

    Err(ToolError::invalid_date(format!(
        "Invalid date format: '{input}'. Use ISO 8601 (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)"
    )))
}

fn present<'a>(args: &'a Value, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

/// Required string argument.
pub fn required_str(args: &Value, name: &str) -> Result<String, ToolError> {
    optional_str(args, name)?
        .ok_or_else(|| ToolError::invalid_input(format!("missing required argument '{name}'")))
}

/// Optional string argument.
pub fn optional_str(args: &Value, name: &str) -> Result<Option<String>, ToolError> {
    match present(args, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ToolError::invalid_input(format!("'{name}' must be a string"))),
    }
}

/// Optional boolean argument.
pub fn optional_bool(args: &Value, name: &str) -> Result<Option<bool>, ToolError> {
    match present(args, name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::invalid_input(format!("'{name}' must be a boolean"))),
    }
}

/// Non-negative integer argument with a default.
pub fn limit(args: &Value, name: &str, default: usize) -> Result<usize, ToolError> {
    match present(args, name) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                ToolError::invalid_input(format!("'{name}' must be a non-negative integer"))
            }),
    }
}

/// Optional list of tag strings.
pub fn optional_tags(args: &Value, name: &str) -> Result<Option<Vec<String>>, ToolError> {
    let Some(value) = present(args, name) else {
        return Ok(None);
    };
    let invalid = || ToolError::invalid_input(format!("'{name}' must be an array of strings"));
    let items = value.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Required ISO-8601 date argument.
pub fn required_date(args: &Value, name: &str) -> Result<NaiveDateTime, ToolError> {
    parse_iso_datetime(&required_str(args, name)?)
}

/// Optional ISO-8601 date argument.
pub fn optional_date(args: &Value, name: &str) -> Result<Option<NaiveDateTime>, ToolError> {
    optional_str(args, name)?
        .map(|s| parse_iso_datetime(&s))
        .transpose()
}

/// Required recurrence span; anything else is `invalid_span`.
pub fn required_span(args: &Value) -> Result<Span, ToolError> {
    present(args, "span")
        .and_then(Value::as_str)
        .and_then(Span::parse)
        .ok_or_else(ToolError::invalid_span)
}

/// Optional priority name.
pub fn optional_priority(args: &Value, name: &str) -> Result<Option<Priority>, ToolError> {
    optional_str(args, name)?
        .map(|s| {
            Priority::parse(&s).ok_or_else(|| {
                ToolError::invalid_input("priority must be 'none', 'low', 'medium', or 'high'")
            })
        })
        .transpose()
}
