//! Type inference for raw values
//!
//! Rules, evaluated in order:
//!
//! 1. A date value is a date.
//! 2. A string starting with `YYYY-MM-DD` that parses as a calendar date is a date.
//! 3. Any other string containing `-` or `/` is forced to text, so identifiers, phone
//!    numbers and partial dates are never reinterpreted by spreadsheet clients.
//! 4. Everything else keeps its native type; null and empty strings are null.
//!
//! A column's type is decided once from its first non-null sample unless the caller
//! supplies an explicit override.

use crate::types::{ColumnType, RecordSet, TypeTag, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid ISO date regex"));

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Classify a single value
pub fn infer(value: &Value) -> TypeTag {
    match value {
        Value::Date(_) => TypeTag::Date,
        Value::Text(s) if s.is_empty() => TypeTag::Null,
        Value::Text(s) if parse_iso_date(s).is_some() => TypeTag::Date,
        Value::Text(_) => TypeTag::Text,
        Value::Number(_) => TypeTag::Number,
        Value::Boolean(_) => TypeTag::Boolean,
        Value::Null => TypeTag::Null,
    }
}

/// Check whether text would be forced to text by the separator rule
pub fn is_forced_text(s: &str) -> bool {
    (s.contains('-') || s.contains('/')) && parse_iso_date(s).is_none()
}

/// Parse an ISO-prefixed date string
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]` and RFC 3339 timestamps.
/// Offsets are dropped rather than applied, so the calendar day matches the text.
/// The whole string must parse.
pub fn parse_iso_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if !ISO_DATE_PREFIX.is_match(s) {
        return None;
    }
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

/// Date carried by a value: a date value, or text satisfying the date rule
pub fn coerce_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_iso_date(s),
        _ => None,
    }
}

/// Type of a column taken from its first non-null sample
pub fn infer_column(records: &RecordSet, column: &str) -> TypeTag {
    records
        .iter()
        .map(|r| infer(r.get_or_null(column)))
        .find(|tag| *tag != TypeTag::Null)
        .unwrap_or(TypeTag::Null)
}

/// Resolve how one cell is stored under its column's type
///
/// The column type applies to every value in the column. An explicit `Text` column
/// stores everything as text; an inferred one keeps strings verbatim and leaves
/// numbers, booleans and date values native. A `Date` column converts only values that
/// carry a date. An explicit `Number` column also promotes numeric text. Values the
/// column type cannot represent keep their own type, except that date-like strings
/// outside a date column stay text.
pub fn resolve_cell(value: &Value, column_type: ColumnType, explicit: bool) -> TypeTag {
    if value.is_null() {
        return TypeTag::Null;
    }
    match column_type {
        ColumnType::Text if explicit => TypeTag::Text,
        ColumnType::Date if coerce_date(value).is_some() => TypeTag::Date,
        ColumnType::Number if explicit && value.as_f64().is_some() => TypeTag::Number,
        _ => match (value, infer(value)) {
            (Value::Date(_), _) => TypeTag::Date,
            (_, TypeTag::Date) => TypeTag::Text,
            (_, other) => other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_date_values() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(infer(&Value::from(d)), TypeTag::Date);
        assert_eq!(infer(&text("2024-01-15")), TypeTag::Date);
        assert_eq!(infer(&text("2024-01-15T10:30:00")), TypeTag::Date);
        assert_eq!(infer(&text("2024-01-15T10:30:00Z")), TypeTag::Date);
    }

    #[test]
    fn test_offset_keeps_written_day() {
        let dt = parse_iso_date("2024-01-15T01:00:00+05:00").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn test_dash_and_slash_forced_to_text() {
        assert_eq!(infer(&text("2024-01")), TypeTag::Text);
        assert_eq!(infer(&text("555-123-4567")), TypeTag::Text);
        assert_eq!(infer(&text("01/15/2024")), TypeTag::Text);
        assert_eq!(infer(&text("2024-13-45")), TypeTag::Text);
        assert_eq!(infer(&text("2024-01-15abc")), TypeTag::Text);
        assert!(is_forced_text("A-100"));
        assert!(!is_forced_text("2024-01-15"));
        assert!(!is_forced_text("plain"));
    }

    #[test]
    fn test_pass_through() {
        assert_eq!(infer(&text("hello")), TypeTag::Text);
        assert_eq!(infer(&text("42")), TypeTag::Text);
        assert_eq!(infer(&Value::Number(42.0)), TypeTag::Number);
        assert_eq!(infer(&Value::Boolean(false)), TypeTag::Boolean);
        assert_eq!(infer(&Value::Null), TypeTag::Null);
        assert_eq!(infer(&text("")), TypeTag::Null);
    }

    #[test]
    fn test_column_uses_first_non_null_sample() {
        let rs: RecordSet = vec![
            Record::new().with("when", Value::Null),
            Record::new().with("when", "2024-03-01"),
            Record::new().with("when", "later"),
        ]
        .into();
        assert_eq!(infer_column(&rs, "when"), TypeTag::Date);
        assert_eq!(infer_column(&rs, "missing"), TypeTag::Null);
    }

    #[test]
    fn test_explicit_override_wins() {
        let resolve = |value: &Value, column_type| resolve_cell(value, column_type, true);

        assert_eq!(resolve(&text("2024-01-15"), ColumnType::Text), TypeTag::Text);
        assert_eq!(resolve(&Value::Number(7.0), ColumnType::Text), TypeTag::Text);

        assert_eq!(resolve(&text("12.5"), ColumnType::Number), TypeTag::Number);
        assert_eq!(resolve(&text("n/a"), ColumnType::Number), TypeTag::Text);
        assert_eq!(resolve(&text("2024-01-15"), ColumnType::Number), TypeTag::Text);

        assert_eq!(resolve(&text("2024-01-15"), ColumnType::Date), TypeTag::Date);
        assert_eq!(resolve(&text("2024-99-99"), ColumnType::Date), TypeTag::Text);
        assert_eq!(resolve(&Value::Null, ColumnType::Date), TypeTag::Null);
    }

    #[test]
    fn test_inferred_column_type_applies_to_every_cell() {
        let resolve = |value: &Value, column_type| resolve_cell(value, column_type, false);

        // A text column keeps later date-like strings verbatim
        assert_eq!(resolve(&text("2024-01-15"), ColumnType::Text), TypeTag::Text);
        assert_eq!(resolve(&text("A-1"), ColumnType::Text), TypeTag::Text);
        assert_eq!(resolve(&Value::Boolean(true), ColumnType::Text), TypeTag::Boolean);
        assert_eq!(resolve(&Value::Number(3.0), ColumnType::Text), TypeTag::Number);
        assert_eq!(resolve(&text(""), ColumnType::Text), TypeTag::Null);

        // A date column converts only values carrying a date
        assert_eq!(resolve(&text("2024-01-15"), ColumnType::Date), TypeTag::Date);
        assert_eq!(resolve(&text("pending"), ColumnType::Date), TypeTag::Text);

        // A number column never promotes text
        assert_eq!(resolve(&text("12"), ColumnType::Number), TypeTag::Text);
        assert_eq!(resolve(&text("2024-01-15"), ColumnType::Number), TypeTag::Text);
        assert_eq!(resolve(&Value::Number(12.0), ColumnType::Number), TypeTag::Number);
    }
}
