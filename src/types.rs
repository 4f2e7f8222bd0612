//! Data model shared by the writers and readers

use crate::options::Delimiter;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::fmt;

/// A single field value
///
/// The variant set is closed: text, number, boolean, date and null.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Absent or empty value
    Null,
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date with optional time of day (midnight when absent)
    Date(NaiveDateTime),
}

impl Value {
    /// Render the value as display text
    ///
    /// Dates use ISO 8601; writers apply the configured date format instead.
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => {
                if d.time() == chrono::NaiveTime::MIN {
                    d.date().format("%Y-%m-%d").to_string()
                } else {
                    d.format("%Y-%m-%dT%H:%M:%S").to_string()
                }
            }
        }
    }

    /// Check if value is null or an empty string
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrow the text content, if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Text(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Date part of a date value
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(d.date()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Classification of a value for formatting purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeTag {
    Text,
    Date,
    Number,
    Boolean,
    Null,
}

/// Column-level serialization type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnType {
    #[default]
    Text,
    Date,
    Number,
}

impl From<TypeTag> for ColumnType {
    fn from(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Date => ColumnType::Date,
            TypeTag::Number => ColumnType::Number,
            TypeTag::Text | TypeTag::Boolean | TypeTag::Null => ColumnType::Text,
        }
    }
}

/// Per-column serialization metadata derived once per write
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnSpec {
    /// Header text
    pub name: String,
    /// Resolved column type
    pub column_type: ColumnType,
    /// Cell format string (date pattern or number format)
    pub format: Option<String>,
    /// Display width in character units
    pub width: u32,
    /// True when the type came from an explicit caller override
    pub explicit: bool,
}

/// Ordered mapping from field name to value
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field (builder pattern)
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, keeping its original position when replaced
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value, or null when the field is missing
    pub fn get_or_null(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.fields.get(name).unwrap_or(&NULL)
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Ordered sequence of records sharing the field layout of the first record
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty record set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Header list: keys of the first record, insertion order preserved
    pub fn headers(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|r| r.keys().collect())
            .unwrap_or_default()
    }

    /// Values of each record aligned to the header list
    ///
    /// Missing fields yield null; fields absent from the first record are ignored.
    pub fn aligned_rows(&self) -> impl Iterator<Item = Vec<&Value>> {
        let headers = self.headers();
        self.records
            .iter()
            .map(move |r| headers.iter().map(|h| r.get_or_null(h)).collect())
    }

    /// Records in order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate over records
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Get number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        RecordSet { records }
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        RecordSet {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Which codec produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// OOXML spreadsheet package
    Spreadsheet,
    /// UTF-8 delimited text with the given separator
    Delimited(Delimiter),
}

impl ArtifactKind {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Spreadsheet => "xlsx",
            ArtifactKind::Delimited(_) => "csv",
        }
    }
}

/// Encoded bytes tagged with the codec that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

/// Sentinel message returned by the spreadsheet writer for an empty record set
pub const EMPTY_SPREADSHEET_MESSAGE: &str =
    "The function ran successfully, but the data array was empty";

/// Sentinel message returned by the delimited writer for an empty record set
pub const EMPTY_DELIMITED_MESSAGE: &str =
    "CSV file creation attempted, but data array was empty";

/// Result of a write call: bytes, or the benign empty-input sentinel
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Artifact was produced
    Written(Artifact),
    /// Record set was empty; carries a descriptive message
    Empty(&'static str),
}

impl WriteOutcome {
    /// Check for the empty-input sentinel
    pub fn is_empty(&self) -> bool {
        matches!(self, WriteOutcome::Empty(_))
    }

    /// Borrow the artifact, if one was produced
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            WriteOutcome::Written(a) => Some(a),
            WriteOutcome::Empty(_) => None,
        }
    }

    /// Take the artifact bytes, if one was produced
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            WriteOutcome::Written(a) => Some(a.bytes),
            WriteOutcome::Empty(_) => None,
        }
    }
}

/// Convert zero-based column index to spreadsheet letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut col = col + 1;

    while col > 0 {
        col -= 1;
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }

    result
}

/// Spreadsheet-style cell reference from zero-based row and column (0, 0 -> "A1")
pub fn cell_reference(row: u32, col: u32) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// Columns in a worksheet (`A` through `XFD`)
pub const MAX_COLUMNS: u32 = 16_384;
/// Rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Parse a cell reference into zero-based column and one-based row ("B3" -> (1, 3))
///
/// The row is `None` when the reference carries only column letters. References beyond
/// `XFD` or row 1048576, or with a row of zero or trailing junk, are rejected.
pub fn parse_cell_reference(cell_ref: &str) -> Option<(u32, Option<u32>)> {
    let letters = cell_ref
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();
    if letters == 0 {
        return None;
    }

    let mut col = 0u32;
    for ch in cell_ref[..letters].bytes() {
        let digit = u32::from(ch.to_ascii_uppercase() - b'A' + 1);
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLUMNS {
            return None;
        }
    }

    let row = match &cell_ref[letters..] {
        "" => None,
        digits => match digits.parse::<u32>() {
            Ok(row) if (1..=MAX_ROWS).contains(&row) => Some(row),
            _ => return None,
        },
    };
    Some((col - 1, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_reference() {
        assert_eq!(cell_reference(0, 0), "A1");
        assert_eq!(cell_reference(0, 25), "Z1");
        assert_eq!(cell_reference(0, 26), "AA1");
        assert_eq!(cell_reference(9, 27), "AB10");
    }

    #[test]
    fn test_parse_cell_reference() {
        assert_eq!(parse_cell_reference("A1"), Some((0, Some(1))));
        assert_eq!(parse_cell_reference("AA12"), Some((26, Some(12))));
        assert_eq!(parse_cell_reference("c"), Some((2, None)));
        assert_eq!(parse_cell_reference("12"), None);
        assert_eq!(parse_cell_reference("XFD1048576"), Some((16_383, Some(1_048_576))));
    }

    #[test]
    fn test_parse_cell_reference_rejects_out_of_range() {
        assert_eq!(parse_cell_reference("ZZZZZZZZ2"), None);
        assert_eq!(parse_cell_reference("XFE1"), None);
        assert_eq!(parse_cell_reference("A1048577"), None);
        assert_eq!(parse_cell_reference("A0"), None);
        assert_eq!(parse_cell_reference("A4000000000"), None);
        assert_eq!(parse_cell_reference("B2x"), None);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42i64), Value::Number(42.0));
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::Number(30.0).as_string(), "30");
        assert_eq!(Value::Number(1234.56).as_string(), "1234.56");
        assert_eq!(Value::Text("true".to_string()).as_bool(), Some(true));

        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Value::from(d).as_string(), "2024-01-15");
    }

    #[test]
    fn test_record_set_alignment() {
        let rs: RecordSet = vec![
            Record::new().with("id", 1).with("name", "Alice"),
            Record::new().with("name", "Bob").with("extra", true),
        ]
        .into();

        assert_eq!(rs.headers(), vec!["id", "name"]);

        let rows: Vec<Vec<&Value>> = rs.aligned_rows().collect();
        assert_eq!(rows[0], vec![&Value::Number(1.0), &Value::from("Alice")]);
        // Missing field -> null, extra field ignored
        assert_eq!(rows[1], vec![&Value::Null, &Value::from("Bob")]);
    }

    #[test]
    fn test_write_outcome() {
        let empty = WriteOutcome::Empty(EMPTY_DELIMITED_MESSAGE);
        assert!(empty.is_empty());
        assert!(empty.into_bytes().is_none());

        let written = WriteOutcome::Written(Artifact {
            kind: ArtifactKind::Spreadsheet,
            bytes: vec![1, 2, 3],
        });
        assert_eq!(written.artifact().map(|a| a.kind.extension()), Some("xlsx"));
        assert_eq!(written.into_bytes(), Some(vec![1, 2, 3]));
    }
}
