//! Column metadata derivation
//!
//! Turns a record set plus optional explicit formats into one [`ColumnSpec`] per header.
//! This stage never fails: anything it cannot classify becomes text.

use crate::dates::format_date;
use crate::error::{CodecError, Result};
use crate::infer::{coerce_date, infer_column, resolve_cell};
use crate::options::ColumnFormat;
use crate::types::{ColumnSpec, ColumnType, RecordSet, TypeTag, Value};
use indexmap::IndexMap;

/// Narrowest column width before padding
pub const MIN_COLUMN_WIDTH: u32 = 10;
/// Padding added to every computed width
pub const COLUMN_PADDING: u32 = 2;

impl ColumnSpec {
    /// How `value` is stored in this column
    pub fn resolve(&self, value: &Value) -> TypeTag {
        resolve_cell(value, self.column_type, self.explicit)
    }

    /// Date format code for date cells in this column
    pub fn date_format<'a>(&'a self, default: &'a str) -> &'a str {
        match (&self.column_type, &self.format) {
            (ColumnType::Date, Some(fmt)) => fmt,
            _ => default,
        }
    }
}

/// Derive per-column serialization metadata
///
/// Headers come from the first record in insertion order. Each column's type is the
/// explicit override when present, otherwise the type of its first non-null sample.
pub fn derive_columns(
    records: &RecordSet,
    explicit: &IndexMap<String, ColumnFormat>,
    date_format: &str,
) -> Vec<ColumnSpec> {
    let headers = records.headers();

    headers
        .iter()
        .map(|&name| {
            let override_format = explicit.get(name);
            let column_type = match override_format {
                Some(f) => f.column_type,
                None => ColumnType::from(infer_column(records, name)),
            };
            let format = match (column_type, override_format) {
                (ColumnType::Date, Some(f)) => {
                    Some(f.num_format.clone().unwrap_or_else(|| date_format.to_string()))
                }
                (ColumnType::Date, None) => Some(date_format.to_string()),
                (_, Some(f)) => f.num_format.clone(),
                (_, None) => None,
            };

            let mut spec = ColumnSpec {
                name: name.to_string(),
                column_type,
                format,
                width: 0,
                explicit: override_format.is_some(),
            };
            spec.width = column_width(records, &spec, date_format);
            spec
        })
        .collect()
}

fn column_width(records: &RecordSet, spec: &ColumnSpec, default_date_format: &str) -> u32 {
    let date_format = spec.date_format(default_date_format);
    let header_len = spec.name.chars().count();

    let content_len = records
        .iter()
        .map(|r| {
            let value = r.get_or_null(&spec.name);
            match spec.resolve(value) {
                TypeTag::Date => date_format.chars().count() + 2,
                TypeTag::Null => 0,
                _ => value.as_string().chars().count(),
            }
        })
        .max()
        .unwrap_or(0);

    let longest = header_len.max(content_len) as u32;
    longest.max(MIN_COLUMN_WIDTH) + COLUMN_PADDING
}

/// Check record-set shape before anything is written
///
/// Every empty field name and non-finite number is reported, with its row.
pub fn validate_records(records: &RecordSet) -> Result<()> {
    let mut issues = Vec::new();
    for (row, record) in records.iter().enumerate() {
        for (name, value) in record.iter() {
            if name.is_empty() {
                issues.push(format!("records[{}]: field name must not be empty", row));
            }
            if let Value::Number(n) = value {
                if !n.is_finite() {
                    issues.push(format!("records[{}].{}: {} is not a finite number", row, name, n));
                }
            }
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CodecError::Validation { issues })
    }
}

/// Render one cell as delimited text
///
/// Null becomes empty, dates go through the column's date format, text is kept verbatim
/// and everything else uses its native textual form.
pub fn render_cell(value: &Value, spec: &ColumnSpec, default_date_format: &str) -> String {
    match spec.resolve(value) {
        TypeTag::Null => String::new(),
        TypeTag::Date => match coerce_date(value) {
            Some(dt) => format_date(&dt, spec.date_format(default_date_format)),
            None => value.as_string(),
        },
        TypeTag::Text => match value {
            Value::Text(s) => s.clone(),
            other => other.as_string(),
        },
        TypeTag::Number | TypeTag::Boolean => value.as_string(),
    }
}
