//! Delimited text to record set
//!
//! The first non-empty line is the header. Every value comes back as [`Value::Text`];
//! no type coercion happens on read. Rows shorter than the header are padded with empty
//! strings and longer rows are truncated to the header width.

use std::path::Path;

use log::{debug, warn};

use crate::csv::CsvParser;
use crate::error::{CodecError, Result};
use crate::options::validate_delimiter_char;
use crate::types::{Record, RecordSet, Value};

/// Read a delimited text file
///
/// `delimiter` must be exactly one character (and not a quote or line break).
///
/// # Example
///
/// ```no_run
/// use sheetcodec::read_delimited;
///
/// let records = read_delimited("people.csv", ";")?;
/// println!("{} records", records.len());
/// # Ok::<(), sheetcodec::CodecError>(())
/// ```
pub fn read_delimited<P: AsRef<Path>>(path: P, delimiter: &str) -> Result<RecordSet> {
    let delimiter = validate_delimiter_char(delimiter)?;

    let path = path.as_ref();
    if !path.is_file() {
        return Err(CodecError::NotFound(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let context = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| CodecError::from(e).into_read_error(&context))?;
    parse_records(&bytes, delimiter, &context)
}

/// Read delimited text held in memory
pub fn read_delimited_bytes(bytes: &[u8], delimiter: &str) -> Result<RecordSet> {
    let delimiter = validate_delimiter_char(delimiter)?;
    parse_records(bytes, delimiter, "delimited buffer")
}

fn parse_records(bytes: &[u8], delimiter: char, context: &str) -> Result<RecordSet> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::ReadError(format!("{}: not valid UTF-8: {}", context, e)))?;

    let parser = CsvParser::new(delimiter, '"');
    let mut rows = parser.parse_document(text).into_iter();

    let Some(headers) = rows.next() else {
        debug!("{}: no header line, returning no records", context);
        return Ok(RecordSet::new());
    };

    let mut records = RecordSet::new();
    for (idx, fields) in rows.enumerate() {
        // Line numbers count the header as line 1
        let line = idx + 2;
        if fields.len() != headers.len() {
            warn!(
                "{}: row {} has {} fields, header has {}; {}",
                context,
                line,
                fields.len(),
                headers.len(),
                if fields.len() < headers.len() {
                    "padding with empty values"
                } else {
                    "dropping extra fields"
                }
            );
        }

        let mut fields = fields.into_iter();
        let record: Record = headers
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    Value::Text(fields.next().unwrap_or_default()),
                )
            })
            .collect();
        records.push(record);
    }

    debug!(
        "{}: read {} records with {} columns",
        context,
        records.len(),
        headers.len()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn texts(record: &Record) -> Vec<&str> {
        record.iter().map(|(_, v)| v.as_str().unwrap()).collect()
    }

    #[test]
    fn test_three_rows_two_columns() {
        let records = read_delimited_bytes(b"name,age\nAlice,30\nBob,25\nCara,41\n", ",").unwrap();
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "age"]);
            assert!(record.iter().all(|(_, v)| matches!(v, Value::Text(_))));
        }
        assert_eq!(texts(&records.records()[2]), vec!["Cara", "41"]);
    }

    #[test]
    fn test_ragged_rows() {
        let records = read_delimited_bytes(b"a;b;c\n1\n1;2;3;4\n", ";").unwrap();
        assert_eq!(texts(&records.records()[0]), vec!["1", "", ""]);
        assert_eq!(texts(&records.records()[1]), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_bom_quotes_and_blank_lines() {
        let input = "\u{feff}id|note\r\n\r\n1|\"multi\nline | text\"\r\n2|say \"hi\"\r\n";
        let records = read_delimited_bytes(input.as_bytes(), "|").unwrap();
        assert_eq!(records.headers(), vec!["id", "note"]);
        assert_eq!(records.len(), 2);
        assert_eq!(texts(&records.records()[0]), vec!["1", "multi\nline | text"]);
        assert_eq!(texts(&records.records()[1]), vec!["2", "say \"hi\""]);
    }

    #[test]
    fn test_no_coercion() {
        let records = read_delimited_bytes(b"d,n,b\n2024-01-15,3.5,true\n", ",").unwrap();
        assert_eq!(texts(&records.records()[0]), vec!["2024-01-15", "3.5", "true"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(read_delimited_bytes(b"", ",").unwrap().is_empty());
        assert!(read_delimited_bytes(b"a,b\n", ",").unwrap().is_empty());
    }

    #[test]
    fn test_delimiter_validation() {
        assert!(read_delimited_bytes(b"a", "").unwrap_err().is_validation());
        assert!(read_delimited_bytes(b"a", ",,").unwrap_err().is_validation());
    }

    #[test]
    fn test_file_paths() {
        let err = read_delimited("/definitely/not/here.csv", ",").unwrap_err();
        assert!(err.is_not_found());

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"x,y\n1,2\n").unwrap();
        let records = read_delimited(file.path(), ",").unwrap();
        assert_eq!(records.len(), 1);
    }
}
