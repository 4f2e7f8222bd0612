//! Record set to delimited UTF-8 text

use log::debug;

use crate::columns::{derive_columns, render_cell, validate_records};
use crate::csv::CsvEncoder;
use crate::error::Result;
use crate::options::{Delimiter, WriteOptions};
use crate::types::{Artifact, ArtifactKind, RecordSet, WriteOutcome, EMPTY_DELIMITED_MESSAGE};

/// Serialize `records` as delimited text with a header line
///
/// Nulls and empty strings become empty fields, dates are rendered with the column's
/// date format (or `options.date_format`) and everything else uses its textual form.
/// Fields containing the separator, a quote or a line break are quoted.
///
/// # Example
///
/// ```
/// use sheetcodec::{write_delimited, Delimiter, Record, RecordSet, WriteOptions};
///
/// let records: RecordSet = vec![Record::new().with("name", "Alice").with("age", 30)].into();
/// let outcome = write_delimited(&records, Delimiter::Semicolon, &WriteOptions::default())?;
/// assert_eq!(outcome.into_bytes().unwrap(), b"name;age\nAlice;30\n");
/// # Ok::<(), sheetcodec::CodecError>(())
/// ```
pub fn write_delimited(
    records: &RecordSet,
    delimiter: Delimiter,
    options: &WriteOptions,
) -> Result<WriteOutcome> {
    if records.is_empty() {
        debug!("Delimited write skipped: no records");
        return Ok(WriteOutcome::Empty(EMPTY_DELIMITED_MESSAGE));
    }

    options.validate()?;
    validate_records(records)?;

    let columns = derive_columns(records, &options.column_formats, &options.date_format);
    let encoder = CsvEncoder::new(delimiter);

    let mut buffer = Vec::with_capacity(records.len() * columns.len() * 8);
    encoder.encode_row(columns.iter().map(|c| c.name.as_str()), &mut buffer);

    for row in records.aligned_rows() {
        encoder.encode_row(
            row.into_iter()
                .zip(&columns)
                .map(|(value, c)| render_cell(value, c, &options.date_format)),
            &mut buffer,
        );
    }

    debug!(
        "Wrote {} delimited rows with '{}', {} bytes",
        records.len(),
        delimiter,
        buffer.len()
    );

    Ok(WriteOutcome::Written(Artifact {
        kind: ArtifactKind::Delimited(delimiter),
        bytes: buffer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ColumnFormat;
    use crate::types::{Record, Value};
    use chrono::NaiveDate;

    fn text(outcome: WriteOutcome) -> String {
        String::from_utf8(outcome.into_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_input_returns_sentinel() {
        let outcome =
            write_delimited(&RecordSet::new(), Delimiter::Comma, &WriteOptions::default()).unwrap();
        assert_eq!(outcome, WriteOutcome::Empty(EMPTY_DELIMITED_MESSAGE));
    }

    #[test]
    fn test_empty_input_ignores_bad_options() {
        let options = WriteOptions::default().with_date_format("");
        let outcome = write_delimited(&RecordSet::new(), Delimiter::Semicolon, &options).unwrap();
        assert_eq!(outcome, WriteOutcome::Empty(EMPTY_DELIMITED_MESSAGE));
    }

    #[test]
    fn test_text_column_keeps_later_dates() {
        let records: RecordSet = vec![
            Record::new().with("code", "A-1"),
            Record::new().with("code", "2024-01-15"),
        ]
        .into();
        let csv = text(write_delimited(&records, Delimiter::Comma, &WriteOptions::default()).unwrap());
        assert_eq!(csv, "code\nA-1\n2024-01-15\n");
    }

    #[test]
    fn test_cell_rendering() {
        let records: RecordSet = vec![
            Record::new()
                .with("id", "2024-01")
                .with("joined", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
                .with("count", 0)
                .with("ok", false)
                .with("note", Value::Null),
            Record::new()
                .with("id", "A/7")
                .with("joined", "2023-06-30")
                .with("count", 2.5)
                .with("ok", true)
                .with("note", "a, b"),
        ]
        .into();

        let csv = text(write_delimited(&records, Delimiter::Comma, &WriteOptions::default()).unwrap());
        assert_eq!(
            csv,
            "id,joined,count,ok,note\n\
             2024-01,01/15/2024,0,false,\n\
             A/7,06/30/2023,2.5,true,\"a, b\"\n"
        );
    }

    #[test]
    fn test_column_date_format_override() {
        let records: RecordSet = vec![Record::new().with("d", "2024-03-05")].into();
        let options = WriteOptions::default()
            .with_column_format("d", ColumnFormat::date().with_num_format("yyyy/mm/dd"));
        let csv = text(write_delimited(&records, Delimiter::Pipe, &options).unwrap());
        assert_eq!(csv, "d\n2024/03/05\n");
    }

    #[test]
    fn test_delimiters_only_move_separators() {
        let records: RecordSet = vec![Record::new().with("a", "x").with("b", 1)].into();
        let options = WriteOptions::default();

        let outputs: Vec<String> = Delimiter::ALL
            .iter()
            .map(|d| text(write_delimited(&records, *d, &options).unwrap()))
            .collect();
        assert_eq!(outputs, vec!["a,b\nx,1\n", "a;b\nx;1\n", "a|b\nx|1\n"]);
    }

    #[test]
    fn test_artifact_tagged_with_delimiter() {
        let records: RecordSet = vec![Record::new().with("a", 1)].into();
        let outcome = write_delimited(&records, Delimiter::Pipe, &WriteOptions::default()).unwrap();
        assert_eq!(
            outcome.artifact().unwrap().kind,
            ArtifactKind::Delimited(Delimiter::Pipe)
        );
    }
}
