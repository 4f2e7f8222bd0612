//! Record set to xlsx bytes
//!
//! One worksheet per call. Date cells are stored as serial numbers carrying a date
//! number format so spreadsheet clients can sort and filter them; text is stored
//! verbatim through the shared string table.

use std::borrow::Cow;

use log::debug;

use crate::columns::{derive_columns, validate_records};
use crate::dates::to_serial;
use crate::error::Result;
use crate::fast_writer::{CellData, StyledCell, WorkbookBuilder, DEFAULT_STYLE};
use crate::infer::coerce_date;
use crate::options::WriteOptions;
use crate::types::{
    Artifact, ArtifactKind, ColumnSpec, ColumnType, RecordSet, TypeTag, Value, WriteOutcome,
    EMPTY_SPREADSHEET_MESSAGE,
};

/// Serialize `records` into an xlsx package
///
/// Returns [`WriteOutcome::Empty`] for an empty record set, whatever the options. Otherwise
/// options and record shape are validated before anything is built; any later fault is reported as
/// [`CodecError::Serialization`](crate::CodecError::Serialization) and no bytes escape.
///
/// # Example
///
/// ```
/// use sheetcodec::{write_spreadsheet, Record, RecordSet, WriteOptions};
///
/// let records: RecordSet = vec![
///     Record::new().with("name", "Alice").with("age", 30),
///     Record::new().with("name", "Bob").with("age", 25),
/// ]
/// .into();
///
/// let outcome = write_spreadsheet(&records, &WriteOptions::default())?;
/// let bytes = outcome.into_bytes().expect("non-empty input");
/// assert_eq!(&bytes[..2], b"PK");
/// # Ok::<(), sheetcodec::CodecError>(())
/// ```
pub fn write_spreadsheet(records: &RecordSet, options: &WriteOptions) -> Result<WriteOutcome> {
    if records.is_empty() {
        debug!("Spreadsheet write skipped: no records");
        return Ok(WriteOutcome::Empty(EMPTY_SPREADSHEET_MESSAGE));
    }

    options.validate()?;
    validate_records(records)?;

    let columns = derive_columns(records, &options.column_formats, &options.date_format);
    let bytes = build_workbook(records, &columns, options)
        .map_err(|e| e.into_serialization("building the workbook"))?;

    debug!(
        "Wrote sheet '{}': {} rows x {} columns, {} bytes",
        options.sheet_name,
        records.len(),
        columns.len(),
        bytes.len()
    );

    Ok(WriteOutcome::Written(Artifact {
        kind: ArtifactKind::Spreadsheet,
        bytes,
    }))
}

/// Cell content resolved for one row before it is borrowed into [`CellData`]
enum Prepared<'r> {
    Blank,
    Text(Cow<'r, str>),
    Number(f64, u32),
    Boolean(bool, u32),
}

/// Style indices registered for one column, filled on first use
#[derive(Default, Clone, Copy)]
struct ColumnStyles {
    date: Option<u32>,
    value: Option<u32>,
}

fn build_workbook(
    records: &RecordSet,
    columns: &[ColumnSpec],
    options: &WriteOptions,
) -> Result<Vec<u8>> {
    let mut workbook = WorkbookBuilder::new(&options.sheet_name, options.header_style.clone())?;

    for (idx, column) in columns.iter().enumerate() {
        workbook.set_column_width(idx as u32, column.width as f64)?;
    }
    if !columns.is_empty() {
        workbook.set_autofilter(0, columns.len() as u32 - 1);
    }

    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    workbook.write_header(&names)?;

    let mut styles = vec![ColumnStyles::default(); columns.len()];
    let mut prepared: Vec<Prepared<'_>> = Vec::with_capacity(columns.len());

    for row in records.aligned_rows() {
        prepared.clear();
        for (idx, (value, column)) in row.into_iter().zip(columns).enumerate() {
            let cell = prepare_cell(
                value,
                column,
                &mut styles[idx],
                &mut workbook,
                &options.date_format,
            );
            prepared.push(cell);
        }

        let cells: Vec<StyledCell<'_>> = prepared
            .iter()
            .map(|p| match p {
                Prepared::Blank => StyledCell::plain(CellData::Blank),
                Prepared::Text(s) => StyledCell::plain(CellData::Text(s)),
                Prepared::Number(n, style) => StyledCell::new(CellData::Number(*n), *style),
                Prepared::Boolean(b, style) => StyledCell::new(CellData::Boolean(*b), *style),
            })
            .collect();
        workbook.write_row(&cells)?;
    }

    debug!(
        "Worksheet '{}' holds {} rows including the header",
        options.sheet_name,
        workbook.rows_written()
    );
    workbook.finish()
}

fn prepare_cell<'r>(
    value: &'r Value,
    column: &ColumnSpec,
    styles: &mut ColumnStyles,
    workbook: &mut WorkbookBuilder,
    default_date_format: &str,
) -> Prepared<'r> {
    match column.resolve(value) {
        TypeTag::Null => Prepared::Blank,
        TypeTag::Date => match coerce_date(value) {
            Some(dt) => {
                let style = *styles.date.get_or_insert_with(|| {
                    workbook.number_format_style(column.date_format(default_date_format))
                });
                Prepared::Number(to_serial(&dt), style)
            }
            None => Prepared::Text(Cow::Owned(value.as_string())),
        },
        TypeTag::Number => match value.as_f64() {
            Some(n) => Prepared::Number(n, value_style(column, styles, workbook)),
            None => Prepared::Text(Cow::Owned(value.as_string())),
        },
        TypeTag::Boolean => match value.as_bool() {
            Some(b) => Prepared::Boolean(b, value_style(column, styles, workbook)),
            None => Prepared::Text(Cow::Owned(value.as_string())),
        },
        TypeTag::Text => match value {
            Value::Text(s) => Prepared::Text(Cow::Borrowed(s)),
            other => Prepared::Text(Cow::Owned(other.as_string())),
        },
    }
}

/// Style for non-date cells: the column's number format, if it carries one
fn value_style(column: &ColumnSpec, styles: &mut ColumnStyles, workbook: &mut WorkbookBuilder) -> u32 {
    match (&column.format, column.column_type) {
        (Some(code), ColumnType::Number | ColumnType::Text) => {
            *styles
                .value
                .get_or_insert_with(|| workbook.number_format_style(code))
        }
        _ => DEFAULT_STYLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ColumnFormat;
    use crate::types::Record;
    use chrono::NaiveDate;
    use std::io::{Cursor, Read};

    fn sheet_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("xl/worksheets/sheet1.xml").unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_empty_input_returns_sentinel() {
        let outcome = write_spreadsheet(&RecordSet::new(), &WriteOptions::default()).unwrap();
        assert_eq!(outcome, WriteOutcome::Empty(EMPTY_SPREADSHEET_MESSAGE));
    }

    #[test]
    fn test_empty_input_ignores_bad_options() {
        let options = WriteOptions::default().with_sheet_name("bad/name");
        let outcome = write_spreadsheet(&RecordSet::new(), &options).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let records: RecordSet = vec![Record::new().with("a", 1)].into();
        let options = WriteOptions::default().with_sheet_name("bad/name");
        let err = write_spreadsheet(&records, &options).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_cells_are_typed() {
        let records: RecordSet = vec![Record::new()
            .with("id", "2024-01")
            .with("joined", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .with("score", 91.5)
            .with("active", true)
            .with("note", Value::Null)]
        .into();

        let outcome = write_spreadsheet(&records, &WriteOptions::default()).unwrap();
        let artifact = outcome.artifact().unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Spreadsheet);

        let xml = sheet_xml(&artifact.bytes);
        // Header "id" and the text "2024-01" are both shared strings
        assert!(xml.contains("<c r=\"A2\" t=\"s\"><v>5</v></c>"));
        // Date stored as a serial with the date style
        assert!(xml.contains("<c r=\"B2\" s=\"2\"><v>45306</v></c>"));
        assert!(xml.contains("<c r=\"C2\"><v>91.5</v></c>"));
        assert!(xml.contains("<c r=\"D2\" t=\"b\"><v>1</v></c>"));
        assert!(!xml.contains("r=\"E2\""));
        assert!(xml.contains("<autoFilter ref=\"A1:E1\"/>"));
    }

    #[test]
    fn test_number_override_applies_format() {
        let records: RecordSet = vec![Record::new().with("amount", "1200.5")].into();
        let options = WriteOptions::default().with_column_format(
            "amount",
            ColumnFormat::number().with_num_format("#,##0.00"),
        );

        let bytes = write_spreadsheet(&records, &options)
            .unwrap()
            .into_bytes()
            .unwrap();
        assert!(sheet_xml(&bytes).contains("<c r=\"A2\" s=\"2\"><v>1200.5</v></c>"));
    }

    #[test]
    fn test_text_column_stores_later_dates_verbatim() {
        let records: RecordSet = vec![
            Record::new().with("code", "A-1"),
            Record::new().with("code", "2024-01-15"),
        ]
        .into();

        let bytes = write_spreadsheet(&records, &WriteOptions::default())
            .unwrap()
            .into_bytes()
            .unwrap();
        let xml = sheet_xml(&bytes);
        assert!(xml.contains("<c r=\"A3\" t=\"s\">"));
        assert!(!xml.contains("45306"));
    }
}
