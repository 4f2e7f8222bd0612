//! xlsx bytes to record set
//!
//! The package is parsed with plain string scanning over the ZIP entries:
//! `workbook.xml` and its relationships locate the sheet, `sharedStrings.xml` resolves
//! text cells and `styles.xml` tells which numeric cells are dates.
//!
//! Cell decoding:
//! - shared, inline and formula-string cells become [`Value::Text`]
//! - numeric cells become [`Value::Number`], or [`Value::Date`] when their style carries a
//!   date format
//! - boolean cells become [`Value::Boolean`], error cells the error code as text
//! - formula cells yield their cached result; blank cells and formulas without a cached
//!   result yield [`Value::Null`]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::dates::{from_serial, is_builtin_date_format, is_date_format_code};
use crate::error::{CodecError, Result};
use crate::fast_writer::starts_escape_sequence;
use crate::options::SheetReadOptions;
use crate::types::{
    column_letter, parse_cell_reference, Record, RecordSet, Value, MAX_COLUMNS, MAX_ROWS,
};

/// Read the records of one sheet from an xlsx file
///
/// Row `options.header_row` supplies the field names; every row after it, up to the
/// sheet's last row, becomes a record keyed positionally against those names.
///
/// # Errors
/// - [`CodecError::Validation`] for bad options
/// - [`CodecError::NotFound`] when the file or sheet is missing, or the header row is empty
/// - [`CodecError::ReadError`] when the package is malformed
///
/// # Example
///
/// ```no_run
/// use sheetcodec::{read_spreadsheet, SheetReadOptions};
///
/// let records = read_spreadsheet("report.xlsx", &SheetReadOptions::new("Sheet1"))?;
/// for record in &records {
///     println!("{:?}", record.get("name"));
/// }
/// # Ok::<(), sheetcodec::CodecError>(())
/// ```
pub fn read_spreadsheet<P: AsRef<Path>>(path: P, options: &SheetReadOptions) -> Result<RecordSet> {
    options.validate()?;

    let path = path.as_ref();
    if !path.is_file() {
        return Err(CodecError::NotFound(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let context = path.display().to_string();
    let file = File::open(path).map_err(|e| CodecError::from(e).into_read_error(&context))?;
    read_sheet(file, options).map_err(|e| e.into_read_error(&context))
}

/// Read the records of one sheet from an in-memory xlsx package
pub fn read_spreadsheet_bytes(bytes: &[u8], options: &SheetReadOptions) -> Result<RecordSet> {
    options.validate()?;
    read_sheet(Cursor::new(bytes), options).map_err(|e| e.into_read_error("xlsx buffer"))
}

fn read_sheet<R: Read + Seek>(source: R, options: &SheetReadOptions) -> Result<RecordSet> {
    let mut package = Package::open(source)?;
    let sheet_path = package.sheet_path(&options.sheet_name)?;
    let shared_strings = package.shared_strings()?;
    let date_styles = package.date_styles()?;

    let sheet_xml = package
        .entry(&sheet_path)?
        .ok_or_else(|| CodecError::ReadError(format!("Missing worksheet part {}", sheet_path)))?;

    let rows = parse_rows(&sheet_xml, &shared_strings, &date_styles)?;
    let records = assemble_records(rows, options)?;

    debug!(
        "Read {} records from sheet '{}' (header row {})",
        records.len(),
        options.sheet_name,
        options.header_row
    );
    Ok(records)
}

/// Open ZIP package plus lookups shared by the parsing steps
struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    fn open(source: R) -> Result<Self> {
        let archive = ZipArchive::new(source)
            .map_err(|e| CodecError::ReadError(format!("Not a valid xlsx package: {}", e)))?;
        Ok(Package { archive })
    }

    /// Entry text, or `None` when the part is absent
    fn entry(&mut self, name: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(name) {
            Ok(f) => f,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut xml = String::new();
        file.read_to_string(&mut xml)
            .map_err(|e| CodecError::ReadError(format!("Failed to read {}: {}", name, e)))?;
        Ok(Some(xml))
    }

    /// Resolve a sheet name to its worksheet part through the workbook relationships
    fn sheet_path(&mut self, sheet_name: &str) -> Result<String> {
        let workbook = self
            .entry("xl/workbook.xml")?
            .ok_or_else(|| CodecError::ReadError("Missing xl/workbook.xml".to_string()))?;

        let mut available = Vec::new();
        let mut rel_id = None;
        for tag in tags(&workbook, "sheet") {
            let name = attribute(tag, "name").map(decode_xml_entities).unwrap_or_default();
            if name == sheet_name {
                rel_id = attribute(tag, "r:id").map(str::to_string);
            }
            available.push(name);
        }

        let Some(rel_id) = rel_id else {
            return Err(CodecError::NotFound(format!(
                "Sheet '{}' not found in the workbook (available: {})",
                sheet_name,
                available.join(", ")
            )));
        };

        let rels = self
            .entry("xl/_rels/workbook.xml.rels")?
            .ok_or_else(|| CodecError::ReadError("Missing workbook relationships".to_string()))?;

        let target = tags(&rels, "Relationship")
            .find(|tag| attribute(tag, "Id") == Some(rel_id.as_str()))
            .and_then(|tag| attribute(tag, "Target"))
            .ok_or_else(|| {
                CodecError::ReadError(format!("No relationship target for sheet '{}'", sheet_name))
            })?;

        // Targets are relative to xl/ unless absolute within the package
        Ok(match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        })
    }

    /// Shared string table; rich-text runs are concatenated
    fn shared_strings(&mut self) -> Result<Vec<String>> {
        let Some(xml) = self.entry("xl/sharedStrings.xml")? else {
            return Ok(Vec::new());
        };

        let mut strings = Vec::new();
        let mut pos = 0;
        while let Some(start) = find_tag(&xml[pos..], "si") {
            let start = pos + start;
            let Some(len) = xml[start..].find('>') else {
                break;
            };
            if xml[start..start + len].ends_with('/') {
                strings.push(String::new());
                pos = start + len + 1;
                continue;
            }
            let end = match xml[start..].find("</si>") {
                Some(end) => start + end + 5,
                None => break,
            };
            strings.push(text_runs(&xml[start..end]));
            pos = end;
        }
        Ok(strings)
    }

    /// For each cell style index, whether it displays a date
    fn date_styles(&mut self) -> Result<Vec<bool>> {
        let Some(xml) = self.entry("xl/styles.xml")? else {
            return Ok(Vec::new());
        };

        let custom: BTreeMap<u32, String> = section(&xml, "numFmts")
            .map(|numfmts| {
                tags(numfmts, "numFmt")
                    .filter_map(|tag| {
                        let id = attribute(tag, "numFmtId")?.parse::<u32>().ok()?;
                        let code = decode_xml_entities(attribute(tag, "formatCode")?);
                        Some((id, code))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let styles: Vec<bool> = section(&xml, "cellXfs")
            .map(|xfs| {
                tags(xfs, "xf")
                    .map(|tag| {
                        let id: u32 = attribute(tag, "numFmtId")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        match custom.get(&id) {
                            Some(code) => is_date_format_code(code),
                            None => is_builtin_date_format(id),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(styles)
    }
}

/// Parse `<row>` elements into sparse rows keyed by one-based row number
fn parse_rows(
    xml: &str,
    shared_strings: &[String],
    date_styles: &[bool],
) -> Result<BTreeMap<u32, Vec<Value>>> {
    let mut rows = BTreeMap::new();
    let mut last_row = 0u32;
    let mut pos = 0;

    while let Some(start) = find_tag(&xml[pos..], "row") {
        let start = pos + start;
        let open_end = xml[start..]
            .find('>')
            .map(|i| start + i)
            .ok_or_else(|| CodecError::ReadError("Unterminated <row> tag".to_string()))?;
        let open_tag = &xml[start..=open_end];

        let row_num = match attribute(open_tag, "r") {
            Some(r) => r
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_ROWS).contains(n))
                .ok_or_else(|| CodecError::ReadError(format!("Invalid row number '{}'", r)))?,
            None if last_row < MAX_ROWS => last_row + 1,
            None => {
                return Err(CodecError::ReadError(format!(
                    "Sheet has more than {} rows",
                    MAX_ROWS
                )))
            }
        };
        last_row = row_num;

        if open_tag.ends_with("/>") {
            rows.entry(row_num).or_insert_with(Vec::new);
            pos = open_end + 1;
            continue;
        }

        let close = xml[open_end..]
            .find("</row>")
            .map(|i| open_end + i)
            .ok_or_else(|| CodecError::ReadError(format!("Unterminated row {}", row_num)))?;

        let cells = parse_cells(&xml[open_end + 1..close], shared_strings, date_styles)?;
        rows.insert(row_num, cells);
        pos = close + 6;
    }

    Ok(rows)
}

/// Decode the cells of one row into a dense, column-indexed vector
fn parse_cells(
    row_xml: &str,
    shared_strings: &[String],
    date_styles: &[bool],
) -> Result<Vec<Value>> {
    let mut cells: Vec<Value> = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_tag(&row_xml[pos..], "c") {
        let start = pos + start;
        let Some(open_len) = row_xml[start..].find('>') else {
            break;
        };
        let open_end = start + open_len;
        let open_tag = &row_xml[start..=open_end];

        let (body, next) = if open_tag.ends_with("/>") {
            ("", open_end + 1)
        } else {
            match row_xml[open_end..].find("</c>") {
                Some(i) => (&row_xml[open_end + 1..open_end + i], open_end + i + 4),
                None => break,
            }
        };
        pos = next;

        let col = match attribute(open_tag, "r") {
            Some(r) => parse_cell_reference(r)
                .map(|(col, _)| col as usize)
                .ok_or_else(|| CodecError::ReadError(format!("Invalid cell reference '{}'", r)))?,
            None if cells.len() < MAX_COLUMNS as usize => cells.len(),
            None => {
                return Err(CodecError::ReadError(format!(
                    "Row has more than {} cells",
                    MAX_COLUMNS
                )))
            }
        };

        let value = decode_cell(open_tag, body, shared_strings, date_styles);
        if cells.len() <= col {
            cells.resize(col + 1, Value::Null);
        }
        cells[col] = value;
    }

    Ok(cells)
}

fn decode_cell(open_tag: &str, body: &str, shared_strings: &[String], date_styles: &[bool]) -> Value {
    let cell_type = attribute(open_tag, "t").unwrap_or("n");

    if cell_type == "inlineStr" {
        return match section(body, "is") {
            Some(is) => Value::Text(text_runs(is)),
            None => Value::Null,
        };
    }

    // Formula cells carry their cached result in <v>; without one the cell is unresolved
    let Some(raw) = element_text(body, "v") else {
        return Value::Null;
    };

    match cell_type {
        "s" => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .map(|s| Value::Text(s.clone()))
            .unwrap_or(Value::Null),
        "b" => Value::Boolean(raw.trim() == "1"),
        "e" | "str" => Value::Text(decode_xml_entities(raw)),
        _ => {
            let Ok(number) = raw.trim().parse::<f64>() else {
                return Value::Text(decode_xml_entities(raw));
            };
            let is_date = attribute(open_tag, "s")
                .and_then(|s| s.parse::<usize>().ok())
                .and_then(|idx| date_styles.get(idx).copied())
                .unwrap_or(false);
            match (is_date, from_serial(number)) {
                (true, Some(dt)) => Value::Date(dt),
                _ => Value::Number(number),
            }
        }
    }
}

/// Turn sparse sheet rows into records using the configured header row
fn assemble_records(
    mut rows: BTreeMap<u32, Vec<Value>>,
    options: &SheetReadOptions,
) -> Result<RecordSet> {
    let header_cells = rows.remove(&options.header_row).unwrap_or_default();

    // Trailing blank header cells do not define columns
    let width = header_cells
        .iter()
        .rposition(|v| !v.is_null())
        .map(|i| i + 1)
        .unwrap_or(0);

    if width == 0 {
        return Err(CodecError::NotFound(format!(
            "No headers found in row {} of sheet '{}'",
            options.header_row, options.sheet_name
        )));
    }

    // Blank cells inside the header range are named after their column
    let headers: Vec<String> = header_cells[..width]
        .iter()
        .enumerate()
        .map(|(idx, v)| {
            if v.is_null() {
                column_letter(idx as u32)
            } else {
                v.as_string()
            }
        })
        .collect();

    let last_row = rows.keys().next_back().copied().unwrap_or(0);
    let mut records = RecordSet::new();

    for row_num in options.header_row.saturating_add(1)..=last_row {
        let cells = rows.remove(&row_num).unwrap_or_default();
        let mut cells = cells.into_iter();
        let record: Record = headers
            .iter()
            .map(|name| (name.clone(), cells.next().unwrap_or(Value::Null)))
            .collect();
        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Minimal XML scanning helpers

/// Byte offset of the next `<name` start tag (not a longer tag name sharing the prefix)
fn find_tag(xml: &str, name: &str) -> Option<usize> {
    let pattern = format!("<{}", name);
    let mut pos = 0;
    while let Some(i) = xml[pos..].find(&pattern) {
        let at = pos + i;
        let after = xml[at + pattern.len()..].chars().next();
        if matches!(after, Some(' ' | '>' | '/' | '\t' | '\n' | '\r')) {
            return Some(at);
        }
        pos = at + pattern.len();
    }
    None
}

/// Iterate over the opening tags `<name ...>` in `xml`
fn tags<'a>(xml: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let start = pos + find_tag(&xml[pos..], name)?;
        let end = start + xml[start..].find('>')? + 1;
        pos = end;
        Some(&xml[start..end])
    })
}

/// Content between `<name ...>` and `</name>`
fn section<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let start = find_tag(xml, name)?;
    let open_end = start + xml[start..].find('>')?;
    if xml[..=open_end].ends_with("/>") {
        return Some("");
    }
    let close = format!("</{}>", name);
    let end = open_end + xml[open_end..].find(&close)?;
    Some(&xml[open_end + 1..end])
}

/// Raw (still escaped) text of the first `<name>` element
fn element_text<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    section(xml, name)
}

/// Value of attribute `name` in an opening tag
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut pos = 0;
    let pattern = format!("{}=", name);
    while let Some(i) = tag[pos..].find(&pattern) {
        let at = pos + i;
        let preceded_by_space = tag[..at].ends_with(|c: char| c.is_ascii_whitespace());
        let value_start = at + pattern.len();
        let quote = tag[value_start..].chars().next();
        if preceded_by_space {
            if let Some(q @ ('"' | '\'')) = quote {
                let rest = &tag[value_start + 1..];
                return rest.find(q).map(|end| &rest[..end]);
            }
        }
        pos = value_start;
    }
    None
}

/// Concatenated text of every `<t>` run, skipping phonetic hints
fn text_runs(xml: &str) -> String {
    let mut out = String::new();
    let mut pos = 0;
    while let Some(start) = find_tag(&xml[pos..], "t") {
        let start = pos + start;
        // <rPh> runs carry pronunciation guides, not cell text
        if let Some(rph) = find_tag(&xml[pos..start], "rPh") {
            let rph = pos + rph;
            match xml[rph..].find("</rPh>") {
                Some(end) => {
                    pos = rph + end + 6;
                    continue;
                }
                None => break,
            }
        }
        let Some(open_len) = xml[start..].find('>') else {
            break;
        };
        let open_end = start + open_len;
        if xml[..=open_end].ends_with("/>") {
            pos = open_end + 1;
            continue;
        }
        let Some(close) = xml[open_end..].find("</t>") else {
            break;
        };
        let text = decode_xml_entities(&xml[open_end + 1..open_end + close]);
        out.push_str(&decode_escaped_chars(&text));
        pos = open_end + close + 4;
    }
    out
}

/// Decode `_xHHHH_` sequences, the form cell text uses for characters XML cannot carry
fn decode_escaped_chars(text: &str) -> String {
    if !text.contains("_x") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find("_x") {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let decoded = starts_escape_sequence(rest)
            .then(|| u32::from_str_radix(&rest[2..6], 16).ok())
            .flatten()
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[7..];
            }
            None => {
                out.push('_');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the predefined XML entities and numeric character references
fn decode_xml_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
