//! In-memory single-sheet workbook with ZIP compression

use std::io::{Cursor, Write};

use chrono::Utc;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use super::shared_strings::SharedStrings;
use super::styles::{StyleTable, DEFAULT_STYLE, HEADER_STYLE};
use super::xml_writer::XmlWriter;
use crate::error::{CodecError, Result};
use crate::options::HeaderStyle;
use crate::types::{cell_reference, column_letter};

/// Cell payload accepted by [`WorkbookBuilder::write_row`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellData<'a> {
    /// Nothing is written for the cell
    Blank,
    /// Stored through the shared string table, verbatim
    Text(&'a str),
    /// Stored as a numeric cell; dates arrive here as serial numbers
    Number(f64),
    Boolean(bool),
}

/// A cell value plus the style index it is rendered with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyledCell<'a> {
    pub data: CellData<'a>,
    pub style: u32,
}

impl<'a> StyledCell<'a> {
    pub fn new(data: CellData<'a>, style: u32) -> Self {
        StyledCell { data, style }
    }

    pub fn plain(data: CellData<'a>) -> Self {
        StyledCell {
            data,
            style: DEFAULT_STYLE,
        }
    }
}

/// Builds a one-worksheet xlsx package into a byte buffer
///
/// Column widths must be set before the first row. The package parts that depend on
/// the whole sheet (shared strings, styles, workbook) are emitted by [`finish`].
///
/// [`finish`]: WorkbookBuilder::finish
pub struct WorkbookBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    sheet_name: String,
    shared_strings: SharedStrings,
    styles: StyleTable,
    current_row: u32,
    xml_buffer: Vec<u8>,         // Reusable buffer for row XML
    cell_ref_cache: Vec<String>, // Column letters for the first columns (A, B, C, ...)
    numbers: itoa::Buffer,

    column_widths: Vec<(u32, f64)>,
    autofilter: Option<(u32, u32)>, // first and last column of the header range
    sheet_data_started: bool,
}

impl WorkbookBuilder {
    /// Start a workbook holding a single worksheet named `sheet_name`
    pub fn new(sheet_name: &str, header_style: HeaderStyle) -> Result<Self> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(16 * 1024)));

        zip.start_file("[Content_Types].xml", Self::file_options())?;
        Self::write_content_types(&mut zip)?;

        zip.start_file("_rels/.rels", Self::file_options())?;
        Self::write_root_rels(&mut zip)?;

        zip.start_file("docProps/core.xml", Self::file_options())?;
        Self::write_core_props(&mut zip)?;

        zip.start_file("docProps/app.xml", Self::file_options())?;
        Self::write_app_props(&mut zip)?;

        // Worksheet header only; <cols> and <sheetData> follow on the first row
        zip.start_file("xl/worksheets/sheet1.xml", Self::file_options())?;
        {
            let mut xml_writer = XmlWriter::new(&mut zip);
            xml_writer.declaration()?;
            xml_writer.start_element("worksheet")?;
            xml_writer.attribute(
                "xmlns",
                "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
            )?;
            xml_writer.attribute(
                "xmlns:r",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
            )?;
            xml_writer.close_start_tag()?;
            xml_writer.flush()?;
        }

        let cell_ref_cache = (0..64).map(column_letter).collect();

        Ok(WorkbookBuilder {
            zip,
            sheet_name: sheet_name.to_string(),
            shared_strings: SharedStrings::new(),
            styles: StyleTable::new(header_style),
            current_row: 0,
            xml_buffer: Vec::with_capacity(8192),
            cell_ref_cache,
            numbers: itoa::Buffer::new(),
            column_widths: Vec::new(),
            autofilter: None,
            sheet_data_started: false,
        })
    }

    fn file_options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6))
    }

    /// Set the width of a zero-based column, in character units
    ///
    /// # Errors
    /// Returns a serialization error once rows have been written.
    pub fn set_column_width(&mut self, col: u32, width: f64) -> Result<()> {
        if self.sheet_data_started {
            return Err(CodecError::Serialization {
                stage: "setting column widths",
                message: "column widths must be set before the first row".to_string(),
            });
        }
        match self.column_widths.iter_mut().find(|(c, _)| *c == col) {
            Some(entry) => entry.1 = width,
            None => self.column_widths.push((col, width)),
        }
        Ok(())
    }

    /// Mark the header row across columns `first..=last` as a filterable range
    pub fn set_autofilter(&mut self, first_col: u32, last_col: u32) {
        self.autofilter = Some((first_col, last_col));
    }

    /// Style index for cells displayed with the number format `code`
    pub fn number_format_style(&mut self, code: &str) -> u32 {
        self.styles.number_format_style(code)
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> u32 {
        self.current_row
    }

    fn ensure_sheet_data_started(&mut self) -> Result<()> {
        if self.sheet_data_started {
            return Ok(());
        }

        let mut xml_writer = XmlWriter::new(&mut self.zip);

        if !self.column_widths.is_empty() {
            xml_writer.start_element("cols")?;
            xml_writer.close_start_tag()?;

            let mut cols = self.column_widths.clone();
            cols.sort_by_key(|(col, _)| *col);

            for (col, width) in cols {
                xml_writer.start_element("col")?;
                xml_writer.attribute_int("min", col + 1)?;
                xml_writer.attribute_int("max", col + 1)?;
                xml_writer.attribute("width", &width.to_string())?;
                xml_writer.attribute("customWidth", "1")?;
                xml_writer.close_empty()?;
            }

            xml_writer.end_element("cols")?;
        }

        xml_writer.start_element("sheetData")?;
        xml_writer.close_start_tag()?;
        xml_writer.flush()?;

        self.sheet_data_started = true;
        Ok(())
    }

    /// Write the header row with the header style
    pub fn write_header<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let cells: Vec<StyledCell<'_>> = names
            .iter()
            .map(|n| StyledCell::new(CellData::Text(n.as_ref()), HEADER_STYLE))
            .collect();
        self.write_row(&cells)
    }

    /// Write the next row; blank cells are skipped
    pub fn write_row(&mut self, cells: &[StyledCell<'_>]) -> Result<()> {
        self.ensure_sheet_data_started()?;

        self.current_row += 1;
        let row_num = self.current_row;

        self.xml_buffer.clear();
        self.xml_buffer.extend_from_slice(b"<row r=\"");
        self.xml_buffer
            .extend_from_slice(self.numbers.format(row_num).as_bytes());
        self.xml_buffer.extend_from_slice(b"\">");

        for (col_idx, cell) in cells.iter().enumerate() {
            let (type_attr, value): (&[u8], String) = match cell.data {
                CellData::Blank => continue,
                CellData::Text(s) => {
                    let idx = self.shared_strings.add_string(s);
                    (b" t=\"s\"".as_slice(), self.numbers.format(idx).to_string())
                }
                CellData::Number(n) => {
                    if !n.is_finite() {
                        return Err(CodecError::Serialization {
                            stage: "writing cells",
                            message: format!(
                                "non-finite number in cell {}",
                                cell_reference(row_num - 1, col_idx as u32)
                            ),
                        });
                    }
                    (b"".as_slice(), n.to_string())
                }
                CellData::Boolean(b) => (b" t=\"b\"".as_slice(), if b { "1" } else { "0" }.to_string()),
            };

            self.xml_buffer.extend_from_slice(b"<c r=\"");
            match self.cell_ref_cache.get(col_idx) {
                Some(letters) => self.xml_buffer.extend_from_slice(letters.as_bytes()),
                None => self
                    .xml_buffer
                    .extend_from_slice(column_letter(col_idx as u32).as_bytes()),
            }
            self.xml_buffer
                .extend_from_slice(self.numbers.format(row_num).as_bytes());
            self.xml_buffer.extend_from_slice(b"\"");
            if cell.style != DEFAULT_STYLE {
                self.xml_buffer.extend_from_slice(b" s=\"");
                self.xml_buffer
                    .extend_from_slice(self.numbers.format(cell.style).as_bytes());
                self.xml_buffer.extend_from_slice(b"\"");
            }
            self.xml_buffer.extend_from_slice(type_attr);
            self.xml_buffer.extend_from_slice(b"><v>");
            self.xml_buffer.extend_from_slice(value.as_bytes());
            self.xml_buffer.extend_from_slice(b"</v></c>");
        }

        self.xml_buffer.extend_from_slice(b"</row>");
        self.zip.write_all(&self.xml_buffer)?;

        Ok(())
    }

    fn finish_worksheet(&mut self) -> Result<()> {
        self.ensure_sheet_data_started()?;

        let mut xml_writer = XmlWriter::new(&mut self.zip);
        xml_writer.end_element("sheetData")?;

        if let Some((first, last)) = self.autofilter {
            xml_writer.start_element("autoFilter")?;
            xml_writer.attribute(
                "ref",
                &format!("{}1:{}1", column_letter(first), column_letter(last)),
            )?;
            xml_writer.close_empty()?;
        }

        xml_writer.end_element("worksheet")?;
        xml_writer.flush()
    }

    /// Close the package and return its bytes
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.finish_worksheet()?;

        self.zip
            .start_file("xl/sharedStrings.xml", Self::file_options())?;
        self.shared_strings
            .write_xml(&mut XmlWriter::new(&mut self.zip))?;

        self.zip.start_file("xl/workbook.xml", Self::file_options())?;
        self.write_workbook_xml()?;

        self.zip
            .start_file("xl/_rels/workbook.xml.rels", Self::file_options())?;
        Self::write_workbook_rels(&mut self.zip)?;

        self.zip.start_file("xl/styles.xml", Self::file_options())?;
        self.styles.write_xml(&mut XmlWriter::new(&mut self.zip))?;

        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn write_content_types<W: Write>(writer: &mut W) -> Result<()> {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write>(writer: &mut W) -> Result<()> {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_core_props<W: Write>(writer: &mut W) -> Result<()> {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let mut xml_writer = XmlWriter::new(writer);
        xml_writer.declaration()?;
        xml_writer.write_str("<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">")?;
        xml_writer.text_element("dc:creator", "sheetcodec")?;
        xml_writer.write_str("<dcterms:created xsi:type=\"dcterms:W3CDTF\">")?;
        xml_writer.write_str(&now)?;
        xml_writer.write_str("</dcterms:created><dcterms:modified xsi:type=\"dcterms:W3CDTF\">")?;
        xml_writer.write_str(&now)?;
        xml_writer.write_str("</dcterms:modified></cp:coreProperties>")?;
        xml_writer.flush()
    }

    fn write_app_props<W: Write>(writer: &mut W) -> Result<()> {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>sheetcodec</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
</Properties>"#;
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml(&mut self) -> Result<()> {
        let mut xml_writer = XmlWriter::new(&mut self.zip);

        xml_writer.declaration()?;
        xml_writer.start_element("workbook")?;
        xml_writer.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml_writer.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml_writer.close_start_tag()?;

        xml_writer.write_str("<sheets>")?;
        xml_writer.start_element("sheet")?;
        xml_writer.attribute("name", &self.sheet_name)?;
        xml_writer.attribute("sheetId", "1")?;
        xml_writer.attribute("r:id", "rId1")?;
        xml_writer.close_empty()?;
        xml_writer.write_str("</sheets>")?;

        // Filter ranges are tied to a hidden workbook-level name
        if let Some((first, last)) = self.autofilter {
            xml_writer.write_str("<definedNames>")?;
            xml_writer.write_str(
                "<definedName name=\"_xlnm._FilterDatabase\" localSheetId=\"0\" hidden=\"1\">",
            )?;
            let range = format!(
                "'{}'!${}$1:${}$1",
                self.sheet_name.replace('\'', "''"),
                column_letter(first),
                column_letter(last)
            );
            xml_writer.write_escaped(&range)?;
            xml_writer.write_str("</definedName></definedNames>")?;
        }

        xml_writer.end_element("workbook")?;
        xml_writer.flush()
    }

    fn write_workbook_rels<W: Write>(writer: &mut W) -> Result<()> {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_workbook_parts() -> Result<()> {
        let mut workbook = WorkbookBuilder::new("People", HeaderStyle::default())?;
        workbook.set_column_width(0, 12.0)?;
        workbook.set_autofilter(0, 1);
        let date_style = workbook.number_format_style("yyyy-mm-dd");

        workbook.write_header(&["Name", "Joined"])?;
        workbook.write_row(&[
            StyledCell::plain(CellData::Text("Alice")),
            StyledCell::new(CellData::Number(45306.0), date_style),
        ])?;
        workbook.write_row(&[
            StyledCell::plain(CellData::Blank),
            StyledCell::plain(CellData::Boolean(true)),
        ])?;
        assert_eq!(workbook.rows_written(), 3);

        let bytes = workbook.finish()?;
        assert_eq!(&bytes[..2], b"PK");

        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<col min=\"1\" max=\"1\" width=\"12\" customWidth=\"1\"/>"));
        assert!(sheet.contains("<c r=\"A1\" s=\"1\" t=\"s\"><v>0</v></c>"));
        assert!(sheet.contains("<c r=\"B2\" s=\"2\"><v>45306</v></c>"));
        assert!(sheet.contains("<row r=\"3\"><c r=\"B3\" t=\"b\"><v>1</v></c></row>"));
        assert!(sheet.contains("</sheetData><autoFilter ref=\"A1:B1\"/></worksheet>"));

        let workbook_xml = part(&bytes, "xl/workbook.xml");
        assert!(workbook_xml.contains("name=\"People\""));
        assert!(workbook_xml.contains("&apos;People&apos;!$A$1:$B$1"));
        Ok(())
    }

    #[test]
    fn test_column_width_after_rows() -> Result<()> {
        let mut workbook = WorkbookBuilder::new("Sheet1", HeaderStyle::default())?;
        workbook.write_header(&["a"])?;
        assert!(workbook.set_column_width(0, 10.0).is_err());
        Ok(())
    }

    #[test]
    fn test_non_finite_number_rejected() -> Result<()> {
        let mut workbook = WorkbookBuilder::new("Sheet1", HeaderStyle::default())?;
        let err = workbook
            .write_row(&[
                StyledCell::plain(CellData::Blank),
                StyledCell::plain(CellData::Number(f64::NAN)),
            ])
            .unwrap_err();
        assert!(matches!(err, CodecError::Serialization { .. }));
        assert!(err.to_string().contains("cell B1"));
        Ok(())
    }
}
