//! Style sheet: header style plus one cell format per distinct number format

use super::xml_writer::XmlWriter;
use crate::error::Result;
use crate::options::HeaderStyle;
use indexmap::IndexMap;
use std::io::Write;

/// Style index of unformatted cells
pub const DEFAULT_STYLE: u32 = 0;
/// Style index of header cells
pub const HEADER_STYLE: u32 = 1;

/// First id available for custom number formats
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

fn builtin_num_fmt(code: &str) -> Option<u32> {
    match code {
        "General" => Some(0),
        "0" => Some(1),
        "0.00" => Some(2),
        "#,##0" => Some(3),
        "#,##0.00" => Some(4),
        "0%" => Some(9),
        "0.00%" => Some(10),
        "0.00E+00" => Some(11),
        "m/d/yy" => Some(14),
        "@" => Some(49),
        _ => None,
    }
}

/// Registry of number formats and the cell styles that use them
#[derive(Debug)]
pub struct StyleTable {
    header: HeaderStyle,
    /// Custom format code -> numFmtId
    custom_formats: IndexMap<String, u32>,
    /// numFmtId of each extra cell style, in style-index order after the header
    cell_formats: Vec<u32>,
}

impl StyleTable {
    pub fn new(header: HeaderStyle) -> Self {
        StyleTable {
            header,
            custom_formats: IndexMap::new(),
            cell_formats: Vec::new(),
        }
    }

    /// Style index for cells displayed with `code`, registering it on first use
    pub fn number_format_style(&mut self, code: &str) -> u32 {
        let num_fmt_id = match builtin_num_fmt(code) {
            Some(id) => id,
            None => {
                let next = FIRST_CUSTOM_NUM_FMT + self.custom_formats.len() as u32;
                *self.custom_formats.entry(code.to_string()).or_insert(next)
            }
        };

        let position = match self.cell_formats.iter().position(|&id| id == num_fmt_id) {
            Some(pos) => pos,
            None => {
                self.cell_formats.push(num_fmt_id);
                self.cell_formats.len() - 1
            }
        };
        HEADER_STYLE + 1 + position as u32
    }

    /// Write `xl/styles.xml`
    pub fn write_xml<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.declaration()?;
        xml.start_element("styleSheet")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml.close_start_tag()?;

        if !self.custom_formats.is_empty() {
            xml.start_element("numFmts")?;
            xml.attribute_int("count", self.custom_formats.len())?;
            xml.close_start_tag()?;
            for (code, id) in &self.custom_formats {
                xml.start_element("numFmt")?;
                xml.attribute_int("numFmtId", *id)?;
                xml.attribute("formatCode", code)?;
                xml.close_empty()?;
            }
            xml.end_element("numFmts")?;
        }

        // Fonts: 0 = body, 1 = header
        xml.write_str("<fonts count=\"2\">")?;
        xml.write_str("<font><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>")?;
        xml.write_str("<font>")?;
        if self.header.bold {
            xml.write_str("<b/>")?;
        }
        xml.write_str("<sz val=\"")?;
        xml.write_str(&self.header.font_size.to_string())?;
        xml.write_str("\"/><name val=\"Calibri\"/><family val=\"2\"/></font></fonts>")?;

        // Fills: 0 and 1 are reserved by the format, 2 = header background
        xml.write_str("<fills count=\"3\">")?;
        xml.write_str("<fill><patternFill patternType=\"none\"/></fill>")?;
        xml.write_str("<fill><patternFill patternType=\"gray125\"/></fill>")?;
        xml.write_str("<fill><patternFill patternType=\"solid\"><fgColor")?;
        xml.attribute("rgb", &self.header.fill_argb.to_uppercase())?;
        xml.write_str("/><bgColor indexed=\"64\"/></patternFill></fill></fills>")?;

        xml.write_str("<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>")?;
        xml.write_str("<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>")?;

        xml.start_element("cellXfs")?;
        xml.attribute_int("count", 2 + self.cell_formats.len())?;
        xml.close_start_tag()?;
        xml.write_str("<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>")?;
        xml.write_str("<xf numFmtId=\"0\" fontId=\"1\" fillId=\"2\" borderId=\"0\" xfId=\"0\" applyFont=\"1\" applyFill=\"1\"/>")?;
        for id in &self.cell_formats {
            xml.start_element("xf")?;
            xml.attribute_int("numFmtId", *id)?;
            xml.write_str(" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyNumberFormat=\"1\"")?;
            xml.close_empty()?;
        }
        xml.end_element("cellXfs")?;

        xml.write_str("<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>")?;
        xml.end_element("styleSheet")?;
        xml.flush()
    }
}
