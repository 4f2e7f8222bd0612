//! Shared string table for text cells

use super::xml_writer::XmlWriter;
use crate::error::Result;
use indexmap::IndexSet;
use std::io::Write;

/// Deduplicated strings in first-use order
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: IndexSet<String>,
    /// Total references, including repeats
    count: u64,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `s` in the table, adding it on first use
    pub fn add_string(&mut self, s: &str) -> usize {
        self.count += 1;
        match self.strings.get_index_of(s) {
            Some(idx) => idx,
            None => self.strings.insert_full(s.to_string()).0,
        }
    }

    pub fn unique_count(&self) -> usize {
        self.strings.len()
    }

    /// Write `xl/sharedStrings.xml`
    pub fn write_xml<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.declaration()?;
        xml.start_element("sst")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml.attribute_int("count", self.count)?;
        xml.attribute_int("uniqueCount", self.strings.len())?;
        xml.close_start_tag()?;

        for s in &self.strings {
            xml.write_raw(b"<si>")?;
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                xml.write_raw(b"<t xml:space=\"preserve\">")?;
            } else {
                xml.write_raw(b"<t>")?;
            }
            xml.write_cell_text(s)?;
            xml.write_raw(b"</t></si>")?;
        }

        xml.end_element("sst")?;
        xml.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplication() {
        let mut sst = SharedStrings::new();
        assert_eq!(sst.add_string("a"), 0);
        assert_eq!(sst.add_string("b"), 1);
        assert_eq!(sst.add_string("a"), 0);
        assert_eq!(sst.unique_count(), 2);
    }

    #[test]
    fn test_xml_output() {
        let mut sst = SharedStrings::new();
        sst.add_string("x<y");
        sst.add_string(" padded");
        sst.add_string("x<y");

        let mut out = Vec::new();
        sst.write_xml(&mut XmlWriter::new(&mut out)).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.contains("count=\"3\" uniqueCount=\"2\""));
        assert!(xml.contains("<si><t>x&lt;y</t></si>"));
        assert!(xml.contains("<si><t xml:space=\"preserve\"> padded</t></si>"));
    }

    #[test]
    fn test_control_characters_survive() {
        let mut sst = SharedStrings::new();
        sst.add_string("bell\u{7}");

        let mut out = Vec::new();
        sst.write_xml(&mut XmlWriter::new(&mut out)).unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains("<si><t>bell_x0007_</t></si>"));
    }
}
