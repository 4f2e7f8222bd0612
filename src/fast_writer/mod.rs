//! Hand-written OOXML package writer
//!
//! Produces a single-sheet xlsx entirely in memory: a buffered [`XmlWriter`] feeds ZIP
//! entries, text cells go through a deduplicated shared string table and number formats
//! are registered on demand in the style sheet.

mod shared_strings;
mod styles;
mod workbook;
mod xml_writer;

pub use shared_strings::SharedStrings;
pub use styles::{StyleTable, DEFAULT_STYLE, HEADER_STYLE};
pub use workbook::{CellData, StyledCell, WorkbookBuilder};
pub use xml_writer::XmlWriter;
pub(crate) use xml_writer::starts_escape_sequence;
