//! # sheetcodec
//!
//! Bidirectional codec between ordered record sets and tabular artifacts: OOXML
//! spreadsheets (`.xlsx`) and delimited UTF-8 text (`.csv`).
//!
//! Writers infer a type per column from its first non-null value (or take an explicit
//! override), derive display widths and number formats, and return the artifact bytes.
//! Spreadsheet dates are stored as real date cells; strings that contain `-` or `/`
//! but are not ISO dates stay text, so identifiers like `2024-01` or `A/7` are never
//! reinterpreted. Readers turn an artifact back into records keyed by its header row.
//!
//! An empty record set is not an error: writers return [`WriteOutcome::Empty`].
//!
//! ## Quick start
//!
//! ```
//! use sheetcodec::{
//!     read_spreadsheet_bytes, write_delimited, write_spreadsheet, Delimiter, Record, RecordSet,
//!     SheetReadOptions, Value, WriteOptions,
//! };
//!
//! let records: RecordSet = vec![
//!     Record::new().with("id", "2024-01").with("qty", 3),
//!     Record::new().with("id", "2024-02").with("qty", 5),
//! ]
//! .into();
//!
//! let options = WriteOptions::default().with_sheet_name("Orders");
//! let xlsx = write_spreadsheet(&records, &options)?.into_bytes().unwrap();
//! let csv = write_delimited(&records, Delimiter::Comma, &options)?.into_bytes().unwrap();
//! assert_eq!(csv, b"id,qty\n2024-01,3\n2024-02,5\n");
//!
//! let back = read_spreadsheet_bytes(&xlsx, &SheetReadOptions::new("Orders"))?;
//! assert_eq!(back.records()[0].get("id"), Some(&Value::from("2024-01")));
//! # Ok::<(), sheetcodec::CodecError>(())
//! ```
//!
//! ## Modules
//!
//! - [`spreadsheet_writer`] / [`spreadsheet_reader`]: xlsx codec
//! - [`delimited_writer`] / [`delimited_reader`]: delimited text codec
//! - [`infer`] and [`columns`]: type inference and per-column metadata
//! - [`persist`]: saving artifacts and scanning source folders

pub mod columns;
pub mod csv;
pub mod dates;
pub mod delimited_reader;
pub mod delimited_writer;
pub mod error;
pub mod fast_writer;
pub mod infer;
pub mod options;
pub mod persist;
pub mod spreadsheet_reader;
pub mod spreadsheet_writer;
pub mod types;

pub use delimited_reader::{read_delimited, read_delimited_bytes};
pub use delimited_writer::write_delimited;
pub use error::{CodecError, Result};
pub use options::{ColumnFormat, Delimiter, HeaderStyle, SheetReadOptions, WriteOptions};
pub use persist::{persist_artifact, scan_folder_structure, ArtifactStore, DirectoryStore};
pub use spreadsheet_reader::{read_spreadsheet, read_spreadsheet_bytes};
pub use spreadsheet_writer::write_spreadsheet;
pub use types::{
    Artifact, ArtifactKind, ColumnSpec, ColumnType, Record, RecordSet, TypeTag, Value,
    WriteOutcome,
};
