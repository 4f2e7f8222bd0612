//! Per-call configuration for the writers and readers
//!
//! Nothing here is read from the environment. Every entry point takes its options
//! explicitly and validates them before touching any I/O.

use crate::error::{CodecError, Result};
use crate::types::ColumnType;
use indexmap::IndexMap;
use std::fmt;

/// Default worksheet name
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
/// Default date cell format
pub const DEFAULT_DATE_FORMAT: &str = "mm/dd/yyyy";
/// Spreadsheet sheet name maximum length
pub const SHEET_NAME_MAX_LEN: usize = 31;
/// Characters not allowed in sheet names
pub const SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// Field separator for delimited output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Pipe,
}

impl Delimiter {
    /// All supported separators
    pub const ALL: [Delimiter; 3] = [Delimiter::Comma, Delimiter::Semicolon, Delimiter::Pipe];

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Pipe => '|',
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.as_char() as u8
    }
}

impl TryFrom<char> for Delimiter {
    type Error = CodecError;

    fn try_from(c: char) -> Result<Self> {
        match c {
            ',' => Ok(Delimiter::Comma),
            ';' => Ok(Delimiter::Semicolon),
            '|' => Ok(Delimiter::Pipe),
            other => Err(CodecError::validation([format!(
                "delimiter: '{}' is not one of ',', ';', '|'",
                other
            )])),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Header row appearance for spreadsheet artifacts
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderStyle {
    pub bold: bool,
    /// Font size in points
    pub font_size: f64,
    /// Solid background fill as ARGB hex (e.g. "FFE0E0E0")
    pub fill_argb: String,
}

impl Default for HeaderStyle {
    fn default() -> Self {
        HeaderStyle {
            bold: true,
            font_size: 12.0,
            fill_argb: "FFE0E0E0".to_string(),
        }
    }
}

impl HeaderStyle {
    fn collect_issues(&self, issues: &mut Vec<String>) {
        if !(self.font_size.is_finite() && self.font_size > 0.0 && self.font_size <= 409.0) {
            issues.push(format!(
                "header_style.font_size: {} is outside 1-409",
                self.font_size
            ));
        }
        if self.fill_argb.len() != 8 || !self.fill_argb.chars().all(|c| c.is_ascii_hexdigit()) {
            issues.push(format!(
                "header_style.fill_argb: '{}' is not an 8-digit ARGB hex color",
                self.fill_argb
            ));
        }
    }
}

/// Caller-supplied column override
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnFormat {
    pub column_type: ColumnType,
    /// Number format code, or a date format overriding [`WriteOptions::date_format`]
    pub num_format: Option<String>,
}

impl ColumnFormat {
    /// Force the column to text
    pub fn text() -> Self {
        ColumnFormat {
            column_type: ColumnType::Text,
            num_format: None,
        }
    }

    /// Force the column to dates
    pub fn date() -> Self {
        ColumnFormat {
            column_type: ColumnType::Date,
            num_format: None,
        }
    }

    /// Force the column to numbers
    pub fn number() -> Self {
        ColumnFormat {
            column_type: ColumnType::Number,
            num_format: None,
        }
    }

    /// Attach a format code (builder pattern)
    pub fn with_num_format(mut self, format: &str) -> Self {
        self.num_format = Some(format.to_string());
        self
    }
}

/// Options shared by the spreadsheet and delimited writers
///
/// # Examples
///
/// ```
/// use sheetcodec::options::{ColumnFormat, WriteOptions};
///
/// let options = WriteOptions::new()
///     .with_sheet_name("Employees")
///     .with_date_format("yyyy-mm-dd")
///     .with_column_format("salary", ColumnFormat::number().with_num_format("#,##0.00"));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteOptions {
    /// Worksheet name (spreadsheet artifacts only)
    pub sheet_name: String,
    /// Cell format string applied to date values
    pub date_format: String,
    /// Explicit per-column type overrides
    pub column_formats: IndexMap<String, ColumnFormat>,
    /// Header row appearance (spreadsheet artifacts only)
    pub header_style: HeaderStyle,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            column_formats: IndexMap::new(),
            header_style: HeaderStyle::default(),
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worksheet name (builder pattern)
    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.sheet_name = name.to_string();
        self
    }

    /// Set the date format string (builder pattern)
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    /// Add an explicit column override (builder pattern)
    pub fn with_column_format(mut self, column: &str, format: ColumnFormat) -> Self {
        self.column_formats.insert(column.to_string(), format);
        self
    }

    /// Set the header style (builder pattern)
    pub fn with_header_style(mut self, style: HeaderStyle) -> Self {
        self.header_style = style;
        self
    }

    /// Check every field, reporting all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if let Err(issue) = check_sheet_name(&self.sheet_name) {
            issues.push(issue);
        }
        if self.date_format.trim().is_empty() {
            issues.push("date_format: must not be empty".to_string());
        }
        for (column, format) in &self.column_formats {
            if column.is_empty() {
                issues.push("column_formats: column name must not be empty".to_string());
            }
            if let Some(code) = &format.num_format {
                if code.trim().is_empty() {
                    issues.push(format!(
                        "column_formats.{}: format code must not be empty",
                        column
                    ));
                }
            }
        }
        self.header_style.collect_issues(&mut issues);

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CodecError::Validation { issues })
        }
    }
}

/// Options for reading a spreadsheet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetReadOptions {
    pub sheet_name: String,
    /// One-based index of the header row
    pub header_row: u32,
}

impl Default for SheetReadOptions {
    fn default() -> Self {
        SheetReadOptions {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            header_row: 1,
        }
    }
}

impl SheetReadOptions {
    pub fn new(sheet_name: &str) -> Self {
        SheetReadOptions {
            sheet_name: sheet_name.to_string(),
            header_row: 1,
        }
    }

    /// Set the one-based header row (builder pattern)
    pub fn header_row(mut self, row: u32) -> Self {
        self.header_row = row;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();
        if self.sheet_name.is_empty() {
            issues.push("sheet_name: must not be empty".to_string());
        }
        if self.header_row == 0 {
            issues.push("header_row: rows are numbered from 1".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CodecError::Validation { issues })
        }
    }
}

/// Validate a reader delimiter: exactly one character, not a quote or line break
pub fn validate_delimiter_char(delimiter: &str) -> Result<char> {
    let mut chars = delimiter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c == '"' || c == '\n' || c == '\r' => Err(CodecError::validation([
            format!("delimiter_char: {:?} cannot be used as a separator", c),
        ])),
        (Some(c), None) => Ok(c),
        (None, _) => Err(CodecError::validation(["delimiter_char: is required"])),
        (Some(_), Some(_)) => Err(CodecError::validation([format!(
            "delimiter_char: '{}' must be a single character",
            delimiter
        )])),
    }
}

fn check_sheet_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("sheet_name: must not be empty".to_string());
    }
    if name.chars().count() > SHEET_NAME_MAX_LEN {
        return Err(format!(
            "sheet_name: '{}' exceeds {} characters",
            name, SHEET_NAME_MAX_LEN
        ));
    }
    if let Some(c) = name.chars().find(|c| SHEET_NAME_ILLEGAL.contains(c)) {
        return Err(format!("sheet_name: '{}' contains '{}'", name, c));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(format!(
            "sheet_name: '{}' cannot start or end with an apostrophe",
            name
        ));
    }
    Ok(())
}
