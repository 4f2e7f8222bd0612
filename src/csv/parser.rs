//! Lenient delimited-text parsing
//!
//! Quoted fields may contain separators, doubled quotes and line breaks. A quote that
//! appears inside an unquoted field is kept as a literal character, and text after a
//! closing quote is appended to the field rather than rejected.

const BOM: char = '\u{feff}';

/// Delimited-text parser for a single separator and quote character
pub struct CsvParser {
    delimiter: char,
    quote_char: char,
}

impl CsvParser {
    /// Create a new parser with custom delimiter and quote character
    pub fn new(delimiter: char, quote_char: char) -> Self {
        Self {
            delimiter,
            quote_char,
        }
    }

    /// Parse a single line into fields
    #[cfg(test)]
    fn parse_line(&self, line: &str) -> Vec<String> {
        let mut rows = self.parse_document(line);
        match rows.len() {
            0 => vec![String::new()],
            _ => rows.swap_remove(0),
        }
    }

    /// Parse a whole document into rows of fields
    ///
    /// A leading byte-order mark is dropped and blank lines are skipped. Both `\n` and
    /// `\r\n` end a record outside quotes.
    pub fn parse_document(&self, text: &str) -> Vec<Vec<String>> {
        let text = text.strip_prefix(BOM).unwrap_or(text);

        let mut rows = Vec::new();
        let mut fields: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        // Whether the current field opened with a quote
        let mut quoted_field = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if in_quotes {
                if ch == self.quote_char {
                    if chars.peek() == Some(&self.quote_char) {
                        // Escaped quote ("")
                        current.push(self.quote_char);
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current.push(ch);
                }
                continue;
            }

            if ch == self.quote_char && current.is_empty() && !quoted_field {
                in_quotes = true;
                quoted_field = true;
            } else if ch == self.delimiter {
                fields.push(std::mem::take(&mut current));
                quoted_field = false;
            } else if ch == '\n' || ch == '\r' {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                fields.push(std::mem::take(&mut current));
                quoted_field = false;
                Self::finish_row(&mut rows, &mut fields);
            } else {
                current.push(ch);
            }
        }

        if in_quotes || quoted_field || !current.is_empty() || !fields.is_empty() {
            fields.push(current);
            Self::finish_row(&mut rows, &mut fields);
        }

        rows
    }

    fn finish_row(rows: &mut Vec<Vec<String>>, fields: &mut Vec<String>) {
        let row = std::mem::take(fields);
        let blank = row.len() == 1 && row[0].is_empty();
        if !blank {
            rows.push(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CsvParser {
        CsvParser::new(',', '"')
    }

    #[test]
    fn test_simple() {
        assert_eq!(parser().parse_line("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quoted() {
        assert_eq!(parser().parse_line(r#""a,b",c"#), vec!["a,b", "c"]);
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(
            parser().parse_line(r#""Say ""Hello""",world"#),
            vec![r#"Say "Hello""#, "world"]
        );
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(parser().parse_line("a,,c"), vec!["a", "", "c"]);
        assert_eq!(parser().parse_line(",,"), vec!["", "", ""]);
    }

    #[test]
    fn test_quoted_empty() {
        assert_eq!(parser().parse_line(r#""","""#), vec!["", ""]);
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parser().parse_line(""), vec![""]);
    }

    #[test]
    fn test_custom_delimiter() {
        let parser = CsvParser::new(';', '"');
        assert_eq!(parser.parse_line(r#"a;"b;c";d"#), vec!["a", "b;c", "d"]);
    }

    #[test]
    fn test_document_with_multiline_field() {
        let rows = parser().parse_document("name,note\r\nA,\"Line 1\nLine 2\"\r\nB,plain\n");
        assert_eq!(
            rows,
            vec![
                vec!["name", "note"],
                vec!["A", "Line 1\nLine 2"],
                vec!["B", "plain"],
            ]
        );
    }

    #[test]
    fn test_bom_and_blank_lines() {
        let rows = parser().parse_document("\u{feff}id,v\n\n1,x\n\n");
        assert_eq!(rows, vec![vec!["id", "v"], vec!["1", "x"]]);
    }

    #[test]
    fn test_relaxed_quotes() {
        // Stray quote inside an unquoted field is literal
        assert_eq!(parser().parse_line(r#"5" screen,ok"#), vec![r#"5" screen"#, "ok"]);
        // Text after a closing quote is kept
        assert_eq!(parser().parse_line(r#""abc"def,ok"#), vec!["abcdef", "ok"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        let rows = parser().parse_document("a,b\n1,2");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }
}
