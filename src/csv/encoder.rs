//! Delimited-text encoding with RFC 4180-like quoting

use crate::options::Delimiter;

/// Encoder for one separator; quote character is always `"`
pub struct CsvEncoder {
    delimiter: u8,
    quote_char: u8,
    line_ending: &'static [u8],
}

impl CsvEncoder {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter: delimiter.as_byte(),
            quote_char: b'"',
            line_ending: b"\n",
        }
    }

    /// Encode a record followed by the line terminator
    pub fn encode_row<I, S>(&self, fields: I, buffer: &mut Vec<u8>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                buffer.push(self.delimiter);
            }
            self.encode_field(field.as_ref(), buffer);
        }
        buffer.extend_from_slice(self.line_ending);
    }

    fn encode_field(&self, field: &str, buffer: &mut Vec<u8>) {
        if !self.needs_quoting(field) {
            buffer.extend_from_slice(field.as_bytes());
            return;
        }

        buffer.push(self.quote_char);
        for byte in field.bytes() {
            if byte == self.quote_char {
                // " -> ""
                buffer.push(self.quote_char);
            }
            buffer.push(byte);
        }
        buffer.push(self.quote_char);
    }

    fn needs_quoting(&self, field: &str) -> bool {
        field
            .bytes()
            .any(|b| b == self.delimiter || b == self.quote_char || b == b'\n' || b == b'\r')
    }
}
