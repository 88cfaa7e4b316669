//! Content encoder
//!
//! Scalars are carried as decimal strings. Floating point values use a
//! fixed-point format with between one and six fractional digits, trimmed
//! of insignificant trailing zeros:
//!
//! ```text
//! 0.7        -> "0.7"
//! -1.0       -> "-1.0"
//! 0.1234567  -> "0.123457"
//! ```
//!
//! On the wire a scalar is its UTF-8 string. A record is its field values in
//! schema order, separated by [`FIELD_DELIMITER`].

use bytes::{BufMut, Bytes, BytesMut};

use super::value::Content;

/// Byte separating record fields on the wire
pub const FIELD_DELIMITER: u8 = 0x02;

/// Maximum number of fractional digits for floating point scalars
pub const MAX_FRACTION_DIGITS: usize = 6;

/// Format a float with one to six fractional digits
pub fn format_f64(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let mut text = format!("{:.*}", MAX_FRACTION_DIGITS, value);
    if let Some(dot) = text.find('.') {
        let min_len = dot + 2;
        while text.len() > min_len && text.ends_with('0') {
            text.pop();
        }
    }

    // Values that round to zero keep no sign
    if text == "-0.0" {
        text.remove(0);
    }
    text
}

/// Reusable wire encoder
///
/// Holds one scratch buffer; each [`finish`](Self::finish) hands out the
/// payload written since the previous call.
#[derive(Default)]
pub struct ContentEncoder {
    buf: BytesMut,
}

impl ContentEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the wire form of `content`
    pub fn encode(&mut self, content: &Content) {
        match content {
            Content::Scalar(value) => self.buf.put_slice(value.as_bytes()),
            Content::Record(record) => {
                for (i, value) in record.values().iter().enumerate() {
                    if i > 0 {
                        self.buf.put_u8(FIELD_DELIMITER);
                    }
                    self.buf.put_slice(value.as_bytes());
                }
            }
        }
    }

    /// Take the payload written so far
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

/// Wire form of one content value
pub fn encode(content: &Content) -> Bytes {
    let mut encoder = ContentEncoder::new();
    encoder.encode(content);
    encoder.finish()
}
