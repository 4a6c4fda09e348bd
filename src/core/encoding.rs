// Declared text encodings and their validity probes.
//
// ASCII and UTF-8 are the fast path; everything else goes through
// encoding_rs, which stands in for the source ecosystem's per-encoding
// validity oracle. The streaming layers stay in the byte domain and carry
// the declared encoding as a label; `decode` is the explicit bridge to text.

use std::borrow::Cow;

/// Text encoding declared at construction and carried by every emitted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Ascii,
    Utf8,
    Other(&'static encoding_rs::Encoding),
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Ascii => "US-ASCII",
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Other(enc) => enc.name(),
        }
    }

    /// A single byte below 0x80 is always a whole character.
    pub fn is_ascii_compatible(&self) -> bool {
        matches!(self, TextEncoding::Ascii | TextEncoding::Utf8)
    }

    /// Whether `bytes` form a complete, valid sequence in this encoding.
    pub fn validate(&self, bytes: &[u8]) -> bool {
        match self {
            TextEncoding::Ascii => bytes.iter().all(|&b| b < 0x80),
            TextEncoding::Utf8 => std::str::from_utf8(bytes).is_ok(),
            TextEncoding::Other(enc) => enc
                .decode_without_bom_handling_and_without_replacement(bytes)
                .is_some(),
        }
    }

    /// Decode to text, replacing anything invalid.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            TextEncoding::Ascii | TextEncoding::Utf8 => String::from_utf8_lossy(bytes),
            TextEncoding::Other(enc) => enc.decode_without_bom_handling(bytes).0,
        }
    }
}

impl Default for TextEncoding {
    /// File sources default to UTF-8.
    fn default() -> Self {
        TextEncoding::Utf8
    }
}
