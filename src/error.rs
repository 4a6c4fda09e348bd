// Error types shared by all parsing layers.
//
// Structural errors (unclosed quote, unexpected token) carry the offending
// bytes rendered printable-or-hex so messages stay readable for binary junk.

use std::fmt::Write as _;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure while reading from the byte source. Fatal.
    #[error("I/O error from byte source: {0}")]
    SourceIo(#[from] io::Error),

    /// A seekable source failed to honor the negative relative seek that
    /// look-ahead requires.
    #[error("byte source cannot rewind for look-ahead: {0}")]
    LookAheadUnsupported(io::Error),

    /// A byte sequence exceeded the accumulation ceiling without forming a
    /// valid character in the declared encoding.
    #[error("invalid {encoding} byte sequence: {}", render_token(.bytes))]
    InvalidEncoding {
        encoding: &'static str,
        bytes: Vec<u8>,
    },

    /// A quoted field was still open at the end of the row or line.
    #[error("unclosed quoted field near \"{near}\"")]
    UnclosedQuote { near: String },

    /// After a field, neither the column nor the row separator matched.
    #[error("expected column or row separator, found \"{found}\"")]
    UnexpectedToken { found: String },

    /// More decoded field bytes in one row than the row scratch holds.
    #[error("row exceeds the {limit}-byte row buffer")]
    RowBufferOverflow { limit: usize },

    /// More fields in one row than the field table holds.
    #[error("row exceeds the {limit}-field limit")]
    FieldCountOverflow { limit: usize },

    /// Invalid construction parameters.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn unexpected_token(found: &[u8]) -> Error {
        Error::UnexpectedToken {
            found: render_token(found),
        }
    }

    pub(crate) fn unclosed_quote(near: &[u8]) -> Error {
        // Keep only the tail so a huge field does not flood the message.
        let start = near.len().saturating_sub(32);
        Error::UnclosedQuote {
            near: render_token(&near[start..]),
        }
    }
}

/// Render token bytes for error messages: printable ASCII verbatim, anything
/// else as a \xNN escape.
pub(crate) fn render_token(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{b:02X}");
        }
    }
    out
}
