// Streaming CSV tokenizer.
//
// Drives a character cursor row by row: a quote-aware field reader appends
// decoded field bytes to a fixed row scratch, a separator decision after each
// field picks between column separator, row separator and end of input, and
// comment lines are skipped before a row starts. Fields are emitted as owned
// byte strings; the declared encoding travels on the parser itself.

use log::debug;

use crate::core::buffer::{BufferedIo, DEFAULT_BUFFER_SIZE};
use crate::core::cursor::CharCursor;
use crate::core::encoding::TextEncoding;
use crate::core::source::{ByteSource, FileSource};
use crate::error::{Error, Result};

/// Row scratch capacity: decoded field bytes for one row.
pub const MAX_ROW_BYTES: usize = 256 * 1024;

/// Upper bound of fields per row, guarding against pathological input.
pub const MAX_FIELDS: usize = 128 * 1024;

/// Tokenizer configuration, supplied at construction.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub col_sep: Vec<u8>,
    pub row_sep: Vec<u8>,
    pub quote_char: u8,
    pub comment_prefix: Option<Vec<u8>>,
    pub buffer_size: usize,
    pub encoding: TextEncoding,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            col_sep: b",".to_vec(),
            row_sep: b"\n".to_vec(),
            quote_char: b'"',
            comment_prefix: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            encoding: TextEncoding::default(),
        }
    }
}

impl ParserConfig {
    fn validate(&self) -> Result<()> {
        if self.col_sep.is_empty() {
            return Err(Error::Config("column separator must not be empty".into()));
        }
        if self.row_sep.is_empty() {
            return Err(Error::Config("row separator must not be empty".into()));
        }
        if self.col_sep == self.row_sep {
            return Err(Error::Config(
                "column and row separators must differ".into(),
            ));
        }
        if matches!(&self.comment_prefix, Some(p) if p.is_empty()) {
            return Err(Error::Config("comment prefix must not be empty".into()));
        }
        Ok(())
    }
}

/// Outcome of the separator decision after a field.
enum SepMatch {
    Column,
    Row,
    EndOfInput,
    NoMatch,
}

/// Streaming tokenizer over a byte source.
pub struct Parser<S: ByteSource> {
    cursor: CharCursor<S>,
    /// Linear scratch holding the decoded bytes of the current row's fields.
    row_buf: Vec<u8>,
    /// Per-field (start, len) pairs into `row_buf`.
    fields: Vec<(usize, usize)>,
    pending_start: usize,
    col_sep: Vec<u8>,
    row_sep: Vec<u8>,
    quote_char: u8,
    double_quote: [u8; 2],
    comment_prefix: Option<Vec<u8>>,
    max_sep_len: usize,
    /// Copy of the latest look-ahead, detached from the cursor's borrow.
    peek_scratch: Vec<u8>,
}

impl Parser<FileSource> {
    /// Open a file the parser will own and close on drop.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P, config: ParserConfig) -> Result<Self> {
        let source = FileSource::open(path)?;
        Self::new(source, config)
    }
}

impl<S: ByteSource> Parser<S> {
    pub fn new(source: S, config: ParserConfig) -> Result<Self> {
        config.validate()?;

        let max_sep_len = config.col_sep.len().max(config.row_sep.len()).max(2);
        // The carry window must cover the longest look-ahead unit; 8 bytes
        // also covers any UTF-8 character. Oversized separators are rejected
        // by the buffer.
        let carry = max_sep_len.max(8);
        let io = BufferedIo::with_carry(source, config.buffer_size, carry)?;
        let cursor = CharCursor::new(io, config.encoding);

        debug!(
            "parser: col_sep={:?} row_sep={:?} quote={:?} encoding={}",
            config.col_sep,
            config.row_sep,
            config.quote_char as char,
            config.encoding.name()
        );

        Ok(Parser {
            cursor,
            row_buf: Vec::with_capacity(MAX_ROW_BYTES),
            fields: Vec::new(),
            pending_start: 0,
            double_quote: [config.quote_char, config.quote_char],
            quote_char: config.quote_char,
            col_sep: config.col_sep,
            row_sep: config.row_sep,
            comment_prefix: config.comment_prefix,
            max_sep_len,
            peek_scratch: Vec::new(),
        })
    }

    pub fn encoding(&self) -> TextEncoding {
        self.cursor.encoding()
    }

    /// True once the source is exhausted and every buffered byte consumed.
    pub fn is_eof(&self) -> bool {
        self.cursor.is_eof()
    }

    /// Read one logical record as its ordered field byte strings, or `None`
    /// at end of stream. Comment lines are skipped first.
    pub fn read_row_as_fields(&mut self) -> Result<Option<Vec<Vec<u8>>>> {
        loop {
            if self.cursor.is_eof() {
                return Ok(None);
            }
            self.fill_peek(1)?;
            if self.peek_scratch.is_empty() {
                // Force one more read so the EOF flag latches.
                let _ = self.cursor.next_char()?;
                return Ok(None);
            }
            if !self.comment_matches()? {
                break;
            }
            self.skip_past_row_sep()?;
        }

        let mut row_complete = false;
        while !row_complete {
            let closed = self.read_field()?;
            if !closed {
                return Err(Error::unclosed_quote(&self.row_buf[self.pending_start..]));
            }

            self.fill_peek(self.max_sep_len)?;
            match self.match_separator() {
                SepMatch::Column => self.cursor.skip_bytes(self.col_sep.len())?,
                SepMatch::Row => {
                    self.cursor.skip_bytes(self.row_sep.len())?;
                    row_complete = true;
                }
                SepMatch::EndOfInput => {
                    // Consume the final straggler so EOF surfaces.
                    let _ = self.cursor.next_char()?;
                    row_complete = true;
                }
                SepMatch::NoMatch => {
                    return Err(Error::unexpected_token(&self.peek_scratch));
                }
            }
        }

        Ok(Some(self.flush_row()))
    }

    /// Read one raw line including the trailing row separator, or `None` at
    /// end of stream. Quoting is not interpreted here.
    pub fn read_row(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        while let Some(ch) = self.cursor.next_char()? {
            buf.extend_from_slice(ch.as_bytes());
            if buf.ends_with(&self.row_sep) {
                return Ok(Some(buf));
            }
        }
        if buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(buf))
        }
    }

    /// Skip `n` raw lines.
    pub fn skip_rows(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            if self.read_row()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Field reader: RAW or QUOTED depending on the opening character.
    /// Returns whether the field was properly closed; the caller decides how
    /// to report an unterminated quote.
    fn read_field(&mut self) -> Result<bool> {
        self.mark_field_start()?;

        self.fill_peek(1)?;
        let quoted = self.peek_scratch.first() == Some(&self.quote_char);
        if quoted {
            self.cursor.skip_bytes(1)?;
        }

        loop {
            self.fill_peek(self.max_sep_len)?;
            if self.peek_scratch.is_empty() {
                if quoted {
                    return Ok(false);
                }
                break;
            }

            // A doubled quote collapses to one literal quote in both modes.
            if self.peek_scratch.starts_with(&self.double_quote) {
                self.cursor.skip_bytes(2)?;
                let q = self.quote_char;
                self.push_row_bytes(&[q])?;
                continue;
            }

            if quoted {
                if self.peek_scratch.first() == Some(&self.quote_char) {
                    self.cursor.skip_bytes(1)?;
                    break;
                }
            } else if self.peek_scratch.starts_with(&self.col_sep)
                || self.peek_scratch.starts_with(&self.row_sep)
            {
                // Separator stays in the stream for the caller.
                break;
            }

            match self.cursor.next_char()? {
                Some(ch) => self.push_row_bytes(ch.as_bytes())?,
                None => {
                    if quoted {
                        return Ok(false);
                    }
                    break;
                }
            }
        }

        self.finish_field();
        Ok(true)
    }

    /// Longest prefix wins; the row separator wins when the column separator
    /// is its prefix.
    fn match_separator(&self) -> SepMatch {
        let peek = &self.peek_scratch;
        let row_first = self.row_sep.len() >= self.col_sep.len();
        let (first, second) = if row_first {
            (&self.row_sep, &self.col_sep)
        } else {
            (&self.col_sep, &self.row_sep)
        };

        if peek.starts_with(first) {
            return if row_first { SepMatch::Row } else { SepMatch::Column };
        }
        if peek.starts_with(second) {
            return if row_first { SepMatch::Column } else { SepMatch::Row };
        }
        if peek.is_empty()
            || (peek.len() < self.col_sep.len() && peek.len() < self.row_sep.len())
        {
            return SepMatch::EndOfInput;
        }
        SepMatch::NoMatch
    }

    fn comment_matches(&mut self) -> Result<bool> {
        let Some(len) = self.comment_prefix.as_ref().map(|p| p.len()) else {
            return Ok(false);
        };
        self.fill_peek(len)?;
        match &self.comment_prefix {
            Some(prefix) => Ok(self.peek_scratch.starts_with(prefix)),
            None => Ok(false),
        }
    }

    /// Consume characters up to and including the next row separator.
    fn skip_past_row_sep(&mut self) -> Result<()> {
        let sep_len = self.row_sep.len();
        let mut tail: Vec<u8> = Vec::new();
        while let Some(ch) = self.cursor.next_char()? {
            tail.extend_from_slice(ch.as_bytes());
            if tail.len() > sep_len {
                let cut = tail.len() - sep_len;
                tail.drain(..cut);
            }
            if tail == self.row_sep {
                return Ok(());
            }
        }
        Ok(())
    }

    fn fill_peek(&mut self, nchars: usize) -> Result<()> {
        let peek = self.cursor.peek_chars(nchars)?;
        self.peek_scratch.clear();
        self.peek_scratch.extend_from_slice(peek);
        Ok(())
    }

    fn mark_field_start(&mut self) -> Result<()> {
        if self.fields.len() >= MAX_FIELDS {
            return Err(Error::FieldCountOverflow { limit: MAX_FIELDS });
        }
        self.pending_start = self.row_buf.len();
        Ok(())
    }

    fn push_row_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.row_buf.len() + bytes.len() > MAX_ROW_BYTES {
            return Err(Error::RowBufferOverflow {
                limit: MAX_ROW_BYTES,
            });
        }
        self.row_buf.extend_from_slice(bytes);
        Ok(())
    }

    fn finish_field(&mut self) {
        self.fields
            .push((self.pending_start, self.row_buf.len() - self.pending_start));
    }

    fn flush_row(&mut self) -> Vec<Vec<u8>> {
        let out = self
            .fields
            .iter()
            .map(|&(start, len)| self.row_buf[start..start + len].to_vec())
            .collect();
        self.row_buf.clear();
        self.fields.clear();
        out
    }
}
