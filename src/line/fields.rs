// Framed-line parser: one already-materialized logical line into its ordered
// fields.
//
// Fast path: no quotes and a one-byte separator — a memchr scan with optional
// whitespace trim, emitting borrowed slices. Slow path: quote-aware scan via
// the shared splitting core, unescaping only when a field actually needs it.

use std::borrow::Cow;

use memchr::memchr;

use crate::error::Result;
use crate::line::quotes::count_quote_chars_auto;
use crate::line::split::{is_quoted_shape, split_line, trim_spaces, SplitMode};

/// Quote-escape interpretation. `Auto` picks per line from the quote counts;
/// `None` treats quotes as plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteEscaping {
    Doubled,
    Backslash,
    Auto,
    None,
}

/// Options for [`parse_csv_line`].
#[derive(Debug, Clone)]
pub struct LineOptions {
    pub col_sep: Vec<u8>,
    pub quote_char: u8,
    pub max_fields: Option<usize>,
    /// Caller's promise that the line contains quote characters. When false
    /// and the separator is one byte, the fast scan is used and quotes are
    /// ordinary data.
    pub has_quotes: bool,
    pub strip_whitespace: bool,
    pub escaping: QuoteEscaping,
}

impl Default for LineOptions {
    fn default() -> Self {
        LineOptions {
            col_sep: b",".to_vec(),
            quote_char: b'"',
            max_fields: None,
            has_quotes: false,
            strip_whitespace: false,
            escaping: QuoteEscaping::Doubled,
        }
    }
}

/// Split one logical line (row separator already stripped or absent) into
/// ordered fields under the configured quoting rules.
pub fn parse_csv_line<'a>(line: &'a [u8], opts: &LineOptions) -> Result<Vec<Cow<'a, [u8]>>> {
    if !opts.has_quotes && opts.col_sep.len() == 1 {
        return Ok(parse_fast(line, opts));
    }

    let mode = resolve_escaping(opts.escaping, line, opts.quote_char, &opts.col_sep);
    let mut fields = Vec::new();
    split_line(
        line,
        &opts.col_sep,
        opts.quote_char,
        mode,
        opts.max_fields,
        |raw| {
            fields.push(extract_field(
                raw,
                opts.quote_char,
                opts.strip_whitespace,
                mode,
            ));
        },
    )?;
    Ok(fields)
}

/// No-quote single-byte-separator scan.
fn parse_fast<'a>(line: &'a [u8], opts: &LineOptions) -> Vec<Cow<'a, [u8]>> {
    let sep = opts.col_sep[0];
    let mut fields = Vec::new();
    let mut start = 0;

    while let Some(off) = memchr(sep, &line[start..]) {
        if matches!(opts.max_fields, Some(max) if fields.len() >= max) {
            return fields;
        }
        fields.push(fast_slice(&line[start..start + off], opts.strip_whitespace));
        start += off + 1;
    }
    if !matches!(opts.max_fields, Some(max) if fields.len() >= max) {
        fields.push(fast_slice(&line[start..], opts.strip_whitespace));
    }
    fields
}

fn fast_slice(raw: &[u8], strip_ws: bool) -> Cow<'_, [u8]> {
    let body = if strip_ws { trim_spaces(raw) } else { raw };
    if body.is_empty() {
        // Shared empty slice; no allocation for blank fields.
        Cow::Borrowed(&[][..])
    } else {
        Cow::Borrowed(body)
    }
}

/// Resolve `Auto` against the line's quote counts: Doubled when the RFC
/// count is even while the escaped count is odd, Backslash otherwise.
pub(crate) fn resolve_escaping(
    escaping: QuoteEscaping,
    line: &[u8],
    quote_char: u8,
    col_sep: &[u8],
) -> SplitMode {
    match escaping {
        QuoteEscaping::Doubled => SplitMode::Doubled,
        QuoteEscaping::Backslash => SplitMode::Backslash,
        QuoteEscaping::None => SplitMode::Plain,
        QuoteEscaping::Auto => {
            let (escaped, rfc) = count_quote_chars_auto(line, quote_char, col_sep);
            if rfc % 2 == 0 && escaped % 2 == 1 {
                SplitMode::Doubled
            } else {
                SplitMode::Backslash
            }
        }
    }
}

/// Turn a raw field slice into its logical content: strip a surrounding
/// quote pair, trim whitespace, then collapse escapes only when present.
pub(crate) fn extract_field<'a>(
    raw: &'a [u8],
    quote_char: u8,
    strip_ws: bool,
    mode: SplitMode,
) -> Cow<'a, [u8]> {
    if mode == SplitMode::Plain {
        return fast_slice(raw, strip_ws);
    }

    let quoted = is_quoted_shape(raw, quote_char, mode);
    let body = if quoted { &raw[1..raw.len() - 1] } else { raw };
    let body = if strip_ws { trim_spaces(body) } else { body };
    if body.is_empty() {
        return Cow::Borrowed(&[][..]);
    }

    match mode {
        SplitMode::Doubled => match memchr(quote_char, body) {
            Some(_) => Cow::Owned(collapse_doubled(body, quote_char)),
            None => Cow::Borrowed(body),
        },
        SplitMode::Backslash => match memchr(b'\\', body) {
            Some(_) => Cow::Owned(unescape_backslash(body, quote_char)),
            None => Cow::Borrowed(body),
        },
        SplitMode::Plain => Cow::Borrowed(body),
    }
}

/// Collapse doubled quotes in a field's inner content: "" -> "
fn collapse_doubled(inner: &[u8], quote_char: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == quote_char && i + 1 < inner.len() && inner[i + 1] == quote_char {
            out.push(quote_char);
            i += 2;
        } else {
            out.push(inner[i]);
            i += 1;
        }
    }
    out
}

/// Drop the backslash of each backslash-quote pair: \" -> "
fn unescape_backslash(inner: &[u8], quote_char: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == b'\\' && i + 1 < inner.len() && inner[i + 1] == quote_char {
            out.push(quote_char);
            i += 2;
        } else {
            out.push(inner[i]);
            i += 1;
        }
    }
    out
}
