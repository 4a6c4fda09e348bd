// Quote counting for a logical line under the two escape interpretations.
//
// The counts drive AUTO escaping: an upstream driver (or the line parsers
// themselves) compare the backslash-aware count against the plain RFC count
// to decide how a given line escapes its quotes.

/// Count quote characters in `line`. With `backslash_aware`, a quote preceded
/// by an odd run of backslashes is treated as escaped and skipped. The run
/// resets at column separators, mirroring the field splitter.
pub fn count_quote_chars(
    line: &[u8],
    quote_char: u8,
    col_sep: &[u8],
    backslash_aware: bool,
) -> usize {
    let mut count = 0;
    let mut backslash_run = 0usize;
    let mut pos = 0;

    while pos < line.len() {
        if !col_sep.is_empty() && line[pos..].starts_with(col_sep) {
            backslash_run = 0;
            pos += col_sep.len();
            continue;
        }
        let b = line[pos];
        if b == b'\\' {
            backslash_run += 1;
        } else {
            if b == quote_char && !(backslash_aware && backslash_run % 2 == 1) {
                count += 1;
            }
            backslash_run = 0;
        }
        pos += 1;
    }

    count
}

/// Both interpretations at once: `(escaped_count, rfc_count)`. The RFC count
/// includes every quote, so `rfc_count >= escaped_count` always holds.
pub fn count_quote_chars_auto(line: &[u8], quote_char: u8, col_sep: &[u8]) -> (usize, usize) {
    (
        count_quote_chars(line, quote_char, col_sep, true),
        count_quote_chars(line, quote_char, col_sep, false),
    )
}
