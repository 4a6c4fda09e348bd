// Framed-line parser: one logical line into a keyed record.
//
// Same tokenization as the field-list parser, then a per-field pipeline:
// trim, blank filter, zero filter, numeric coercion, insert under the header
// key (or a synthetic key past the headers). The record map is not allocated
// until the first field survives the filters.

use std::collections::HashMap;

use crate::core::encoding::TextEncoding;
use crate::error::Result;
use crate::line::fields::{extract_field, resolve_escaping, QuoteEscaping};
use crate::line::split::{is_quoted_shape, split_line};
use crate::line::value::{coerce_numeric, is_blank, is_zero_value};

pub use crate::line::value::Value;

/// Which fields get integer-then-float coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericConversion {
    Never,
    All,
    Only(Vec<String>),
    Except(Vec<String>),
}

/// Options for [`parse_line_to_hash`].
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub col_sep: Vec<u8>,
    pub row_sep: Vec<u8>,
    pub quote_char: u8,
    /// Prefix for synthetic keys when a row has more fields than headers.
    pub missing_header_prefix: String,
    pub strip_whitespace: bool,
    pub remove_empty_values: bool,
    pub remove_empty_hashes: bool,
    pub remove_zero_values: bool,
    pub convert_values_to_numeric: NumericConversion,
    pub quote_escaping: QuoteEscaping,
    pub encoding: TextEncoding,
}

impl Default for RecordOptions {
    fn default() -> Self {
        RecordOptions {
            col_sep: b",".to_vec(),
            row_sep: b"\n".to_vec(),
            quote_char: b'"',
            missing_header_prefix: "column_".to_string(),
            strip_whitespace: false,
            remove_empty_values: false,
            remove_empty_hashes: false,
            remove_zero_values: false,
            convert_values_to_numeric: NumericConversion::Never,
            quote_escaping: QuoteEscaping::Doubled,
            encoding: TextEncoding::Utf8,
        }
    }
}

/// Parse one logical line into `(record, field_count)`.
///
/// The record is `None` when `remove_empty_hashes` is set and every field was
/// blank. `field_count` counts every tokenized field, filtered or not.
pub fn parse_line_to_hash(
    line: &[u8],
    headers: &[String],
    opts: &RecordOptions,
) -> Result<(Option<HashMap<String, Value>>, usize)> {
    let line = line.strip_suffix(opts.row_sep.as_slice()).unwrap_or(line);
    let mode = resolve_escaping(opts.quote_escaping, line, opts.quote_char, &opts.col_sep);

    let mut record: Option<HashMap<String, Value>> = None;
    let mut all_blank = true;
    let mut index = 0usize;

    let count = split_line(line, &opts.col_sep, opts.quote_char, mode, None, |raw| {
        let quoted = is_quoted_shape(raw, opts.quote_char, mode);
        let field = extract_field(raw, opts.quote_char, opts.strip_whitespace, mode);

        if !is_blank(&field) {
            all_blank = false;
        }
        let filtered = (opts.remove_empty_values && is_blank(&field))
            || (opts.remove_zero_values && is_zero_value(&field));

        if !filtered {
            let key = key_for(headers, index, &opts.missing_header_prefix);
            let value = make_value(&field, quoted, &key, opts);
            record.get_or_insert_with(HashMap::new).insert(key, value);
        }
        index += 1;
    })?;

    if opts.remove_empty_hashes && all_blank {
        return Ok((None, count));
    }

    // Pad missing trailing columns unless blank suppression is on.
    if count < headers.len() && !opts.remove_empty_values {
        let map = record.get_or_insert_with(HashMap::new);
        for header in &headers[count..] {
            map.insert(header.clone(), Value::Null);
        }
    }

    Ok((record, count))
}

fn key_for(headers: &[String], index: usize, prefix: &str) -> String {
    match headers.get(index) {
        Some(header) => header.clone(),
        None => format!("{prefix}{}", index + 1),
    }
}

fn make_value(field: &[u8], quoted: bool, key: &str, opts: &RecordOptions) -> Value {
    // Quoted fields stay strings no matter what.
    if !quoted && conversion_applies(&opts.convert_values_to_numeric, key) {
        if let Some(value) = coerce_numeric(field) {
            return value;
        }
    }
    Value::Text(opts.encoding.decode(field).into_owned())
}

fn conversion_applies(conv: &NumericConversion, key: &str) -> bool {
    match conv {
        NumericConversion::Never => false,
        NumericConversion::All => true,
        NumericConversion::Only(keys) => keys.iter().any(|k| k == key),
        NumericConversion::Except(keys) => !keys.iter().any(|k| k == key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_basic_record() {
        let (record, count) =
            parse_line_to_hash(b"1,2\n", &headers(&["a", "b"]), &RecordOptions::default())
                .unwrap();
        let record = record.unwrap();
        assert_eq!(count, 2);
        assert_eq!(record.get("a"), Some(&text("1")));
        assert_eq!(record.get("b"), Some(&text("2")));
    }

    #[test]
    fn test_numeric_coercion() {
        let opts = RecordOptions {
            convert_values_to_numeric: NumericConversion::All,
            ..RecordOptions::default()
        };
        let (record, count) =
            parse_line_to_hash(b"1,2.5,abc,\n", &headers(&["a", "b", "c", "d"]), &opts).unwrap();
        let record = record.unwrap();
        assert_eq!(count, 4);
        assert_eq!(record.get("a"), Some(&Value::Int(1)));
        assert_eq!(record.get("b"), Some(&Value::Float(2.5)));
        assert_eq!(record.get("c"), Some(&text("abc")));
        assert_eq!(record.get("d"), Some(&text("")));
    }

    #[test]
    fn test_quoted_fields_stay_strings() {
        let opts = RecordOptions {
            convert_values_to_numeric: NumericConversion::All,
            ..RecordOptions::default()
        };
        let (record, _) = parse_line_to_hash(b"\"1\",2", &headers(&["a", "b"]), &opts).unwrap();
        let record = record.unwrap();
        assert_eq!(record.get("a"), Some(&text("1")));
        assert_eq!(record.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_only_and_except_restrictions() {
        let only = RecordOptions {
            convert_values_to_numeric: NumericConversion::Only(vec!["a".into()]),
            ..RecordOptions::default()
        };
        let (record, _) = parse_line_to_hash(b"1,2", &headers(&["a", "b"]), &only).unwrap();
        let record = record.unwrap();
        assert_eq!(record.get("a"), Some(&Value::Int(1)));
        assert_eq!(record.get("b"), Some(&text("2")));

        let except = RecordOptions {
            convert_values_to_numeric: NumericConversion::Except(vec!["a".into()]),
            ..RecordOptions::default()
        };
        let (record, _) = parse_line_to_hash(b"1,2", &headers(&["a", "b"]), &except).unwrap();
        let record = record.unwrap();
        assert_eq!(record.get("a"), Some(&text("1")));
        assert_eq!(record.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_filters_and_count() {
        let opts = RecordOptions {
            strip_whitespace: true,
            remove_empty_values: true,
            remove_zero_values: true,
            ..RecordOptions::default()
        };
        let (record, count) =
            parse_line_to_hash(b"  42  ,  ,0\n", &headers(&["x", "y", "z"]), &opts).unwrap();
        let record = record.unwrap();
        assert_eq!(count, 3);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("x"), Some(&text("42")));
    }

    #[test]
    fn test_remove_empty_hashes_yields_none() {
        let opts = RecordOptions {
            remove_empty_values: true,
            remove_empty_hashes: true,
            ..RecordOptions::default()
        };
        let (record, count) = parse_line_to_hash(b" , ,\n", &headers(&["a", "b", "c"]), &opts).unwrap();
        assert_eq!(record, None);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_lazy_allocation_under_filters() {
        let opts = RecordOptions {
            remove_empty_values: true,
            ..RecordOptions::default()
        };
        let (record, count) = parse_line_to_hash(b",,\n", &headers(&["a", "b", "c"]), &opts).unwrap();
        // Every field filtered: the map was never allocated.
        assert_eq!(record, None);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_missing_columns_padded_with_null() {
        let (record, count) =
            parse_line_to_hash(b"1,2", &headers(&["a", "b", "c", "d"]), &RecordOptions::default())
                .unwrap();
        let record = record.unwrap();
        assert_eq!(count, 2);
        assert_eq!(record.get("c"), Some(&Value::Null));
        assert_eq!(record.get("d"), Some(&Value::Null));
    }

    #[test]
    fn test_extra_fields_get_synthetic_keys() {
        let (record, count) =
            parse_line_to_hash(b"1,2,3", &headers(&["a", "b"]), &RecordOptions::default())
                .unwrap();
        let record = record.unwrap();
        assert_eq!(count, 3);
        assert_eq!(record.get("column_3"), Some(&text("3")));
    }

    #[test]
    fn test_row_sep_suffix_trimmed() {
        let opts = RecordOptions {
            row_sep: b"\r\n".to_vec(),
            ..RecordOptions::default()
        };
        let (record, _) = parse_line_to_hash(b"x\r\n", &headers(&["a"]), &opts).unwrap();
        assert_eq!(record.unwrap().get("a"), Some(&text("x")));
    }

    #[test]
    fn test_backslash_escaping_mode() {
        let opts = RecordOptions {
            quote_escaping: QuoteEscaping::Backslash,
            ..RecordOptions::default()
        };
        let (record, count) =
            parse_line_to_hash(b"foo\\\"bar,baz", &headers(&["a", "b"]), &opts).unwrap();
        let record = record.unwrap();
        assert_eq!(count, 2);
        assert_eq!(record.get("a"), Some(&text("foo\"bar")));
        assert_eq!(record.get("b"), Some(&text("baz")));
    }
}
