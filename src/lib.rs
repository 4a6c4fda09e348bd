// briskcsv - streaming CSV parsing core
//
// Library safety: no unwrap/expect in production code. Fallible paths return
// Result and propagate with `?`.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//
// Layers, leaf first:
// L1 byte source      (core::source)   file or caller-provided stream
// L2 double buffer    (core::buffer)   paged reads with bounded carry-over
// L3 character cursor (core::cursor)   whole characters under an encoding
// L4 tokenizer        (parser)         quote-aware row assembly
// L5 line -> fields   (line::fields)   framed-line splitting
// L6 line -> record   (line::record)   keyed records with value transforms

pub mod core;
pub mod error;
pub mod line;
pub mod parser;

pub use crate::core::{
    BufferedIo, ByteSource, CharBytes, CharCursor, FileSource, IoSource, Rewind, StreamSource,
    TextEncoding, DEFAULT_BUFFER_SIZE, DEFAULT_CARRY_MAX, MAX_CARRY_ZONE,
};
pub use crate::error::{Error, Result};
pub use crate::line::{
    count_quote_chars, count_quote_chars_auto, parse_csv_line, parse_line_to_hash, LineOptions,
    NumericConversion, QuoteEscaping, RecordOptions, Value,
};
pub use crate::parser::{Parser, ParserConfig, MAX_FIELDS, MAX_ROW_BYTES};
