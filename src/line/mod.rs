// Framed-line parsers: used when an upstream reader hands over whole logical
// lines instead of a byte stream.

pub mod fields;
pub mod quotes;
pub mod record;
mod split;
mod value;

pub use fields::*;
pub use quotes::*;
pub use record::*;
