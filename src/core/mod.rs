// Low-level streaming primitives: byte sources, the double buffer, and the
// encoding-aware character cursor.

pub mod buffer;
pub mod cursor;
pub mod encoding;
pub mod source;

pub use buffer::*;
pub use cursor::*;
pub use encoding::*;
pub use source::*;
