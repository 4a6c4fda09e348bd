// Double-buffered byte reader with bounded carry-over.
//
// Two fixed pages refill from the source in turn; at most `carry_max` unread
// tail bytes are copied to the head of the incoming page on refill, so short
// separators and multi-byte characters survive a page swap. `peek_bytes`
// assembles look-ahead without moving the read position: seekable sources are
// rewound after the read-ahead, non-seekable sources leave the read-ahead in
// an overflow region that later refills drain before touching the source
// again. Either way no byte is read from the source twice.

use log::trace;

use crate::core::source::{ByteSource, Rewind};
use crate::error::{Error, Result};

/// Page size presets.
pub const BUFFER_SIZE_256K: usize = 256 * 1024;
pub const BUFFER_SIZE_512K: usize = 512 * 1024;
pub const BUFFER_SIZE_1MB: usize = 1024 * 1024;

/// Default page size.
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Default carry-over bound: covers multi-byte characters, doubled quotes
/// and short newlines.
pub const DEFAULT_CARRY_MAX: usize = 16;

/// Hard ceiling on any configured carry window.
pub const MAX_CARRY_ZONE: usize = 4096;

/// Double-buffered reader over a [`ByteSource`].
pub struct BufferedIo<S: ByteSource> {
    source: S,
    active: Box<[u8]>,
    inactive: Box<[u8]>,
    /// Read cursor into the active page.
    pos: usize,
    /// Valid bytes in the active page.
    length: usize,
    inactive_len: usize,
    carry_max: usize,
    eof: bool,
    /// Look-ahead bytes read from a non-rewindable source, in stream order.
    /// Refills consume these before reading the source again.
    overflow: Vec<u8>,
    /// Assembly area for `peek_bytes`, sized by the request.
    scratch: Vec<u8>,
}

impl<S: ByteSource> BufferedIo<S> {
    /// Create a reader with the default carry window and perform the first
    /// refill, so `active[0..length)` is the first window.
    pub fn new(source: S, buffer_size: usize) -> Result<Self> {
        Self::with_carry(source, buffer_size, DEFAULT_CARRY_MAX)
    }

    /// Create a reader with an explicit carry window.
    pub fn with_carry(source: S, buffer_size: usize, carry_max: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::Config("buffer size must be non-zero".into()));
        }
        if carry_max > MAX_CARRY_ZONE {
            return Err(Error::Config(format!(
                "carry window {carry_max} exceeds the {MAX_CARRY_ZONE}-byte ceiling"
            )));
        }
        if carry_max >= buffer_size {
            return Err(Error::Config(format!(
                "carry window {carry_max} must be smaller than the {buffer_size}-byte page"
            )));
        }

        let mut io = BufferedIo {
            source,
            active: vec![0u8; buffer_size].into_boxed_slice(),
            inactive: vec![0u8; buffer_size].into_boxed_slice(),
            pos: 0,
            length: 0,
            inactive_len: 0,
            carry_max,
            eof: false,
            overflow: Vec::new(),
            scratch: Vec::new(),
        };
        io.refill()?;
        io.swap_pages();
        Ok(io)
    }

    /// Returns the next byte and advances, or `None` at end of input.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if !self.ensure_window()? {
            return Ok(None);
        }
        let b = self.active[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    /// Returns the next byte without advancing, or `None` at end of input.
    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        if !self.ensure_window()? {
            return Ok(None);
        }
        Ok(Some(self.active[self.pos]))
    }

    /// Returns up to `n` bytes starting at the read position, without
    /// advancing. The slice may be shorter than `n` near end of input and is
    /// empty at EOF.
    pub fn peek_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.scratch.clear();
        if n == 0 {
            return Ok(&self.scratch);
        }
        self.scratch.reserve(n);

        // 1. Window tail.
        let remaining = self.length - self.pos;
        let take = remaining.min(n);
        self.scratch
            .extend_from_slice(&self.active[self.pos..self.pos + take]);

        // 2. Overflow bytes from earlier look-ahead sit between the window
        //    and the source's current position.
        if self.scratch.len() < n && !self.overflow.is_empty() {
            let want = n - self.scratch.len();
            let take = want.min(self.overflow.len());
            self.scratch.extend_from_slice(&self.overflow[..take]);
        }

        // 3. Read ahead from the source, then undo it.
        if self.scratch.len() < n && !self.eof {
            let start = self.scratch.len();
            self.scratch.resize(n, 0);
            let mut got = 0;
            loop {
                let r = self.source.read(&mut self.scratch[start + got..n])?;
                if r == 0 {
                    break;
                }
                got += r;
                if start + got == n {
                    break;
                }
            }
            self.scratch.truncate(start + got);
            if got > 0 {
                match self.source.rewind(got as u64) {
                    Ok(Rewind::Done) => {}
                    Ok(Rewind::Unsupported) => {
                        self.overflow.extend_from_slice(&self.scratch[start..]);
                    }
                    Err(e) => return Err(Error::LookAheadUnsupported(e)),
                }
            }
        }

        Ok(&self.scratch)
    }

    /// True once the source is exhausted and every buffered byte has been
    /// consumed.
    pub fn is_eof(&self) -> bool {
        self.eof && self.pos >= self.length && self.overflow.is_empty()
    }

    /// Make at least one byte available in the active window, refilling and
    /// swapping pages as needed. Returns false at end of input.
    fn ensure_window(&mut self) -> Result<bool> {
        while self.pos >= self.length {
            if self.eof && self.overflow.is_empty() {
                return Ok(false);
            }
            self.refill()?;
            if self.inactive_len == 0 {
                return Ok(false);
            }
            self.swap_pages();
        }
        Ok(true)
    }

    /// Refill protocol: carry the unread tail of the active page into the
    /// head of the inactive page, drain pending overflow bytes, then read
    /// fresh bytes from the source.
    fn refill(&mut self) -> Result<()> {
        let remaining = self.length - self.pos;
        let carry = remaining.min(self.carry_max);
        if carry > 0 {
            let tail = self.length - carry;
            self.inactive[..carry].copy_from_slice(&self.active[tail..self.length]);
        }
        self.length = 0;

        let page = self.inactive.len();
        let mut filled = carry;

        if !self.overflow.is_empty() {
            let take = self.overflow.len().min(page - filled);
            self.inactive[filled..filled + take].copy_from_slice(&self.overflow[..take]);
            self.overflow.drain(..take);
            filled += take;
        }

        let mut got = 0;
        if filled < page && self.overflow.is_empty() {
            loop {
                let n = self.source.read(&mut self.inactive[filled..page])?;
                if n == 0 {
                    break;
                }
                filled += n;
                got += n;
                if filled == page {
                    break;
                }
            }
            if got == 0 && filled == carry {
                self.eof = true;
            }
        }

        self.inactive_len = filled;
        trace!("refill: carry={carry} got={got} filled={filled} eof={}", self.eof);
        Ok(())
    }

    fn swap_pages(&mut self) {
        std::mem::swap(&mut self.active, &mut self.inactive);
        self.length = self.inactive_len;
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::{IoSource, StreamSource};
    use std::io::Cursor;

    fn seekable(data: &[u8]) -> IoSource<Cursor<Vec<u8>>> {
        IoSource::new(Cursor::new(data.to_vec()))
    }

    fn drain<S: ByteSource>(io: &mut BufferedIo<S>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = io.next_byte().unwrap() {
            out.push(b);
        }
        out
    }

    #[test]
    fn test_next_byte_concatenation_identity() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        // Page far smaller than the input forces many refills.
        let mut io = BufferedIo::with_carry(seekable(&data), 64, 16).unwrap();
        assert_eq!(drain(&mut io), data);
        assert!(io.is_eof());
    }

    #[test]
    fn test_empty_source_is_eof_immediately() {
        let mut io = BufferedIo::new(seekable(b""), 64).unwrap();
        assert!(io.is_eof());
        assert_eq!(io.next_byte().unwrap(), None);
        assert_eq!(io.peek_byte().unwrap(), None);
    }

    #[test]
    fn test_peek_byte_does_not_advance() {
        let mut io = BufferedIo::new(seekable(b"ab"), 64).unwrap();
        assert_eq!(io.peek_byte().unwrap(), Some(b'a'));
        assert_eq!(io.peek_byte().unwrap(), Some(b'a'));
        assert_eq!(io.next_byte().unwrap(), Some(b'a'));
        assert_eq!(io.next_byte().unwrap(), Some(b'b'));
        assert_eq!(io.next_byte().unwrap(), None);
    }

    #[test]
    fn test_peek_bytes_matches_subsequent_next_byte() {
        let data = b"0123456789abcdef0123456789abcdef";
        let mut io = BufferedIo::with_carry(seekable(data), 8, 4).unwrap();
        // Peek past the window boundary (8-byte pages, 12-byte request).
        let peeked = io.peek_bytes(12).unwrap().to_vec();
        assert_eq!(peeked.len(), 12);
        for expect in peeked {
            assert_eq!(io.next_byte().unwrap(), Some(expect));
        }
        assert_eq!(drain(&mut io), &data[12..]);
    }

    #[test]
    fn test_peek_bytes_short_near_eof() {
        let mut io = BufferedIo::new(seekable(b"xyz"), 64).unwrap();
        assert_eq!(io.peek_bytes(10).unwrap(), b"xyz");
        assert_eq!(drain(&mut io), b"xyz");
        assert_eq!(io.peek_bytes(10).unwrap(), b"");
    }

    #[test]
    fn test_non_seekable_overflow_path() {
        let data = b"abcdefghijklmnopqrstuvwxyz";
        let src = StreamSource::new(Cursor::new(data.to_vec()));
        let mut io = BufferedIo::with_carry(src, 8, 4).unwrap();
        // Look-ahead past the page forces a source read that cannot be
        // rewound; the bytes must come back in order via the overflow region.
        let peeked = io.peek_bytes(20).unwrap().to_vec();
        assert_eq!(&peeked, &data[..20]);
        assert_eq!(drain(&mut io), data);
    }

    #[test]
    fn test_non_seekable_repeated_peeks_are_stable() {
        let src = StreamSource::new(Cursor::new(b"abcdefghij".to_vec()));
        let mut io = BufferedIo::with_carry(src, 4, 2).unwrap();
        assert_eq!(io.peek_bytes(8).unwrap(), b"abcdefgh");
        assert_eq!(io.peek_bytes(8).unwrap(), b"abcdefgh");
        assert_eq!(io.peek_bytes(10).unwrap(), b"abcdefghij");
        assert_eq!(drain(&mut io), b"abcdefghij");
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            BufferedIo::new(seekable(b""), 0),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BufferedIo::with_carry(seekable(b""), 1024, MAX_CARRY_ZONE + 1),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BufferedIo::with_carry(seekable(b""), 16, 16),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_peek_bytes_zero_is_empty() {
        let mut io = BufferedIo::new(seekable(b"abc"), 64).unwrap();
        assert_eq!(io.peek_bytes(0).unwrap(), b"");
        assert_eq!(io.next_byte().unwrap(), Some(b'a'));
    }
}
