// Byte source capability: where the double buffer pulls its bytes from.
//
// Two shapes exist upstream: a file the parser owns outright, and a
// caller-provided reader that must outlive the parser. Look-ahead needs a
// relative rewind; sources that cannot move backwards report `Unsupported`
// and the double buffer retains the read-ahead bytes itself (see buffer.rs).

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Outcome of a rewind request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewind {
    /// The source moved its read position back by the requested amount.
    Done,
    /// The source cannot move backwards; the caller must keep the bytes.
    Unsupported,
}

/// Capability over anything that produces bytes on demand.
pub trait ByteSource {
    /// Read up to `dst.len()` bytes into `dst`; 0 means end of input.
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    /// Move the read position back by `n` bytes.
    fn rewind(&mut self, n: u64) -> io::Result<Rewind>;
}

fn negative_delta(n: u64) -> io::Result<i64> {
    i64::try_from(n)
        .map(|d| -d)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "rewind distance too large"))
}

/// A file owned by the parser, closed on drop.
pub struct FileSource {
    file: File,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(FileSource {
            file: File::open(path)?,
        })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.file.read(dst)
    }

    fn rewind(&mut self, n: u64) -> io::Result<Rewind> {
        self.file.seek(SeekFrom::Current(negative_delta(n)?))?;
        Ok(Rewind::Done)
    }
}

/// A caller-provided seekable reader.
pub struct IoSource<R: Read + Seek> {
    inner: R,
}

impl<R: Read + Seek> IoSource<R> {
    pub fn new(inner: R) -> Self {
        IoSource { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> ByteSource for IoSource<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.inner.read(dst)
    }

    fn rewind(&mut self, n: u64) -> io::Result<Rewind> {
        self.inner.seek(SeekFrom::Current(negative_delta(n)?))?;
        Ok(Rewind::Done)
    }
}

/// A caller-provided reader with no way back. Look-ahead bytes read past the
/// current position stay in the double buffer's overflow region instead of
/// being rewound.
pub struct StreamSource<R: Read> {
    inner: R,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        StreamSource { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.inner.read(dst)
    }

    fn rewind(&mut self, _n: u64) -> io::Result<Rewind> {
        Ok(Rewind::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_io_source_read_and_rewind() {
        let mut src = IoSource::new(Cursor::new(b"hello".to_vec()));
        let mut buf = [0u8; 3];
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");

        assert_eq!(src.rewind(2).unwrap(), Rewind::Done);
        let mut rest = Vec::new();
        src.into_inner().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"ello");
    }

    #[test]
    fn test_stream_source_reports_unsupported() {
        let mut src = StreamSource::new(Cursor::new(b"abc".to_vec()));
        assert_eq!(src.rewind(1).unwrap(), Rewind::Unsupported);
    }

    #[test]
    fn test_file_source_reads_from_disk() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"a,b,c\n").unwrap();

        let mut src = FileSource::open(tmp.path()).unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(src.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"a,b,c\n");
        assert_eq!(src.rewind(6).unwrap(), Rewind::Done);
        assert_eq!(src.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"a,b,c\n");
    }
}
