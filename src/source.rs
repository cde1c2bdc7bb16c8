//! Byte sources: random-access reads over the immutable original message.
//!
//! The structure parser and the accessors never hold message bytes beyond
//! the range they were asked for. Everything goes through [`ByteSource`],
//! backed either by an in-memory buffer or a memory-mapped file.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{MimeError, Result};

/// Random-access reads over a fixed, immutable byte sequence.
///
/// Implementations must support independent positioned reads: `read_range`
/// takes `&self` and may be called concurrently. A caller-supplied source
/// built on a shared seek cursor must serialize internally.
pub trait ByteSource: Send + Sync {
    /// Total length of the underlying message in bytes.
    fn len(&self) -> u64;

    /// Read the bytes in `[start, end)`.
    ///
    /// Fails with [`MimeError::InvalidRange`] if the range is reversed or
    /// extends past the end of the source.
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>>;

    /// `true` if the source contains no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validate a requested range against the source length.
fn check_range(start: u64, end: u64, len: u64) -> Result<()> {
    if start > end || end > len {
        return Err(MimeError::InvalidRange { start, end, len });
    }
    Ok(())
}

/// In-memory message source.
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    /// Wrap an owned buffer.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        check_range(start, end, self.len())?;
        Ok(self.data[start as usize..end as usize].to_vec())
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for MemorySource {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl From<String> for MemorySource {
    fn from(data: String) -> Self {
        Self::new(data.into_bytes())
    }
}

/// File-backed message source using a read-only memory mapping.
///
/// Mapped reads are positioned, so concurrent `read_range` calls need no
/// cursor serialization. The mapping and the file handle are released on
/// drop; when the file is an anonymous temp file (see
/// [`FileSource::from_reader`]) the file itself disappears with it.
pub struct FileSource {
    // Mapping an empty file fails on some platforms, so zero-length
    // sources carry no map at all.
    mmap: Option<Mmap>,
    len: u64,
    // Keeps the handle (and any anonymous temp file) alive with the map.
    _file: File,
}

impl FileSource {
    /// Open and map a message file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_file(file)
    }

    /// Map an already-open file.
    pub fn from_file(file: File) -> Result<Self> {
        let len = file.metadata()?.len();
        let mmap = if len == 0 {
            None
        } else {
            // Safety: the source contract declares the file immutable for
            // the lifetime of the parse session.
            Some(unsafe { Mmap::map(&file)? })
        };
        debug!(len, "Mapped message source");
        Ok(Self {
            mmap,
            len,
            _file: file,
        })
    }

    /// Cache a stream into an anonymous temp file and map it.
    ///
    /// The temp file is created unlinked where the platform allows, and is
    /// deleted when the source is dropped on every exit path.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut tmp = tempfile::tempfile()?;
        let copied = io::copy(&mut reader, &mut tmp)?;
        tmp.flush()?;
        debug!(bytes = copied, "Cached stream to temp file");
        Self::from_file(tmp)
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        check_range(start, end, self.len)?;
        match &self.mmap {
            Some(map) => Ok(map[start as usize..end as usize].to_vec()),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_read_range() {
        let src = MemorySource::from("hello world".as_bytes());
        assert_eq!(src.len(), 11);
        assert_eq!(src.read_range(0, 5).unwrap(), b"hello");
        assert_eq!(src.read_range(6, 11).unwrap(), b"world");
        assert_eq!(src.read_range(4, 4).unwrap(), b"");
    }

    #[test]
    fn test_memory_source_range_out_of_bounds() {
        let src = MemorySource::from("abc".as_bytes());
        assert!(matches!(
            src.read_range(0, 4),
            Err(MimeError::InvalidRange { .. })
        ));
        assert!(matches!(
            src.read_range(3, 2),
            Err(MimeError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_file_source_from_reader() {
        let data = b"Subject: hi\r\n\r\nBody".as_slice();
        let src = FileSource::from_reader(data).unwrap();
        assert_eq!(src.len(), data.len() as u64);
        assert_eq!(src.read_range(0, 7).unwrap(), b"Subject");
    }

    #[test]
    fn test_file_source_empty() {
        let src = FileSource::from_reader(std::io::empty()).unwrap();
        assert_eq!(src.len(), 0);
        assert!(src.is_empty());
        assert_eq!(src.read_range(0, 0).unwrap(), b"");
    }
}
