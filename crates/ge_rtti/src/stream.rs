use alloc::sync::Arc;
use core::fmt;
use std::io::{self, Read, Seek, SeekFrom};

// -----------------------------------------------------------------------------
// MemoryDataStream

/// An immutable, cheaply clonable in-memory byte stream.
///
/// Data block fields exchange their contents through this type. Clones share
/// the bytes but keep their own read position.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use ge_rtti::MemoryDataStream;
///
/// let mut stream = MemoryDataStream::from(vec![1_u8, 2, 3, 4]);
/// let mut head = [0; 2];
/// stream.read_exact(&mut head).unwrap();
///
/// assert_eq!(head, [1, 2]);
/// assert_eq!(stream.position(), 2);
/// assert_eq!(stream.len(), 4);
/// ```
#[derive(Clone, Default)]
pub struct MemoryDataStream {
    data: Arc<[u8]>,
    position: usize,
}

impl MemoryDataStream {
    #[inline]
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Total number of bytes, independent of the read position.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// All bytes of the stream.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from the read position to the end.
    #[inline]
    pub fn remaining(&self) -> &[u8] {
        self.data.get(self.position..).unwrap_or_default()
    }

    /// At most `size` bytes from the read position, the extent of a data block.
    #[inline]
    pub fn block(&self, size: u32) -> &[u8] {
        let remaining = self.remaining();
        &remaining[..remaining.len().min(size as usize)]
    }
}

impl From<Vec<u8>> for MemoryDataStream {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for MemoryDataStream {
    #[inline]
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl Read for MemoryDataStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }
}

impl Seek for MemoryDataStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(offset) => (0_i128, offset as i128),
            SeekFrom::End(offset) => (self.data.len() as i128, offset as i128),
            SeekFrom::Current(offset) => (self.position as i128, offset as i128),
        };
        let target = base + offset;
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the stream",
            ));
        }
        self.position = usize::try_from(target)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek out of range"))?;
        Ok(self.position as u64)
    }
}

impl PartialEq for MemoryDataStream {
    /// Streams are equal when their bytes are, positions are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for MemoryDataStream {}

impl fmt::Debug for MemoryDataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataStream")
            .field("len", &self.data.len())
            .field("position", &self.position)
            .finish()
    }
}
