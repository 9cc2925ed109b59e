use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::wire::{FieldMetaData, ObjectMetaData};
use crate::error::DecodeError;
use crate::info::FieldCategory;

// -----------------------------------------------------------------------------
// StreamReader

/// Reads the units of the binary format from `length` bytes of a stream.
pub(crate) struct StreamReader<'r, R: ?Sized> {
    inner: &'r mut R,
    position: u64,
    end: u64,
}

#[inline]
fn read_error(err: io::Error) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::Truncated
    } else {
        DecodeError::Io(err)
    }
}

impl<'r, R: Read + Seek + ?Sized> StreamReader<'r, R> {
    /// Starts at the current position of `inner`.
    pub fn new(inner: &'r mut R, length: u64) -> Result<Self, DecodeError> {
        let position = inner.stream_position()?;
        Ok(Self {
            inner,
            position,
            end: position.saturating_add(length),
        })
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.position)
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.position >= self.end
    }

    #[inline]
    fn ensure(&self, len: u64) -> Result<(), DecodeError> {
        if len > self.remaining() {
            Err(DecodeError::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4)?;
        let value = self.inner.read_u32::<LittleEndian>().map_err(read_error)?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_bytes(&mut self, len: u32) -> Result<Vec<u8>, DecodeError> {
        self.ensure(u64::from(len))?;
        let mut bytes = vec![0; len as usize];
        self.inner.read_exact(&mut bytes).map_err(read_error)?;
        self.position += u64::from(len);
        Ok(bytes)
    }

    pub fn skip(&mut self, len: u64) -> Result<(), DecodeError> {
        self.ensure(len)?;
        let offset = i64::try_from(len).map_err(|_| DecodeError::Truncated)?;
        self.inner.seek(SeekFrom::Current(offset))?;
        self.position += len;
        Ok(())
    }

    pub fn seek_to(&mut self, position: u64) -> Result<(), DecodeError> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    pub fn read_object_meta(&mut self) -> Result<ObjectMetaData, DecodeError> {
        let word = self.read_u32()?;
        if !ObjectMetaData::is_object_word(word) {
            return Err(DecodeError::Malformed("expected object metadata"));
        }
        ObjectMetaData::from_words(word, self.read_u32()?)
    }

    // -------------------------------------------------------------------------
    // Skipping

    /// Skips fields and base levels up to and including the terminator.
    pub fn skip_object_body(&mut self) -> Result<(), DecodeError> {
        loop {
            let word = self.read_u32()?;
            if ObjectMetaData::is_object_word(word) {
                let meta = ObjectMetaData::from_words(word, self.read_u32()?)?;
                if !meta.is_base_class {
                    return Err(DecodeError::Malformed("object starts inside another object"));
                }
                continue;
            }

            let meta = FieldMetaData::from_word(word)?;
            if meta.is_terminator() {
                return Ok(());
            }
            self.skip_field(meta)?;
        }
    }

    /// Skips the payload of a field using only its metadata.
    pub fn skip_field(&mut self, meta: FieldMetaData) -> Result<(), DecodeError> {
        if meta.category() == FieldCategory::DataBlock {
            let size = self.read_u32()?;
            return self.skip(u64::from(size));
        }

        let count = if meta.is_array() { self.read_u32()? } else { 1 };
        if meta.category() == FieldCategory::Plain && !meta.has_dynamic_size() {
            return self.skip(u64::from(count) * u64::from(meta.size));
        }
        for _ in 0..count {
            self.skip_element(meta)?;
        }
        Ok(())
    }

    /// Skips one element of an array field, or the value of a scalar field.
    pub fn skip_element(&mut self, meta: FieldMetaData) -> Result<(), DecodeError> {
        match meta.category() {
            FieldCategory::Plain if meta.has_dynamic_size() => {
                let len = self.read_u32()?;
                self.skip(u64::from(len))
            }
            FieldCategory::Plain => self.skip(u64::from(meta.size)),
            FieldCategory::ReflectablePtr => self.skip(4),
            FieldCategory::Reflectable => {
                self.read_object_meta()?;
                self.skip_object_body()
            }
            FieldCategory::DataBlock => {
                let size = self.read_u32()?;
                self.skip(u64::from(size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::StreamReader;
    use crate::error::DecodeError;

    #[test]
    fn reads_within_length() {
        let bytes = [1, 0, 0, 0, 2, 0, 0, 0, 9, 9];
        let mut cursor = Cursor::new(&bytes[..]);
        let mut reader = StreamReader::new(&mut cursor, 6).unwrap();

        assert_eq!(reader.read_u32().unwrap(), 1);
        assert_eq!(reader.remaining(), 2);
        assert!(matches!(reader.read_u32(), Err(DecodeError::Truncated)));
        assert!(matches!(reader.read_bytes(3), Err(DecodeError::Truncated)));
        assert_eq!(reader.read_bytes(2).unwrap(), [2, 0]);
        assert!(reader.is_at_end());

        reader.seek_to(0).unwrap();
        reader.skip(4).unwrap();
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn short_stream_is_truncated() {
        let bytes = [1, 0];
        let mut cursor = Cursor::new(&bytes[..]);
        let mut reader = StreamReader::new(&mut cursor, 8).unwrap();
        assert!(matches!(reader.read_u32(), Err(DecodeError::Truncated)));
    }
}
