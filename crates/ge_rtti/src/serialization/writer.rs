use core::ops::ControlFlow;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::EncodeError;

// -----------------------------------------------------------------------------
// ChunkWriter

/// Fills a caller buffer and hands every full chunk to `flush`.
///
/// The last partial chunk is handed over by [`finish`](Self::finish).
pub(crate) struct ChunkWriter<'b, F> {
    buffer: &'b mut [u8],
    len: usize,
    total: u64,
    flush: F,
}

impl<'b, F: FnMut(&[u8]) -> ControlFlow<()>> ChunkWriter<'b, F> {
    pub fn new(buffer: &'b mut [u8], flush: F) -> Result<Self, EncodeError> {
        if buffer.is_empty() {
            return Err(EncodeError::EmptyBuffer);
        }
        Ok(Self {
            buffer,
            len: 0,
            total: 0,
            flush,
        })
    }

    pub fn write(&mut self, mut bytes: &[u8]) -> Result<(), EncodeError> {
        while !bytes.is_empty() {
            if self.len == self.buffer.len() {
                self.flush_chunk()?;
            }
            let count = bytes.len().min(self.buffer.len() - self.len);
            self.buffer[self.len..self.len + count].copy_from_slice(&bytes[..count]);
            self.len += count;
            self.total += count as u64;
            bytes = &bytes[count..];
        }
        Ok(())
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<(), EncodeError> {
        let mut bytes = [0; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write(&bytes)
    }

    /// Writes a length as `u32`, failing when it does not fit.
    pub fn write_len(
        &mut self,
        len: usize,
        type_name: &'static str,
        field: &'static str,
    ) -> Result<(), EncodeError> {
        let len = u32::try_from(len).map_err(|_| EncodeError::PayloadTooLarge {
            type_name,
            field,
            size: len,
        })?;
        self.write_u32(len)
    }

    fn flush_chunk(&mut self) -> Result<(), EncodeError> {
        let chunk = &self.buffer[..self.len];
        self.len = 0;
        match (self.flush)(chunk) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(EncodeError::Aborted),
        }
    }

    /// Flushes the remaining bytes and returns the total written.
    pub fn finish(mut self) -> Result<u64, EncodeError> {
        if self.len > 0 {
            self.flush_chunk()?;
        }
        Ok(self.total)
    }
}

#[cfg(test)]
mod tests {
    use core::ops::ControlFlow;

    use super::ChunkWriter;
    use crate::error::EncodeError;

    #[test]
    fn splits_into_full_chunks() {
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut buffer = [0; 3];
        let mut writer = ChunkWriter::new(&mut buffer, |chunk: &[u8]| {
            chunks.push(chunk.to_vec());
            ControlFlow::Continue(())
        })
        .unwrap();

        writer.write(&[1, 2]).unwrap();
        writer.write_u32(0x0605_0403).unwrap();
        assert_eq!(writer.finish().unwrap(), 6);
        assert_eq!(chunks, [vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn empty_buffer_and_abort() {
        let mut empty: [u8; 0] = [];
        assert!(matches!(
            ChunkWriter::new(&mut empty, |_: &[u8]| ControlFlow::Continue(())),
            Err(EncodeError::EmptyBuffer)
        ));

        let mut buffer = [0; 2];
        let mut writer = ChunkWriter::new(&mut buffer, |_: &[u8]| ControlFlow::Break(())).unwrap();
        writer.write(&[1, 2]).unwrap();
        assert!(matches!(writer.write(&[3]), Err(EncodeError::Aborted)));
    }
}
