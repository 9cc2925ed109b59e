use core::any::Any;
use core::ops::ControlFlow;
use std::io::Cursor;

use super::BinarySerializer;
use crate::error::{DecodeError, EncodeError};
use crate::{SharedObject, TypeRegistry};

/// Size of the intermediate buffer of [`encode_to_vec`].
const CHUNK_SIZE: usize = 4096;

/// Encodes `root` and everything it references into a new byte vector.
///
/// See [`BinarySerializer::encode`].
pub fn encode_to_vec(
    root: &SharedObject,
    shallow: bool,
    context: Option<&mut dyn Any>,
) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    let mut buffer = vec![0; CHUNK_SIZE];

    BinarySerializer::new().encode(
        root,
        &mut buffer,
        |chunk| {
            bytes.extend_from_slice(chunk);
            ControlFlow::Continue(())
        },
        shallow,
        context,
    )?;

    Ok(bytes)
}

/// Decodes the objects stored in `bytes`, returning the root.
///
/// See [`BinarySerializer::decode`].
pub fn decode_from_slice(
    registry: &TypeRegistry,
    bytes: &[u8],
    context: Option<&mut dyn Any>,
) -> Result<SharedObject, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    BinarySerializer::new().decode(registry, &mut cursor, bytes.len() as u64, context)
}
