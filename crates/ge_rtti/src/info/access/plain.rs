use super::{Accessor, ArrayAccess};
use crate::Reflectable;
use crate::error::FieldError;
use crate::info::PlainType;
use crate::info::plain::encoded_len;

// -----------------------------------------------------------------------------
// PlainAccess

/// Access to a [`Plain`](crate::info::FieldCategory::Plain) field.
pub trait PlainAccess: ArrayAccess {
    /// Appends the encoded element at `index` to `out`.
    fn to_buffer(
        &self,
        object: &dyn Reflectable,
        index: u32,
        out: &mut Vec<u8>,
    ) -> Result<(), FieldError>;

    /// Replaces the element at `index` with the value encoded in `bytes`.
    fn from_buffer(
        &self,
        object: &mut dyn Reflectable,
        index: u32,
        bytes: &[u8],
    ) -> Result<(), FieldError>;

    /// Encoded size of the element at `index`.
    fn dynamic_size(&self, object: &dyn Reflectable, index: u32) -> Result<u32, FieldError> {
        let mut out = Vec::new();
        self.to_buffer(object, index, &mut out)?;
        encoded_len(out.len())
    }
}

impl<S: Reflectable, T: PlainType> PlainAccess for Accessor<S, T> {
    #[inline]
    fn to_buffer(
        &self,
        object: &dyn Reflectable,
        index: u32,
        out: &mut Vec<u8>,
    ) -> Result<(), FieldError> {
        self.element(object, index)?.write_bytes(out)
    }

    fn from_buffer(
        &self,
        object: &mut dyn Reflectable,
        index: u32,
        bytes: &[u8],
    ) -> Result<(), FieldError> {
        let value = T::read_bytes(bytes)?;
        *self.element_mut(object, index)? = value;
        Ok(())
    }
}
