use crate::error::FieldError;
use crate::{MemoryDataStream, Reflectable};

// -----------------------------------------------------------------------------
// DataBlockAccess

/// Access to a [`DataBlock`](crate::info::FieldCategory::DataBlock) field,
/// an opaque block of bytes exchanged as a stream and an explicit size.
///
/// Data block fields are never arrays.
pub trait DataBlockAccess: Send + Sync {
    fn get(&self, object: &dyn Reflectable) -> Result<(MemoryDataStream, u32), FieldError>;

    fn set(
        &self,
        object: &mut dyn Reflectable,
        stream: MemoryDataStream,
        size: u32,
    ) -> Result<(), FieldError>;
}

pub(crate) struct DataBlockAccessor<S> {
    get: fn(&S) -> (MemoryDataStream, u32),
    set: fn(&mut S, MemoryDataStream, u32),
}

impl<S> DataBlockAccessor<S> {
    #[inline]
    pub(crate) fn new(
        get: fn(&S) -> (MemoryDataStream, u32),
        set: fn(&mut S, MemoryDataStream, u32),
    ) -> Self {
        Self { get, set }
    }
}

#[inline]
fn mismatch<S>() -> FieldError {
    FieldError::ObjectTypeMismatch {
        expected: core::any::type_name::<S>(),
    }
}

impl<S: Reflectable> DataBlockAccess for DataBlockAccessor<S> {
    fn get(&self, object: &dyn Reflectable) -> Result<(MemoryDataStream, u32), FieldError> {
        let owner = object.downcast_ref::<S>().ok_or_else(mismatch::<S>)?;
        Ok((self.get)(owner))
    }

    fn set(
        &self,
        object: &mut dyn Reflectable,
        stream: MemoryDataStream,
        size: u32,
    ) -> Result<(), FieldError> {
        let owner = object.downcast_mut::<S>().ok_or_else(mismatch::<S>)?;
        (self.set)(owner, stream, size);
        Ok(())
    }
}
