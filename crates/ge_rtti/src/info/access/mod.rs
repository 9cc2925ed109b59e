//! Type-erased accessors behind [`FieldDescriptor`](crate::info::FieldDescriptor).
//!
//! Each category has its own object safe trait. They all work on
//! `&dyn Reflectable` and fail with [`FieldError::ObjectTypeMismatch`] when
//! given an object of another type.

// -----------------------------------------------------------------------------
// Modules

mod data_block;
mod plain;
mod ptr;
mod value;

// -----------------------------------------------------------------------------
// Exports

pub use data_block::DataBlockAccess;
pub use plain::PlainAccess;
pub use ptr::{ReflectablePtrAccess, SharedSlot};
pub use value::ReflectableAccess;

pub(crate) use data_block::DataBlockAccessor;

use crate::Reflectable;
use crate::error::FieldError;
use crate::info::plain::encoded_len;

// -----------------------------------------------------------------------------
// ArrayAccess

/// Element count access, shared by every category that supports arrays.
///
/// Scalar fields report a size of `1`.
pub trait ArrayAccess: Send + Sync {
    fn array_size(&self, object: &dyn Reflectable) -> Result<u32, FieldError>;

    fn set_array_size(&self, object: &mut dyn Reflectable, size: u32) -> Result<(), FieldError>;
}

// -----------------------------------------------------------------------------
// Accessor

/// How a field is reached from its owner `S`.
enum Slot<S, T> {
    Scalar {
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    },
    Array {
        get: fn(&S) -> &Vec<T>,
        get_mut: fn(&mut S) -> &mut Vec<T>,
        resize: fn(&mut Vec<T>, usize),
    },
}

/// The generic accessor implementing the plain, by-value and pointer traits.
pub(crate) struct Accessor<S, T> {
    field: &'static str,
    slot: Slot<S, T>,
}

impl<S: Reflectable, T: Send + Sync + 'static> Accessor<S, T> {
    #[inline]
    pub(crate) fn scalar(
        field: &'static str,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> Self {
        Self {
            field,
            slot: Slot::Scalar { get, get_mut },
        }
    }

    #[inline]
    pub(crate) fn array(
        field: &'static str,
        get: fn(&S) -> &Vec<T>,
        get_mut: fn(&mut S) -> &mut Vec<T>,
    ) -> Self
    where
        T: Default,
    {
        Self {
            field,
            slot: Slot::Array {
                get,
                get_mut,
                resize: |values, len| values.resize_with(len, T::default),
            },
        }
    }

    #[inline]
    fn owner<'a>(&self, object: &'a dyn Reflectable) -> Result<&'a S, FieldError> {
        object
            .downcast_ref::<S>()
            .ok_or(FieldError::ObjectTypeMismatch {
                expected: core::any::type_name::<S>(),
            })
    }

    #[inline]
    fn owner_mut<'a>(&self, object: &'a mut dyn Reflectable) -> Result<&'a mut S, FieldError> {
        object
            .downcast_mut::<S>()
            .ok_or(FieldError::ObjectTypeMismatch {
                expected: core::any::type_name::<S>(),
            })
    }

    #[inline]
    fn out_of_bounds(&self, index: u32, len: usize) -> FieldError {
        FieldError::IndexOutOfBounds {
            field: self.field,
            index,
            len: u32::try_from(len).unwrap_or(u32::MAX),
        }
    }

    pub(crate) fn element<'a>(
        &self,
        object: &'a dyn Reflectable,
        index: u32,
    ) -> Result<&'a T, FieldError> {
        let owner = self.owner(object)?;
        match &self.slot {
            Slot::Scalar { get, .. } if index == 0 => Ok(get(owner)),
            Slot::Scalar { .. } => Err(self.out_of_bounds(index, 1)),
            Slot::Array { get, .. } => {
                let values = get(owner);
                values
                    .get(index as usize)
                    .ok_or_else(|| self.out_of_bounds(index, values.len()))
            }
        }
    }

    pub(crate) fn element_mut<'a>(
        &self,
        object: &'a mut dyn Reflectable,
        index: u32,
    ) -> Result<&'a mut T, FieldError> {
        let owner = self.owner_mut(object)?;
        match &self.slot {
            Slot::Scalar { get_mut, .. } if index == 0 => Ok(get_mut(owner)),
            Slot::Scalar { .. } => Err(self.out_of_bounds(index, 1)),
            Slot::Array { get_mut, .. } => {
                let values = get_mut(owner);
                let len = values.len();
                values
                    .get_mut(index as usize)
                    .ok_or_else(|| self.out_of_bounds(index, len))
            }
        }
    }
}

impl<S: Reflectable, T: Send + Sync + 'static> ArrayAccess for Accessor<S, T> {
    fn array_size(&self, object: &dyn Reflectable) -> Result<u32, FieldError> {
        let owner = self.owner(object)?;
        match &self.slot {
            Slot::Scalar { .. } => Ok(1),
            Slot::Array { get, .. } => encoded_len(get(owner).len()),
        }
    }

    fn set_array_size(&self, object: &mut dyn Reflectable, size: u32) -> Result<(), FieldError> {
        let owner = self.owner_mut(object)?;
        match &self.slot {
            Slot::Scalar { .. } => Err(FieldError::NotAnArray { field: self.field }),
            Slot::Array {
                get_mut, resize, ..
            } => {
                resize(get_mut(owner), size as usize);
                Ok(())
            }
        }
    }
}
