use alloc::sync::Arc;
use std::sync::RwLock;

use super::{Accessor, ArrayAccess};
use crate::error::FieldError;
use crate::info::TypeDescriptor;
use crate::{Reflectable, SharedObject, Typed};

// -----------------------------------------------------------------------------
// SharedSlot

/// Storage of a reference field.
///
/// - `Option<Arc<RwLock<T>>>` holds objects of exactly `T`.
/// - `Option<SharedObject>` holds objects of any reflectable type.
pub trait SharedSlot: Default + Send + Sync + 'static {
    /// Descriptor of the accepted type, `None` when any type is accepted.
    fn pointee_type() -> Option<&'static TypeDescriptor>;

    fn pointee_name() -> &'static str;

    fn to_shared(&self) -> Option<SharedObject>;

    /// Builds the slot from a handle, `None` if the object has the wrong type.
    fn from_shared(value: Option<SharedObject>) -> Option<Self>;
}

impl<T: Typed> SharedSlot for Option<Arc<RwLock<T>>> {
    #[inline]
    fn pointee_type() -> Option<&'static TypeDescriptor> {
        Some(T::rtti_static())
    }

    #[inline]
    fn pointee_name() -> &'static str {
        core::any::type_name::<T>()
    }

    #[inline]
    fn to_shared(&self) -> Option<SharedObject> {
        self.clone().map(SharedObject::from_arc)
    }

    #[inline]
    fn from_shared(value: Option<SharedObject>) -> Option<Self> {
        match value {
            None => Some(None),
            Some(shared) => shared.downcast::<T>().map(Some),
        }
    }
}

impl SharedSlot for Option<SharedObject> {
    #[inline]
    fn pointee_type() -> Option<&'static TypeDescriptor> {
        None
    }

    #[inline]
    fn pointee_name() -> &'static str {
        "dyn Reflectable"
    }

    #[inline]
    fn to_shared(&self) -> Option<SharedObject> {
        self.clone()
    }

    #[inline]
    fn from_shared(value: Option<SharedObject>) -> Option<Self> {
        Some(value)
    }
}

// -----------------------------------------------------------------------------
// ReflectablePtrAccess

/// Access to a [`ReflectablePtr`](crate::info::FieldCategory::ReflectablePtr) field.
pub trait ReflectablePtrAccess: ArrayAccess {
    /// See [`SharedSlot::pointee_type`].
    fn pointee_type(&self) -> Option<&'static TypeDescriptor>;

    fn get(&self, object: &dyn Reflectable, index: u32) -> Result<Option<SharedObject>, FieldError>;

    fn set(
        &self,
        object: &mut dyn Reflectable,
        index: u32,
        value: Option<SharedObject>,
    ) -> Result<(), FieldError>;
}

impl<S: Reflectable, P: SharedSlot> ReflectablePtrAccess for Accessor<S, P> {
    #[inline]
    fn pointee_type(&self) -> Option<&'static TypeDescriptor> {
        P::pointee_type()
    }

    #[inline]
    fn get(&self, object: &dyn Reflectable, index: u32) -> Result<Option<SharedObject>, FieldError> {
        Ok(self.element(object, index)?.to_shared())
    }

    fn set(
        &self,
        object: &mut dyn Reflectable,
        index: u32,
        value: Option<SharedObject>,
    ) -> Result<(), FieldError> {
        let slot = P::from_shared(value).ok_or(FieldError::PointeeTypeMismatch {
            field: self.field,
            expected: P::pointee_name(),
        })?;
        *self.element_mut(object, index)? = slot;
        Ok(())
    }
}
