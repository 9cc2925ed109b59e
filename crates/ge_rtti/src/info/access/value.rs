use super::{Accessor, ArrayAccess};
use crate::error::FieldError;
use crate::info::TypeDescriptor;
use crate::{Reflectable, Typed};

// -----------------------------------------------------------------------------
// ReflectableAccess

/// Access to a [`Reflectable`](crate::info::FieldCategory::Reflectable) field,
/// an object stored by value inside its owner.
pub trait ReflectableAccess: ArrayAccess {
    /// Descriptor of the stored type.
    fn value_type(&self) -> &'static TypeDescriptor;

    /// A default instance of the stored type.
    fn new_object(&self) -> Box<dyn Reflectable>;

    fn get<'a>(
        &self,
        object: &'a dyn Reflectable,
        index: u32,
    ) -> Result<&'a dyn Reflectable, FieldError>;

    fn get_mut<'a>(
        &self,
        object: &'a mut dyn Reflectable,
        index: u32,
    ) -> Result<&'a mut dyn Reflectable, FieldError>;

    /// Moves `value` into the field. It must be of the stored type.
    fn set(
        &self,
        object: &mut dyn Reflectable,
        index: u32,
        value: Box<dyn Reflectable>,
    ) -> Result<(), FieldError>;
}

impl<S: Reflectable, T: Typed + Default> ReflectableAccess for Accessor<S, T> {
    #[inline]
    fn value_type(&self) -> &'static TypeDescriptor {
        T::rtti_static()
    }

    #[inline]
    fn new_object(&self) -> Box<dyn Reflectable> {
        Box::new(T::default())
    }

    #[inline]
    fn get<'a>(
        &self,
        object: &'a dyn Reflectable,
        index: u32,
    ) -> Result<&'a dyn Reflectable, FieldError> {
        let value: &dyn Reflectable = self.element(object, index)?;
        Ok(value)
    }

    #[inline]
    fn get_mut<'a>(
        &self,
        object: &'a mut dyn Reflectable,
        index: u32,
    ) -> Result<&'a mut dyn Reflectable, FieldError> {
        let value: &mut dyn Reflectable = self.element_mut(object, index)?;
        Ok(value)
    }

    fn set(
        &self,
        object: &mut dyn Reflectable,
        index: u32,
        value: Box<dyn Reflectable>,
    ) -> Result<(), FieldError> {
        let value = value
            .downcast::<T>()
            .map_err(|_| FieldError::ObjectTypeMismatch {
                expected: core::any::type_name::<T>(),
            })?;
        *self.element_mut(object, index)? = *value;
        Ok(())
    }
}
