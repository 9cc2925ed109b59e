use core::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::access::{
    ArrayAccess, DataBlockAccess, PlainAccess, ReflectableAccess, ReflectablePtrAccess,
};
use crate::Reflectable;
use crate::error::FieldError;

// -----------------------------------------------------------------------------
// FieldCategory

/// How a field is stored and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldCategory {
    /// Raw bytes of a [`PlainType`](crate::info::PlainType).
    Plain,
    /// A reflectable object stored by value, encoded inline.
    Reflectable,
    /// A shared reference to a reflectable object, encoded as an object id.
    ReflectablePtr,
    /// An opaque block of bytes with an explicit size.
    DataBlock,
}

// -----------------------------------------------------------------------------
// FieldFlags

bitflags! {
    /// Optional per-field flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// A reference that does not keep its target "before" the owner.
        ///
        /// Weak references may form cycles. They are excluded from the decode
        /// ordering and from circular reference checks, so consumers must not
        /// rely on the target being populated before their own
        /// `on_deserialization_ended` hook.
        const WEAK_REF = 1 << 0;
    }
}

// -----------------------------------------------------------------------------
// FieldDescriptor

pub(crate) enum FieldAccess {
    Plain(Box<dyn PlainAccess>),
    Reflectable(Box<dyn ReflectableAccess>),
    ReflectablePtr(Box<dyn ReflectablePtrAccess>),
    DataBlock(Box<dyn DataBlockAccess>),
}

/// Describes one serializable attribute of a type.
///
/// Created by [`TypeDescriptorBuilder`](crate::info::TypeDescriptorBuilder),
/// owned by its [`TypeDescriptor`](crate::info::TypeDescriptor) and immutable afterwards.
pub struct FieldDescriptor {
    unique_id: u16,
    name: &'static str,
    flags: FieldFlags,
    is_array: bool,
    resizable: bool,
    type_size: u32,
    has_dynamic_size: bool,
    access: FieldAccess,
}

impl FieldDescriptor {
    pub(crate) fn new(
        unique_id: u16,
        name: &'static str,
        is_array: bool,
        type_size: u32,
        has_dynamic_size: bool,
        access: FieldAccess,
    ) -> Self {
        Self {
            unique_id,
            name,
            flags: FieldFlags::empty(),
            is_array,
            resizable: is_array,
            type_size,
            has_dynamic_size,
            access,
        }
    }

    #[inline]
    pub(crate) fn insert_flags(&mut self, flags: FieldFlags) {
        self.flags.insert(flags);
    }

    #[inline]
    pub(crate) fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable && self.is_array;
    }

    /// The stable id that identifies this field in the stream.
    #[inline]
    pub fn unique_id(&self) -> u16 {
        self.unique_id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    #[inline]
    pub fn is_weak_ref(&self) -> bool {
        self.flags.contains(FieldFlags::WEAK_REF)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    #[inline]
    pub fn category(&self) -> FieldCategory {
        match self.access {
            FieldAccess::Plain(_) => FieldCategory::Plain,
            FieldAccess::Reflectable(_) => FieldCategory::Reflectable,
            FieldAccess::ReflectablePtr(_) => FieldCategory::ReflectablePtr,
            FieldAccess::DataBlock(_) => FieldCategory::DataBlock,
        }
    }

    /// Static size of one element in bytes, `0` when the size is dynamic or
    /// the category encodes its own length.
    #[inline]
    pub fn type_size(&self) -> u32 {
        self.type_size
    }

    #[inline]
    pub fn has_dynamic_size(&self) -> bool {
        self.has_dynamic_size
    }

    /// `false` for arrays registered with
    /// [`readonly_size`](crate::info::TypeDescriptorBuilder::readonly_size).
    #[inline]
    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    fn array_access(&self) -> Result<&dyn ArrayAccess, FieldError> {
        if !self.is_array {
            return Err(FieldError::NotAnArray { field: self.name });
        }
        match &self.access {
            FieldAccess::Plain(access) => Ok(&**access as &dyn ArrayAccess),
            FieldAccess::Reflectable(access) => Ok(&**access as &dyn ArrayAccess),
            FieldAccess::ReflectablePtr(access) => Ok(&**access as &dyn ArrayAccess),
            FieldAccess::DataBlock(_) => Err(FieldError::DataBlockArray { field: self.name }),
        }
    }

    /// Number of elements of an array field.
    pub fn array_size(&self, object: &dyn Reflectable) -> Result<u32, FieldError> {
        self.array_access()?.array_size(object)
    }

    /// Resizes an array field, new elements are default values.
    pub fn set_array_size(&self, object: &mut dyn Reflectable, size: u32) -> Result<(), FieldError> {
        let access = self.array_access()?;
        if !self.resizable {
            return Err(FieldError::NoArraySizeSetter { field: self.name });
        }
        access.set_array_size(object, size)
    }

    /// Element count to iterate: the array size, or `1` for scalar fields.
    pub(crate) fn element_count(&self, object: &dyn Reflectable) -> Result<u32, FieldError> {
        if self.is_array {
            self.array_size(object)
        } else {
            Ok(1)
        }
    }

    #[inline]
    pub fn as_plain(&self) -> Option<&dyn PlainAccess> {
        match &self.access {
            FieldAccess::Plain(access) => Some(&**access),
            _ => None,
        }
    }

    #[inline]
    pub fn as_reflectable(&self) -> Option<&dyn ReflectableAccess> {
        match &self.access {
            FieldAccess::Reflectable(access) => Some(&**access),
            _ => None,
        }
    }

    #[inline]
    pub fn as_reflectable_ptr(&self) -> Option<&dyn ReflectablePtrAccess> {
        match &self.access {
            FieldAccess::ReflectablePtr(access) => Some(&**access),
            _ => None,
        }
    }

    #[inline]
    pub fn as_data_block(&self) -> Option<&dyn DataBlockAccess> {
        match &self.access {
            FieldAccess::DataBlock(access) => Some(&**access),
            _ => None,
        }
    }

    /// Like [`as_plain`](Self::as_plain), but reports the category mismatch.
    pub fn expect_plain(&self) -> Result<&dyn PlainAccess, FieldError> {
        self.as_plain().ok_or(self.category_mismatch(FieldCategory::Plain))
    }

    pub fn expect_reflectable(&self) -> Result<&dyn ReflectableAccess, FieldError> {
        self.as_reflectable()
            .ok_or(self.category_mismatch(FieldCategory::Reflectable))
    }

    pub fn expect_reflectable_ptr(&self) -> Result<&dyn ReflectablePtrAccess, FieldError> {
        self.as_reflectable_ptr()
            .ok_or(self.category_mismatch(FieldCategory::ReflectablePtr))
    }

    pub fn expect_data_block(&self) -> Result<&dyn DataBlockAccess, FieldError> {
        self.as_data_block()
            .ok_or(self.category_mismatch(FieldCategory::DataBlock))
    }

    #[inline]
    fn category_mismatch(&self, expected: FieldCategory) -> FieldError {
        FieldError::CategoryMismatch {
            field: self.name,
            expected,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .field("category", &self.category())
            .field("is_array", &self.is_array)
            .field("type_size", &self.type_size)
            .field("has_dynamic_size", &self.has_dynamic_size)
            .field("flags", &self.flags)
            .finish()
    }
}
