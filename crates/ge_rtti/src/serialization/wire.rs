//! Packed metadata words of the binary format.
//!
//! Every unit starts with a little-endian `u32`. Bit 0 tells them apart:
//! `1` for [`ObjectMetaData`], `0` for [`FieldMetaData`].

use bitflags::bitflags;

use crate::error::DecodeError;
use crate::info::{FieldCategory, FieldDescriptor};

/// Largest object id, ids are stored in 30 bits.
pub(crate) const MAX_OBJECT_ID: u32 = (1 << 30) - 1;

// -----------------------------------------------------------------------------
// ObjectMetaData

/// Starts an object, or one base level of it.
///
/// `word0 = object_id << 2 | is_base_class << 1 | 1`, `word1 = type_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ObjectMetaData {
    pub object_id: u32,
    pub is_base_class: bool,
    pub type_id: u32,
}

impl ObjectMetaData {
    #[inline]
    pub fn is_object_word(word: u32) -> bool {
        word & 1 == 1
    }

    #[inline]
    pub fn to_words(self) -> [u32; 2] {
        let word = (self.object_id << 2) | (u32::from(self.is_base_class) << 1) | 1;
        [word, self.type_id]
    }

    pub fn from_words(word: u32, type_id: u32) -> Result<Self, DecodeError> {
        if !Self::is_object_word(word) {
            return Err(DecodeError::Malformed("expected object metadata"));
        }
        Ok(Self {
            object_id: word >> 2,
            is_base_class: word & 0b10 != 0,
            type_id,
        })
    }
}

// -----------------------------------------------------------------------------
// FieldMetaData

bitflags! {
    /// Flag bits of a [`FieldMetaData`] word. Bit 0 stays clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct FieldMetaFlags: u8 {
        const ARRAY = 1 << 1;
        const DATA_BLOCK = 1 << 2;
        const REFLECTABLE = 1 << 3;
        const POINTER = 1 << 4;
        const DYNAMIC_SIZE = 1 << 5;
        const TERMINATOR = 1 << 6;
    }
}

/// Describes the field that follows, or ends the current object.
///
/// `word = unique_id << 16 | size << 8 | flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldMetaData {
    pub unique_id: u16,
    pub size: u8,
    pub flags: FieldMetaFlags,
}

impl FieldMetaData {
    pub const TERMINATOR: Self = Self {
        unique_id: 0,
        size: 0,
        flags: FieldMetaFlags::TERMINATOR,
    };

    /// The metadata written in front of `field`.
    pub fn of_field(field: &FieldDescriptor) -> Self {
        let mut flags = FieldMetaFlags::empty();
        flags.set(FieldMetaFlags::ARRAY, field.is_array());
        flags.set(FieldMetaFlags::DYNAMIC_SIZE, field.has_dynamic_size());
        flags |= match field.category() {
            FieldCategory::Plain => FieldMetaFlags::empty(),
            FieldCategory::Reflectable => FieldMetaFlags::REFLECTABLE,
            FieldCategory::ReflectablePtr => FieldMetaFlags::POINTER,
            FieldCategory::DataBlock => FieldMetaFlags::DATA_BLOCK,
        };

        Self {
            unique_id: field.unique_id(),
            // Plain sizes are validated when the descriptor is built.
            size: u8::try_from(field.type_size()).unwrap_or(u8::MAX),
            flags,
        }
    }

    #[inline]
    pub fn to_word(self) -> u32 {
        (u32::from(self.unique_id) << 16) | (u32::from(self.size) << 8) | u32::from(self.flags.bits())
    }

    pub fn from_word(word: u32) -> Result<Self, DecodeError> {
        if ObjectMetaData::is_object_word(word) {
            return Err(DecodeError::Malformed("expected field metadata"));
        }
        let flags = FieldMetaFlags::from_bits((word & 0xFF) as u8)
            .ok_or(DecodeError::Malformed("unknown field flags"))?;
        Ok(Self {
            unique_id: (word >> 16) as u16,
            size: (word >> 8) as u8,
            flags,
        })
    }

    #[inline]
    pub fn is_terminator(self) -> bool {
        self.flags.contains(FieldMetaFlags::TERMINATOR)
    }

    #[inline]
    pub fn is_array(self) -> bool {
        self.flags.contains(FieldMetaFlags::ARRAY)
    }

    #[inline]
    pub fn has_dynamic_size(self) -> bool {
        self.flags.contains(FieldMetaFlags::DYNAMIC_SIZE)
    }

    pub fn category(self) -> FieldCategory {
        if self.flags.contains(FieldMetaFlags::DATA_BLOCK) {
            FieldCategory::DataBlock
        } else if self.flags.contains(FieldMetaFlags::REFLECTABLE) {
            FieldCategory::Reflectable
        } else if self.flags.contains(FieldMetaFlags::POINTER) {
            FieldCategory::ReflectablePtr
        } else {
            FieldCategory::Plain
        }
    }

    /// Why the stored field cannot be read into `field`, if it cannot.
    pub fn mismatch(self, field: &FieldDescriptor) -> Option<&'static str> {
        if self.category() != field.category() {
            Some("the field category changed")
        } else if self.is_array() != field.is_array() {
            Some("the array flag changed")
        } else if self.category() == FieldCategory::Plain
            && (self.has_dynamic_size() != field.has_dynamic_size()
                || u32::from(self.size) != field.type_size())
        {
            Some("the plain value size changed")
        } else {
            None
        }
    }
}
