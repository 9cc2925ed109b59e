//! Error types of the RTTI system.
//!
//! - [`RegistrationError`]: descriptor building and type registration.
//! - [`FieldError`]: a single field access through a descriptor.
//! - [`EncodeError`] / [`DecodeError`]: the binary serializer.
//! - [`DiffError`]: generating or applying diffs.
//! - [`CloneError`]: the binary cloner.

use std::io;

use thiserror::Error;

use crate::info::FieldCategory;

// -----------------------------------------------------------------------------
// RegistrationError

/// Errors raised while building a [`TypeDescriptor`](crate::info::TypeDescriptor)
/// or while registering it.
///
/// These are programmer errors. [`TypeRegistry::register`](crate::TypeRegistry::register)
/// and [`TypeDescriptorBuilder::finish`](crate::info::TypeDescriptorBuilder::finish)
/// panic with them, the `try_` variants return them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("field id {unique_id} is used twice in type `{type_name}` (including inherited fields)")]
    DuplicateFieldId {
        type_name: &'static str,
        unique_id: u16,
    },
    #[error("field name `{field}` is used twice in type `{type_name}` (including inherited fields)")]
    DuplicateFieldName {
        type_name: &'static str,
        field: &'static str,
    },
    #[error(
        "plain field `{type_name}::{field}` has a static size of {size} bytes, \
         fixed size plain types must not exceed 255 bytes"
    )]
    PlainTypeTooLarge {
        type_name: &'static str,
        field: &'static str,
        size: u32,
    },
    #[error("rtti id {rtti_id} is already used by `{existing}`, cannot register `{name}`")]
    DuplicateTypeId {
        rtti_id: u32,
        existing: &'static str,
        name: &'static str,
    },
    #[error("type name `{name}` is already registered with rtti id {existing_id}")]
    DuplicateTypeName { name: &'static str, existing_id: u32 },
    #[error(
        "types `{first}` and `{second}` hold strong references to each other, \
         mark one side with `FieldFlags::WEAK_REF`"
    )]
    CircularReference {
        first: &'static str,
        second: &'static str,
    },
}

// -----------------------------------------------------------------------------
// FieldError

/// Errors raised by the accessors of a [`FieldDescriptor`](crate::info::FieldDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FieldError {
    #[error("object is not a `{expected}`")]
    ObjectTypeMismatch { expected: &'static str },
    #[error("field `{field}` is not a {expected:?} field")]
    CategoryMismatch {
        field: &'static str,
        expected: FieldCategory,
    },
    #[error("field `{field}` is not an array")]
    NotAnArray { field: &'static str },
    #[error("array field `{field}` was registered without a size setter")]
    NoArraySizeSetter { field: &'static str },
    #[error("index {index} is out of bounds for field `{field}` with {len} elements")]
    IndexOutOfBounds {
        field: &'static str,
        index: u32,
        len: u32,
    },
    #[error("data block field `{field}` does not support arrays")]
    DataBlockArray { field: &'static str },
    #[error("field `{field}` expects objects of type `{expected}`")]
    PointeeTypeMismatch {
        field: &'static str,
        expected: &'static str,
    },
    #[error("invalid plain data: {reason}")]
    InvalidData { reason: &'static str },
}

// -----------------------------------------------------------------------------
// EncodeError

/// Errors raised by [`BinarySerializer::encode`](crate::serialization::BinarySerializer::encode).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("the output buffer is empty")]
    EmptyBuffer,
    #[error("encoding aborted by the flush callback")]
    Aborted,
    #[error("object id {0} does not fit in 30 bits")]
    ObjectIdOverflow(u32),
    #[error("payload of `{type_name}::{field}` is {size} bytes, larger than the format allows")]
    PayloadTooLarge {
        type_name: &'static str,
        field: &'static str,
        size: usize,
    },
    #[error("failed to read `{type_name}::{field}`: {source}")]
    Field {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: FieldError,
    },
}

// -----------------------------------------------------------------------------
// DecodeError

/// Errors raised by [`BinarySerializer::decode`](crate::serialization::BinarySerializer::decode).
///
/// Unknown field ids are not errors, they are skipped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("the stream contains no objects")]
    EmptyStream,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("the stream ends in the middle of an object")]
    Truncated,
    #[error("malformed stream: {0}")]
    Malformed(&'static str),
    #[error("object id {0} appears twice in the stream")]
    DuplicateObjectId(u32),
    #[error("unknown rtti id {0}, the type is not registered")]
    UnknownType(u32),
    #[error("type `{0}` is abstract and cannot be instantiated")]
    AbstractType(&'static str),
    #[error("stored layout of `{type_name}::{field}` does not match: {reason}")]
    FieldMismatch {
        type_name: &'static str,
        field: &'static str,
        reason: &'static str,
    },
    #[error(
        "circular reference: `{type_name}::{field}` strongly references `{target_type}` \
         which depends back on it"
    )]
    CircularReference {
        type_name: &'static str,
        field: &'static str,
        target_type: &'static str,
    },
    #[error("failed to write `{type_name}::{field}`: {source}")]
    Field {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: FieldError,
    },
}

// -----------------------------------------------------------------------------
// DiffError

/// Errors raised while generating or applying a diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DiffError {
    #[error("diff was generated for `{expected}` but applied to `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("failed to access `{type_name}::{field}`: {source}")]
    Field {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: FieldError,
    },
}

// -----------------------------------------------------------------------------
// CloneError

/// Errors raised by [`BinaryCloner`](crate::serialization::BinaryCloner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CloneError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to restore references: {0}")]
    Field(#[from] FieldError),
}
