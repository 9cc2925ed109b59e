//! Runtime descriptions of reflectable types.
//!
//! ## Menu
//!
//! - [`TypeDescriptor`]: fields, base link, constructor, hooks and diff strategy of a type.
//! - [`TypeDescriptorBuilder`]: builds descriptors, validating field ids and sizes.
//! - [`TypeDescriptorCell`]: static storage used to implement [`Typed`](crate::Typed).
//! - [`FieldDescriptor`]: one serializable attribute, in one of four [`FieldCategory`].
//! - [`PlainType`]: values encoded as raw bytes.
//! - Category accessors: [`PlainAccess`], [`ReflectableAccess`],
//!   [`ReflectablePtrAccess`], [`DataBlockAccess`].

// -----------------------------------------------------------------------------
// Modules

mod access;
mod builder;
mod cell;
mod field;
mod plain;
mod type_descriptor;

// -----------------------------------------------------------------------------
// Exports

pub use access::{
    ArrayAccess, DataBlockAccess, PlainAccess, ReflectableAccess, ReflectablePtrAccess, SharedSlot,
};
pub use builder::TypeDescriptorBuilder;
pub use cell::TypeDescriptorCell;
pub use field::{FieldCategory, FieldDescriptor, FieldFlags};
pub use plain::PlainType;
pub use type_descriptor::{BaseLink, TypeDescriptor};
