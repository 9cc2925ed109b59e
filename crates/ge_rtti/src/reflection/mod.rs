//! The reflectable object model.
//!
//! - [`Reflectable`]: implemented by every type that has a [`TypeDescriptor`].
//! - [`Typed`]: static access to the descriptor of a concrete type.
//! - [`SharedObject`]: a shared, type-erased handle used by reference fields.
//! - [`rtti_is_of_type`], [`rtti_is_subclass`], [`rtti_cast`]: checked queries and casts.
//!
//! [`TypeDescriptor`]: crate::info::TypeDescriptor

// -----------------------------------------------------------------------------
// Modules

mod cast;
mod reflectable;
mod shared;

// -----------------------------------------------------------------------------
// Exports

pub use cast::{rtti_cast, rtti_cast_mut, rtti_is_of_type, rtti_is_subclass};
pub use reflectable::{Reflectable, Typed};
pub use shared::{ObjectIdentity, SharedObject};

pub(crate) use cast::{level, level_mut};
