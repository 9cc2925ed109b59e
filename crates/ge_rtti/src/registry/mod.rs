//! The type registry.
//!
//! ## Menu
//!
//! - [`TypeRegistry`]: rtti id and name index of [`TypeDescriptor`](crate::info::TypeDescriptor)s,
//!   with derived-type lookup.
//! - [`TypeRegistryArc`]: a registry shared between threads.
//! - [`TypeSchema`]: serializable description of registered types.
//!
//! ## Auto Registration
//!
//! Besides [`TypeRegistry::register`], types can be collected at startup:
//! mark them with `#[rtti(auto_register)]` or list them in
//! [`auto_register!`](crate::auto_register), then call
//! [`TypeRegistry::auto_register`].
//!
//! We use [`inventory`] crate to implement static registration, which is
//! behind the `auto_register` feature (enabled by default).
//!
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod auto_register;
mod schema;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use schema::{FieldSchema, TypeSchema};
pub use type_registry::{TypeRegistry, TypeRegistryArc};
