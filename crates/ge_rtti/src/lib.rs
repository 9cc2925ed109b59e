#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// The derive macro emits `::ge_rtti::...` paths, this alias lets them resolve
// inside the crate itself and in its doc tests.
extern crate self as ge_rtti;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod reflection;
mod stream;

pub mod diff;
pub mod error;
pub mod info;
pub mod registry;
pub mod serialization;

// -----------------------------------------------------------------------------
// Top-Level exports

#[doc(hidden)]
pub mod __macro_exports;

pub use reflection::{ObjectIdentity, Reflectable, SharedObject, Typed};
pub use reflection::{rtti_cast, rtti_cast_mut, rtti_is_of_type, rtti_is_subclass};
pub use registry::{TypeRegistry, TypeRegistryArc};
pub use stream::MemoryDataStream;

pub use ge_rtti_derive as derive;
pub use ge_rtti_derive::Reflectable;
