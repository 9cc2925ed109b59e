//! See following macros:
//!
//! - [`Reflectable`]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static RTTI_ATTRIBUTE_NAME: &str = "rtti";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod expand;

// -----------------------------------------------------------------------------
// Macros

/// # Reflectable Derivation
///
/// `#[derive(Reflectable)]` implements `Typed` and `Reflectable`, building the
/// type descriptor from `#[rtti(...)]` attributes.
///
/// ## Type Attributes
///
/// ```rust, ignore
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 1001, name = "Line", base = shape, auto_register)]
/// struct Line { /* ... */ }
/// ```
///
/// - `id = u32`: the rtti id, required and globally unique.
/// - `name = "..."`: the registered name, defaults to the type ident.
/// - `base = field`: the field holding the embedded base value.
/// - `abstract`: the type has no constructor, `Default` is not required.
/// - `auto_register`: collect the type for `TypeRegistry::auto_register`.
///   A no-op when the `auto_register` feature is disabled.
/// - `customize = path`: a `fn(TypeDescriptorBuilder<Self>) -> TypeDescriptorBuilder<Self>`
///   applied before the descriptor is built, for hooks and diff handlers.
///
/// Generic types are not supported.
///
/// ## Field Attributes
///
/// Only fields carrying `#[rtti(id = ...)]` are serialized.
///
/// ```rust, ignore
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 2000, name = "Scene")]
/// struct Scene {
///     #[rtti(id = 1)]
///     title: String,
///     #[rtti(id = 2, reflectable, array)]
///     layers: Vec<Layer>,
///     #[rtti(id = 3, ptr)]
///     camera: Option<Arc<RwLock<Camera>>>,
///     #[rtti(id = 4, ptr, weak)]
///     owner: Option<SharedObject>,
///     #[rtti(id = 5, data_block, get = Self::blob, set = Self::set_blob)]
///     blob: MemoryDataStream,
///     cache: Vec<u8>, // not serialized
/// }
/// ```
///
/// - `id = u16`: the field's stable id.
/// - category: plain by default, or `reflectable`, `ptr`, `data_block`.
/// - `array`: the field is a `Vec` of elements, encoded element by element.
/// - `readonly`: the array keeps its length when decoding.
/// - `weak`: marks a reference field as weak.
/// - `get = path`, `set = path`: accessors of a data block field.
#[proc_macro_derive(Reflectable, attributes(rtti))]
pub fn derive_reflectable(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match expand::expand_reflectable(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
