//! Structural diffs between objects of compatible schemas.
//!
//! ## Menu
//!
//! - [`SerializedObject`]: an in-memory snapshot of an object's fields, grouped
//!   by inheritance level and keyed by field id.
//! - [`DiffHandler`]: the per-type strategy that generates and applies diffs.
//! - [`BinaryDiff`]: the default strategy, comparing encoded field values.
//! - [`generate_diff`] / [`apply_diff`]: entry points dispatching to the
//!   handler of the object's type.
//!
//! Fields are matched by their unique id. A field the other side does not
//! know is ignored, so diffs stay usable across schema versions as long as
//! retired ids are never reused.
//!
//! # Examples
//!
//! ```
//! use ge_rtti::{Reflectable, diff};
//!
//! #[derive(Reflectable, Default)]
//! #[rtti(id = 80, name = "Settings")]
//! struct Settings {
//!     #[rtti(id = 1)]
//!     volume: u8,
//!     #[rtti(id = 2)]
//!     language: String,
//! }
//!
//! let old = Settings { volume: 3, language: "en".into() };
//! let new = Settings { volume: 7, language: "en".into() };
//!
//! let patch = diff::generate_diff(&old, &new).unwrap().unwrap();
//! assert_eq!(patch.sub_objects[0].entries.len(), 1);
//!
//! let mut target = Settings { volume: 0, language: "fr".into() };
//! diff::apply_diff(&mut target, &patch, None).unwrap();
//! assert_eq!(target.volume, 7);
//! assert_eq!(target.language, "fr");
//! ```

use core::any::Any;

use crate::Reflectable;
use crate::error::DiffError;

// -----------------------------------------------------------------------------
// Modules

mod binary_diff;
mod serialized;

// -----------------------------------------------------------------------------
// Exports

pub use binary_diff::BinaryDiff;
pub use serialized::{SerializedArray, SerializedInstance, SerializedObject, SerializedSubObject};

// -----------------------------------------------------------------------------
// DiffHandler

/// A strategy computing and applying diffs for one type.
///
/// Set per type with
/// [`TypeDescriptorBuilder::diff_handler`](crate::info::TypeDescriptorBuilder::diff_handler),
/// [`BinaryDiff`] otherwise.
pub trait DiffHandler: Send + Sync {
    /// The entries of `new` that differ from `original`, `None` when equal.
    fn generate_diff(
        &self,
        original: &SerializedObject,
        new: &SerializedObject,
    ) -> Option<SerializedObject>;

    /// Writes the entries of `diff` into `object`.
    fn apply_diff(
        &self,
        object: &mut dyn Reflectable,
        diff: &SerializedObject,
        context: Option<&mut dyn Any>,
    ) -> Result<(), DiffError>;
}

// -----------------------------------------------------------------------------
// Entry points

/// Snapshots both objects and diffs them with the handler of `new`.
///
/// Returns `Ok(None)` when nothing changed.
pub fn generate_diff(
    original: &dyn Reflectable,
    new: &dyn Reflectable,
) -> Result<Option<SerializedObject>, DiffError> {
    if original.rtti_id() != new.rtti_id() {
        return Err(DiffError::TypeMismatch {
            expected: new.rtti_name(),
            found: original.rtti_name(),
        });
    }

    let original = SerializedObject::new(original)?;
    let new_snapshot = SerializedObject::new(new)?;
    Ok(new.rtti().diff_handler().generate_diff(&original, &new_snapshot))
}

/// Applies `diff` to `target` with the handler of `target`'s type.
pub fn apply_diff(
    target: &mut dyn Reflectable,
    diff: &SerializedObject,
    context: Option<&mut dyn Any>,
) -> Result<(), DiffError> {
    let handler = target.rtti().diff_handler();
    handler.apply_diff(target, diff, context)
}
