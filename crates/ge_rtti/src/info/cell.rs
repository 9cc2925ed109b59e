//! Static storage of type descriptors.
//!
//! Used to implement [`Typed`](crate::Typed). The cell is declared as a
//! `static` inside [`Typed::rtti_static`](crate::Typed::rtti_static), which is
//! only correct for non-generic types: a generic function shares one static
//! between all instantiations.

use std::sync::OnceLock;

use super::TypeDescriptor;

/// Container for the lazily built descriptor of a non-generic type.
///
/// Internally, there is an [`OnceLock`], almost no additional expenses.
///
/// ## Example
///
/// ```
/// use ge_rtti::info::{TypeDescriptor, TypeDescriptorCell};
/// use ge_rtti::{Typed, impl_reflectable};
///
/// #[derive(Default)]
/// struct Timer {
///     elapsed: f64,
/// }
///
/// impl Typed for Timer {
///     fn rtti_static() -> &'static TypeDescriptor {
///         static CELL: TypeDescriptorCell = TypeDescriptorCell::new();
///         CELL.get_or_init(|| {
///             TypeDescriptor::builder::<Self>(80, "Timer")
///                 .plain("elapsed", 1, |s| &s.elapsed, |s| &mut s.elapsed)
///                 .finish()
///         })
///     }
/// }
///
/// impl_reflectable!(Timer);
///
/// assert!(core::ptr::eq(Timer::rtti_static(), Timer::rtti_static()));
/// ```
pub struct TypeDescriptorCell(OnceLock<TypeDescriptor>);

impl TypeDescriptorCell {
    /// Create a empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the descriptor, building it with `f` on first access.
    ///
    /// `f` must not access the descriptor of the same type, that would
    /// block forever. Descriptors of other types, base types included, are fine.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &TypeDescriptor
    where
        F: FnOnce() -> TypeDescriptor,
    {
        self.0.get_or_init(f)
    }
}
