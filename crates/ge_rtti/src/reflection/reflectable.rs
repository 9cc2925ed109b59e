use core::any::Any;

use crate::info::TypeDescriptor;

// -----------------------------------------------------------------------------
// Reflectable

/// A type whose fields are described by a [`TypeDescriptor`].
///
/// Every object the serializer can walk implements this trait. It is usually
/// implemented with `#[derive(Reflectable)]`, or with
/// [`impl_reflectable!`](crate::impl_reflectable) for types that build their
/// descriptor by hand.
///
/// # Examples
///
/// ```
/// use ge_rtti::{Reflectable, Typed};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 10, name = "Counter")]
/// struct Counter {
///     #[rtti(id = 1)]
///     value: u32,
/// }
///
/// let counter: Box<dyn Reflectable> = Box::new(Counter { value: 3 });
/// assert_eq!(counter.rtti_id(), 10);
/// assert_eq!(counter.rtti_name(), "Counter");
/// assert!(counter.is::<Counter>());
/// assert_eq!(Counter::rtti_static().num_fields(), 1);
/// ```
pub trait Reflectable: Any + Send + Sync + 'static {
    /// Returns the descriptor of the most derived type of `self`.
    fn rtti(&self) -> &'static TypeDescriptor;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Shortcut of `self.rtti().rtti_id()`.
    #[inline]
    fn rtti_id(&self) -> u32 {
        self.rtti().rtti_id()
    }

    /// Shortcut of `self.rtti().name()`.
    #[inline]
    fn rtti_name(&self) -> &'static str {
        self.rtti().name()
    }
}

impl dyn Reflectable {
    /// Returns `true` if the concrete type is `T`.
    #[inline]
    pub fn is<T: Reflectable>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Reflectable>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Reflectable>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Downcasts a boxed object, giving it back on failure.
    pub fn downcast<T: Reflectable>(self: Box<Self>) -> Result<Box<T>, Box<dyn Reflectable>> {
        if self.is::<T>() {
            Ok(self
                .into_any()
                .downcast::<T>()
                .unwrap_or_else(|_| unreachable!("type checked above")))
        } else {
            Err(self)
        }
    }
}

impl core::fmt::Debug for dyn Reflectable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("dyn Reflectable")
            .field("rtti_id", &self.rtti_id())
            .field("name", &self.rtti_name())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Typed

/// Static access to the descriptor of a concrete reflectable type.
///
/// The descriptor is a lazily built singleton, see
/// [`TypeDescriptorCell`](crate::info::TypeDescriptorCell).
pub trait Typed: Reflectable + Sized {
    fn rtti_static() -> &'static TypeDescriptor;
}

// -----------------------------------------------------------------------------
// impl_reflectable

/// Implements [`Reflectable`] for a type that already implements [`Typed`].
///
/// # Examples
///
/// ```
/// use ge_rtti::info::{TypeDescriptor, TypeDescriptorCell};
/// use ge_rtti::{Reflectable, Typed, impl_reflectable};
///
/// #[derive(Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Typed for Health {
///     fn rtti_static() -> &'static TypeDescriptor {
///         static CELL: TypeDescriptorCell = TypeDescriptorCell::new();
///         CELL.get_or_init(|| {
///             TypeDescriptor::builder::<Self>(20, "Health")
///                 .plain("current", 1, |s| &s.current, |s| &mut s.current)
///                 .plain("max", 2, |s| &s.max, |s| &mut s.max)
///                 .finish()
///         })
///     }
/// }
///
/// impl_reflectable!(Health);
///
/// let health = Health { current: 5.0, max: 10.0 };
/// assert_eq!(health.rtti().find_field("max").unique_id(), 2);
/// ```
#[macro_export]
macro_rules! impl_reflectable {
    ($ty:ty) => {
        impl $crate::Reflectable for $ty {
            #[inline]
            fn rtti(&self) -> &'static $crate::info::TypeDescriptor {
                <Self as $crate::Typed>::rtti_static()
            }

            #[inline]
            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            #[inline]
            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }
        }
    };
}
