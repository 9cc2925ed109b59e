use super::TypeRegistry;

impl TypeRegistry {
    /// Automatically registers all types annotated with
    /// `#[rtti(auto_register)]` or declared via [`auto_register!`](crate::auto_register).
    ///
    /// This method is equivalent to calling [`register`](Self::register) for
    /// each qualifying type. Repeated calls are cheap and will not insert duplicates.
    ///
    /// ## Return Value
    ///
    /// Returns `true` if automatic registration succeeded on the current
    /// platform; otherwise, `false`.
    ///
    /// ## Feature Dependency
    ///
    /// This method requires the `auto_register` feature. When disabled, it
    /// does nothing and returns `false`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ge_rtti::{Reflectable, TypeRegistry};
    ///
    /// #[derive(Reflectable, Default)]
    /// #[rtti(id = 140, name = "Camera", auto_register)]
    /// struct Camera {
    ///     #[rtti(id = 1)]
    ///     fov: f32,
    /// }
    ///
    /// let mut registry = TypeRegistry::new();
    /// assert!(registry.auto_register());
    /// assert!(registry.contains(140));
    /// ```
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            // Reduce the cost of duplicate registrations.
            if self.auto_registered {
                return true;
            }
            crate::__macro_exports::auto_register::__register_types(self);
            self.auto_registered
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    #[cfg(feature = "auto_register")]
    pub(crate) fn mark_auto_registered(&mut self) {
        self.auto_registered = true;
    }
}

/// Adds concrete types to the set registered by [`TypeRegistry::auto_register`].
///
/// A no-op when the `auto_register` feature is disabled.
///
/// ```
/// use ge_rtti::{Reflectable, auto_register};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 141, name = "Listener")]
/// struct Listener {
///     #[rtti(id = 1)]
///     volume: f32,
/// }
///
/// auto_register!(Listener);
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty),* $(,)?) => {
        $(
            const _: () = {
                $crate::__macro_exports::auto_register::inventory::submit! {
                    $crate::__macro_exports::auto_register::__AutoRegisterFunc(
                        <$ty as $crate::__macro_exports::auto_register::__RegisterType>::__register
                    )
                }
            };
        )*
    };
}

/// Adds concrete types to the set registered by [`TypeRegistry::auto_register`].
///
/// A no-op when the `auto_register` feature is disabled.
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty),* $(,)?) => {};
}
