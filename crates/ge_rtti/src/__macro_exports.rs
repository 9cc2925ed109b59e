//! Items used by generated code. Not public API.

/// Support for `#[rtti(auto_register)]` and [`auto_register!`](crate::auto_register).
#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use inventory;

    use crate::{TypeRegistry, Typed};

    /// A registration function collected by `inventory`.
    pub struct __AutoRegisterFunc(pub fn(&mut TypeRegistry));

    inventory::collect!(__AutoRegisterFunc);

    pub trait __RegisterType {
        fn __register(registry: &mut TypeRegistry);
    }

    impl<T: Typed> __RegisterType for T {
        #[inline]
        fn __register(registry: &mut TypeRegistry) {
            registry.register::<T>();
        }
    }

    // Only runs when the platform supports `inventory`.
    inventory::submit! {
        __AutoRegisterFunc(TypeRegistry::mark_auto_registered)
    }

    pub(crate) fn __register_types(registry: &mut TypeRegistry) {
        for func in inventory::iter::<__AutoRegisterFunc> {
            (func.0)(registry);
        }
    }
}
