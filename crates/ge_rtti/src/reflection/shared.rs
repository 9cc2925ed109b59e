use alloc::sync::Arc;
use core::any::Any;
use core::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::Reflectable;
use crate::info::TypeDescriptor;

// -----------------------------------------------------------------------------
// ObjectIdentity

/// The identity of a [`SharedObject`]: the address of its allocation.
///
/// Two handles have the same identity exactly when they share the object.
/// Only meaningful while at least one handle keeps the object alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentity(usize);

// -----------------------------------------------------------------------------
// SharedObject

/// A shared, type-erased handle to a reflectable object.
///
/// This is what reference fields store and what the serializer deduplicates.
/// A typed `Arc<RwLock<T>>` converts into a `SharedObject` without copying,
/// and can be recovered again with [`SharedObject::downcast`].
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, RwLock};
/// use ge_rtti::{Reflectable, SharedObject};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 30, name = "Mesh")]
/// struct Mesh {
///     #[rtti(id = 1)]
///     vertices: u32,
/// }
///
/// let typed = Arc::new(RwLock::new(Mesh { vertices: 8 }));
/// let shared = SharedObject::from_arc(typed.clone());
///
/// assert_eq!(shared.read().rtti_name(), "Mesh");
/// assert!(Arc::ptr_eq(&shared.downcast::<Mesh>().unwrap(), &typed));
/// assert_eq!(shared, SharedObject::from_arc(typed));
/// ```
#[derive(Clone)]
pub struct SharedObject {
    object: Arc<RwLock<dyn Reflectable>>,
    typed: Arc<dyn Any + Send + Sync>,
}

impl SharedObject {
    /// Moves `value` into a new shared allocation.
    #[inline]
    pub fn new<T: Reflectable>(value: T) -> Self {
        Self::from_arc(Arc::new(RwLock::new(value)))
    }

    /// Wraps an existing typed handle, sharing its allocation.
    #[inline]
    pub fn from_arc<T: Reflectable>(arc: Arc<RwLock<T>>) -> Self {
        let typed: Arc<dyn Any + Send + Sync> = arc.clone();
        Self { object: arc, typed }
    }

    /// Returns the typed handle if the object is a `T`.
    #[inline]
    pub fn downcast<T: Reflectable>(&self) -> Option<Arc<RwLock<T>>> {
        self.typed.clone().downcast::<RwLock<T>>().ok()
    }

    #[inline]
    pub fn is<T: Reflectable>(&self) -> bool {
        self.typed.is::<RwLock<T>>()
    }

    /// Takes a read lock on the object.
    ///
    /// A poisoned lock is recovered, the object is plain data.
    pub fn read(&self) -> RwLockReadGuard<'_, dyn Reflectable> {
        self.object.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the object.
    pub fn write(&self) -> RwLockWriteGuard<'_, dyn Reflectable> {
        self.object.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity(Arc::as_ptr(&self.object).cast::<()>() as usize)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &SharedObject) -> bool {
        self.identity() == other.identity()
    }

    /// The descriptor of the object's most derived type.
    #[inline]
    pub fn rtti(&self) -> &'static TypeDescriptor {
        self.read().rtti()
    }
}

impl<T: Reflectable> From<Arc<RwLock<T>>> for SharedObject {
    #[inline]
    fn from(value: Arc<RwLock<T>>) -> Self {
        Self::from_arc(value)
    }
}

impl PartialEq for SharedObject {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for SharedObject {}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("SharedObject");
        out.field("identity", &self.identity());
        match self.object.try_read() {
            Ok(guard) => out.field("type", &guard.rtti_name()),
            Err(_) => out.field("type", &"<locked>"),
        };
        out.finish()
    }
}
