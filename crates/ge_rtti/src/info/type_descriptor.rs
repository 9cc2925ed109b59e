use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;

use ge_utils::hash::HashMap;

use super::FieldDescriptor;
use crate::diff::DiffHandler;
use crate::{Reflectable, SharedObject};

// -----------------------------------------------------------------------------
// BaseLink

/// Projects a derived object onto the base value it embeds.
pub(crate) trait BaseProjection: Send + Sync {
    fn project<'a>(&self, object: &'a dyn Reflectable) -> Option<&'a dyn Reflectable>;

    fn project_mut<'a>(&self, object: &'a mut dyn Reflectable) -> Option<&'a mut dyn Reflectable>;
}

pub(crate) struct TypedProjection<S, B> {
    pub(crate) get: fn(&S) -> &B,
    pub(crate) get_mut: fn(&mut S) -> &mut B,
}

impl<S: Reflectable, B: Reflectable> BaseProjection for TypedProjection<S, B> {
    fn project<'a>(&self, object: &'a dyn Reflectable) -> Option<&'a dyn Reflectable> {
        let base: &dyn Reflectable = (self.get)(object.downcast_ref::<S>()?);
        Some(base)
    }

    fn project_mut<'a>(&self, object: &'a mut dyn Reflectable) -> Option<&'a mut dyn Reflectable> {
        let base: &mut dyn Reflectable = (self.get_mut)(object.downcast_mut::<S>()?);
        Some(base)
    }
}

/// The link from a derived type to its base type.
///
/// Derived types embed their base as a value; the link knows the base
/// descriptor and how to reach the embedded value.
pub struct BaseLink {
    pub(crate) descriptor: fn() -> &'static TypeDescriptor,
    pub(crate) projection: Box<dyn BaseProjection>,
}

impl BaseLink {
    #[inline]
    pub fn descriptor(&self) -> &'static TypeDescriptor {
        (self.descriptor)()
    }

    /// The base part of `object`, `None` if `object` is not of the derived type.
    #[inline]
    pub fn project<'a>(&self, object: &'a dyn Reflectable) -> Option<&'a dyn Reflectable> {
        self.projection.project(object)
    }

    #[inline]
    pub fn project_mut<'a>(&self, object: &'a mut dyn Reflectable) -> Option<&'a mut dyn Reflectable> {
        self.projection.project_mut(object)
    }
}

// -----------------------------------------------------------------------------
// Hooks

pub(crate) type SerializeHook = Box<dyn Fn(&dyn Reflectable, Option<&mut dyn Any>) + Send + Sync>;
pub(crate) type DeserializeHook =
    Box<dyn Fn(&mut dyn Reflectable, Option<&mut dyn Any>) + Send + Sync>;

#[derive(Default)]
pub(crate) struct TypeHooks {
    pub(crate) serialization_started: Option<SerializeHook>,
    pub(crate) serialization_ended: Option<SerializeHook>,
    pub(crate) deserialization_started: Option<DeserializeHook>,
    pub(crate) deserialization_ended: Option<DeserializeHook>,
}

pub(crate) struct Constructor {
    pub(crate) boxed: fn() -> Box<dyn Reflectable>,
    pub(crate) shared: fn() -> SharedObject,
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// The runtime description of a reflectable type.
///
/// Holds the ordered field list, the optional base link, a constructor for
/// blank instances, lifecycle hooks and the diff strategy. Every type has
/// exactly one descriptor, built lazily on first use and kept for the rest
/// of the process.
///
/// Descriptors are built with [`TypeDescriptor::builder`] or generated by
/// `#[derive(Reflectable)]`.
///
/// # Examples
///
/// ```
/// use ge_rtti::{Reflectable, Typed};
/// use ge_rtti::info::FieldCategory;
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 70, name = "Sprite")]
/// struct Sprite {
///     #[rtti(id = 1)]
///     frame: u16,
///     #[rtti(id = 2)]
///     path: String,
/// }
///
/// let rtti = Sprite::rtti_static();
/// assert_eq!(rtti.num_fields(), 2);
/// assert_eq!(rtti.find_field("path").category(), FieldCategory::Plain);
/// assert!(rtti.find_field_by_id(2).unwrap().has_dynamic_size());
/// assert!(rtti.find_field_by_id(3).is_none());
/// ```
pub struct TypeDescriptor {
    pub(crate) rtti_id: u32,
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) type_path: &'static str,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) field_ids: HashMap<u16, usize>,
    pub(crate) base: Option<BaseLink>,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) hooks: TypeHooks,
    pub(crate) diff_handler: Arc<dyn DiffHandler>,
}

impl TypeDescriptor {
    /// The author assigned, globally unique type id written to the stream.
    #[inline]
    pub fn rtti_id(&self) -> u32 {
        self.rtti_id
    }

    /// The registered, globally unique type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The Rust [`TypeId`] of the described type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The Rust type path, see [`core::any::type_name`].
    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    /// Own fields in registration order, inherited fields excluded.
    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[inline]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// Finds an own field by name.
    ///
    /// # Panics
    ///
    /// Panics if the type has no such field. Use
    /// [`try_find_field`](Self::try_find_field) when absence is expected.
    pub fn find_field(&self, name: &str) -> &FieldDescriptor {
        match self.try_find_field(name) {
            Some(field) => field,
            None => panic!("type `{}` has no field named `{name}`", self.name),
        }
    }

    #[inline]
    pub fn try_find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Finds an own field by its stream id.
    #[inline]
    pub fn find_field_by_id(&self, unique_id: u16) -> Option<&FieldDescriptor> {
        self.field_ids
            .get(&unique_id)
            .and_then(|&index| self.fields.get(index))
    }

    #[inline]
    pub fn base(&self) -> Option<&BaseLink> {
        self.base.as_ref()
    }

    #[inline]
    pub fn base_type(&self) -> Option<&'static TypeDescriptor> {
        self.base.as_ref().map(BaseLink::descriptor)
    }

    /// `self`, its base type, the base of its base and so on.
    pub fn ancestors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        core::iter::successors(Some(self), |rtti| rtti.base_type())
    }

    /// Returns `true` if `self` is `other` or derives from it.
    pub fn is_subtype_of(&self, other: &TypeDescriptor) -> bool {
        self.ancestors()
            .any(|rtti| rtti.rtti_id == other.rtti_id && rtti.type_id == other.type_id)
    }

    /// `true` if the type cannot be instantiated by the decoder.
    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.constructor.is_none()
    }

    /// A default instance, `None` for abstract types.
    #[inline]
    pub fn new_object(&self) -> Option<Box<dyn Reflectable>> {
        self.constructor.as_ref().map(|ctor| (ctor.boxed)())
    }

    /// A default instance in a shared handle, `None` for abstract types.
    #[inline]
    pub fn new_shared(&self) -> Option<SharedObject> {
        self.constructor.as_ref().map(|ctor| (ctor.shared)())
    }

    /// The diff strategy of this type, [`BinaryDiff`](crate::diff::BinaryDiff) by default.
    #[inline]
    pub fn diff_handler(&self) -> &dyn DiffHandler {
        &*self.diff_handler
    }

    /// Called before the fields of `object` at this level are encoded.
    #[inline]
    pub fn on_serialization_started(&self, object: &dyn Reflectable, context: Option<&mut dyn Any>) {
        if let Some(hook) = &self.hooks.serialization_started {
            hook(object, context);
        }
    }

    /// Called after the whole object has been encoded.
    #[inline]
    pub fn on_serialization_ended(&self, object: &dyn Reflectable, context: Option<&mut dyn Any>) {
        if let Some(hook) = &self.hooks.serialization_ended {
            hook(object, context);
        }
    }

    /// Called on a blank object before its fields are decoded.
    #[inline]
    pub fn on_deserialization_started(
        &self,
        object: &mut dyn Reflectable,
        context: Option<&mut dyn Any>,
    ) {
        if let Some(hook) = &self.hooks.deserialization_started {
            hook(object, context);
        }
    }

    /// Called once the object and everything it strongly references is decoded.
    #[inline]
    pub fn on_deserialization_ended(
        &self,
        object: &mut dyn Reflectable,
        context: Option<&mut dyn Any>,
    ) {
        if let Some(hook) = &self.hooks.deserialization_ended {
            hook(object, context);
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("rtti_id", &self.rtti_id)
            .field("name", &self.name)
            .field("base", &self.base_type().map(TypeDescriptor::name))
            .field("is_abstract", &self.is_abstract())
            .field("fields", &self.fields)
            .finish()
    }
}
