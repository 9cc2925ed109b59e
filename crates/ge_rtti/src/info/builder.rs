use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::marker::PhantomData;

use ge_utils::hash::{HashMap, HashSet};

use super::access::{Accessor, DataBlockAccessor, SharedSlot};
use super::field::{FieldAccess, FieldFlags};
use super::type_descriptor::{BaseLink, Constructor, TypeHooks, TypedProjection};
use super::{FieldDescriptor, PlainType, TypeDescriptor};
use crate::diff::{BinaryDiff, DiffHandler};
use crate::error::RegistrationError;
use crate::{MemoryDataStream, Reflectable, SharedObject, Typed};

// -----------------------------------------------------------------------------
// Entry points

impl TypeDescriptor {
    /// Starts the descriptor of a constructible type.
    ///
    /// The decoder creates blank instances with `S::default()`.
    pub fn builder<S: Reflectable + Default>(
        rtti_id: u32,
        name: &'static str,
    ) -> TypeDescriptorBuilder<S> {
        let mut builder = TypeDescriptorBuilder::new(rtti_id, name);
        builder.constructor = Some(Constructor {
            boxed: || Box::new(S::default()),
            shared: || SharedObject::new(S::default()),
        });
        builder
    }

    /// Starts the descriptor of an abstract type.
    ///
    /// Abstract types can be bases and can be encoded, but the decoder
    /// refuses to instantiate them.
    pub fn abstract_builder<S: Reflectable>(
        rtti_id: u32,
        name: &'static str,
    ) -> TypeDescriptorBuilder<S> {
        TypeDescriptorBuilder::new(rtti_id, name)
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptorBuilder

/// Builder of a [`TypeDescriptor`] for the type `S`.
///
/// Fields are added in encoding order. Modifiers such as
/// [`field_flags`](Self::field_flags) apply to the field added last.
///
/// Accessors are plain function pointers, so non-capturing closures work:
///
/// ```
/// use std::sync::{Arc, RwLock};
/// use ge_rtti::info::{FieldFlags, TypeDescriptor, TypeDescriptorCell};
/// use ge_rtti::{Typed, impl_reflectable};
///
/// #[derive(Default)]
/// struct Node {
///     value: i64,
///     children: Vec<Option<Arc<RwLock<Node>>>>,
///     parent: Option<Arc<RwLock<Node>>>,
/// }
///
/// impl Typed for Node {
///     fn rtti_static() -> &'static TypeDescriptor {
///         static CELL: TypeDescriptorCell = TypeDescriptorCell::new();
///         CELL.get_or_init(|| {
///             TypeDescriptor::builder::<Self>(90, "Node")
///                 .plain("value", 1, |s| &s.value, |s| &mut s.value)
///                 .reflectable_ptr_array("children", 2, |s| &s.children, |s| &mut s.children)
///                 .reflectable_ptr("parent", 3, |s| &s.parent, |s| &mut s.parent)
///                 .field_flags(FieldFlags::WEAK_REF)
///                 .finish()
///         })
///     }
/// }
///
/// impl_reflectable!(Node);
///
/// assert!(Node::rtti_static().find_field("parent").is_weak_ref());
/// assert!(Node::rtti_static().find_field("children").is_array());
/// ```
pub struct TypeDescriptorBuilder<S> {
    rtti_id: u32,
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    base: Option<BaseLink>,
    constructor: Option<Constructor>,
    hooks: TypeHooks,
    diff_handler: Option<Arc<dyn DiffHandler>>,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Reflectable> TypeDescriptorBuilder<S> {
    fn new(rtti_id: u32, name: &'static str) -> Self {
        Self {
            rtti_id,
            name,
            fields: Vec::new(),
            base: None,
            constructor: None,
            hooks: TypeHooks::default(),
            diff_handler: None,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn push(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a plain field.
    pub fn plain<T: PlainType>(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> Self {
        let access = FieldAccess::Plain(Box::new(Accessor::scalar(name, get, get_mut)));
        self.push(FieldDescriptor::new(
            unique_id,
            name,
            false,
            T::STATIC_SIZE,
            T::HAS_DYNAMIC_SIZE,
            access,
        ))
    }

    /// Adds an array of plain elements.
    ///
    /// Unlike a plain `Vec<T>` field, every element is addressable by index
    /// and diffs are computed per element.
    pub fn plain_array<T: PlainType + Default>(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> &Vec<T>,
        get_mut: fn(&mut S) -> &mut Vec<T>,
    ) -> Self {
        let access = FieldAccess::Plain(Box::new(Accessor::array(name, get, get_mut)));
        self.push(FieldDescriptor::new(
            unique_id,
            name,
            true,
            T::STATIC_SIZE,
            T::HAS_DYNAMIC_SIZE,
            access,
        ))
    }

    /// Adds a reflectable object stored by value.
    pub fn reflectable<T: Typed + Default>(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> Self {
        let access = FieldAccess::Reflectable(Box::new(Accessor::scalar(name, get, get_mut)));
        self.push(FieldDescriptor::new(unique_id, name, false, 0, false, access))
    }

    /// Adds an array of reflectable objects stored by value.
    pub fn reflectable_array<T: Typed + Default>(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> &Vec<T>,
        get_mut: fn(&mut S) -> &mut Vec<T>,
    ) -> Self {
        let access = FieldAccess::Reflectable(Box::new(Accessor::array(name, get, get_mut)));
        self.push(FieldDescriptor::new(unique_id, name, true, 0, false, access))
    }

    /// Adds a shared reference, see [`SharedSlot`] for the accepted storages.
    pub fn reflectable_ptr<P: SharedSlot>(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> &P,
        get_mut: fn(&mut S) -> &mut P,
    ) -> Self {
        let access = FieldAccess::ReflectablePtr(Box::new(Accessor::scalar(name, get, get_mut)));
        self.push(FieldDescriptor::new(unique_id, name, false, 4, false, access))
    }

    /// Adds an array of shared references.
    pub fn reflectable_ptr_array<P: SharedSlot>(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> &Vec<P>,
        get_mut: fn(&mut S) -> &mut Vec<P>,
    ) -> Self {
        let access = FieldAccess::ReflectablePtr(Box::new(Accessor::array(name, get, get_mut)));
        self.push(FieldDescriptor::new(unique_id, name, true, 4, false, access))
    }

    /// Adds an opaque data block.
    ///
    /// `get` returns the block and its size in bytes, `set` receives them back
    /// when decoding.
    pub fn data_block(
        self,
        name: &'static str,
        unique_id: u16,
        get: fn(&S) -> (MemoryDataStream, u32),
        set: fn(&mut S, MemoryDataStream, u32),
    ) -> Self {
        let access = FieldAccess::DataBlock(Box::new(DataBlockAccessor::new(get, set)));
        self.push(FieldDescriptor::new(unique_id, name, false, 0, false, access))
    }

    /// Adds `flags` to the field added last.
    pub fn field_flags(mut self, flags: FieldFlags) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.insert_flags(flags);
        }
        self
    }

    /// Marks the array added last as fixed size: decoding and diffs may
    /// change its elements but not their count.
    pub fn readonly_size(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.set_resizable(false);
        }
        self
    }

    /// Declares `B` as the base type, embedded in `S` and reached through
    /// `get` / `get_mut`.
    pub fn base<B: Typed>(mut self, get: fn(&S) -> &B, get_mut: fn(&mut S) -> &mut B) -> Self {
        self.base = Some(BaseLink {
            descriptor: B::rtti_static,
            projection: Box::new(TypedProjection { get, get_mut }),
        });
        self
    }

    pub fn on_serialization_started(mut self, hook: fn(&S, Option<&mut dyn Any>)) -> Self {
        self.hooks.serialization_started = Some(Box::new(
            move |object: &dyn Reflectable, context: Option<&mut dyn Any>| {
                if let Some(object) = object.downcast_ref::<S>() {
                    hook(object, context);
                }
            },
        ));
        self
    }

    pub fn on_serialization_ended(mut self, hook: fn(&S, Option<&mut dyn Any>)) -> Self {
        self.hooks.serialization_ended = Some(Box::new(
            move |object: &dyn Reflectable, context: Option<&mut dyn Any>| {
                if let Some(object) = object.downcast_ref::<S>() {
                    hook(object, context);
                }
            },
        ));
        self
    }

    pub fn on_deserialization_started(mut self, hook: fn(&mut S, Option<&mut dyn Any>)) -> Self {
        self.hooks.deserialization_started = Some(Box::new(
            move |object: &mut dyn Reflectable, context: Option<&mut dyn Any>| {
                if let Some(object) = object.downcast_mut::<S>() {
                    hook(object, context);
                }
            },
        ));
        self
    }

    /// Runs once the whole graph has been decoded, children before parents.
    ///
    /// This is where an object repairs state that depends on the objects it
    /// references, weak references included.
    pub fn on_deserialization_ended(mut self, hook: fn(&mut S, Option<&mut dyn Any>)) -> Self {
        self.hooks.deserialization_ended = Some(Box::new(
            move |object: &mut dyn Reflectable, context: Option<&mut dyn Any>| {
                if let Some(object) = object.downcast_mut::<S>() {
                    hook(object, context);
                }
            },
        ));
        self
    }

    /// Replaces the default [`BinaryDiff`] strategy.
    pub fn diff_handler(mut self, handler: impl DiffHandler + 'static) -> Self {
        self.diff_handler = Some(Arc::new(handler));
        self
    }

    /// Validates the fields and creates the descriptor.
    ///
    /// Fails when a field id or name is used twice, inherited fields
    /// included, or when a fixed size plain field is larger than 255 bytes.
    pub fn build(self) -> Result<TypeDescriptor, RegistrationError> {
        let mut ids = HashSet::<u16>::default();
        let mut names = HashSet::<&'static str>::default();

        let inherited = self.base.as_ref().map(BaseLink::descriptor);
        let inherited_fields = inherited
            .into_iter()
            .flat_map(|base| base.ancestors())
            .flat_map(|rtti| rtti.fields().iter());

        for field in inherited_fields.chain(self.fields.iter()) {
            if !ids.insert(field.unique_id()) {
                return Err(RegistrationError::DuplicateFieldId {
                    type_name: self.name,
                    unique_id: field.unique_id(),
                });
            }
            if !names.insert(field.name()) {
                return Err(RegistrationError::DuplicateFieldName {
                    type_name: self.name,
                    field: field.name(),
                });
            }
        }

        for field in &self.fields {
            if field.as_plain().is_some() && !field.has_dynamic_size() && field.type_size() > 255 {
                return Err(RegistrationError::PlainTypeTooLarge {
                    type_name: self.name,
                    field: field.name(),
                    size: field.type_size(),
                });
            }
        }

        let field_ids: HashMap<u16, usize> = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.unique_id(), index))
            .collect();

        Ok(TypeDescriptor {
            rtti_id: self.rtti_id,
            name: self.name,
            type_id: TypeId::of::<S>(),
            type_path: core::any::type_name::<S>(),
            fields: self.fields,
            field_ids,
            base: self.base,
            constructor: self.constructor,
            hooks: self.hooks,
            diff_handler: self
                .diff_handler
                .unwrap_or_else(|| Arc::new(BinaryDiff)),
        })
    }

    /// Like [`build`](Self::build), but panics on invalid descriptors.
    ///
    /// Descriptors are static program data, so this is what generated code uses.
    pub fn finish(self) -> TypeDescriptor {
        match self.build() {
            Ok(rtti) => rtti,
            Err(err) => panic!("invalid type descriptor: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{FieldError, RegistrationError};
    use crate::info::{FieldCategory, TypeDescriptor, TypeDescriptorCell};
    use crate::{Reflectable, Typed, impl_reflectable};

    struct Wide {
        small: [u8; 255],
        large: [u8; 256],
        list: Vec<u32>,
    }

    impl Default for Wide {
        fn default() -> Self {
            Self {
                small: [0; 255],
                large: [0; 256],
                list: Vec::new(),
            }
        }
    }

    impl Typed for Wide {
        fn rtti_static() -> &'static TypeDescriptor {
            static CELL: TypeDescriptorCell = TypeDescriptorCell::new();
            CELL.get_or_init(|| {
                TypeDescriptor::builder::<Self>(100, "builder::Wide")
                    .plain("small", 1, |s| &s.small, |s| &mut s.small)
                    .finish()
            })
        }
    }

    impl_reflectable!(Wide);

    #[derive(Reflectable, Default)]
    #[rtti(id = 101, name = "builder::Parent")]
    struct Parent {
        #[rtti(id = 1)]
        shared: u32,
    }

    #[derive(Default)]
    struct Child {
        parent: Parent,
        own: u32,
    }

    impl_reflectable!(Child);

    impl Typed for Child {
        fn rtti_static() -> &'static TypeDescriptor {
            static CELL: TypeDescriptorCell = TypeDescriptorCell::new();
            CELL.get_or_init(|| {
                TypeDescriptor::builder::<Self>(102, "builder::Child")
                    .base(|s| &s.parent, |s| &mut s.parent)
                    .plain("own", 2, |s| &s.own, |s| &mut s.own)
                    .finish()
            })
        }
    }

    #[test]
    fn plain_size_limit() {
        let err = TypeDescriptor::builder::<Wide>(100, "builder::Wide")
            .plain("small", 1, |s| &s.small, |s| &mut s.small)
            .plain("large", 2, |s| &s.large, |s| &mut s.large)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::PlainTypeTooLarge {
                type_name: "builder::Wide",
                field: "large",
                size: 256,
            }
        );

        // Dynamically sized values have no limit.
        let rtti = TypeDescriptor::builder::<Wide>(100, "builder::Wide")
            .plain("list", 3, |s| &s.list, |s| &mut s.list)
            .build()
            .unwrap();
        assert!(rtti.find_field("list").has_dynamic_size());
        assert_eq!(Wide::rtti_static().find_field("small").type_size(), 255);
    }

    #[test]
    fn duplicate_fields() {
        let err = TypeDescriptor::builder::<Wide>(100, "builder::Wide")
            .plain("small", 1, |s| &s.small, |s| &mut s.small)
            .plain("list", 1, |s| &s.list, |s| &mut s.list)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateFieldId { unique_id: 1, .. }));

        let err = TypeDescriptor::builder::<Wide>(100, "builder::Wide")
            .plain("small", 1, |s| &s.small, |s| &mut s.small)
            .plain("small", 2, |s| &s.list, |s| &mut s.list)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateFieldName { field: "small", .. }));
    }

    #[test]
    fn inherited_field_ids_are_reserved() {
        let err = TypeDescriptor::builder::<Child>(102, "builder::Child")
            .base(|s| &s.parent, |s| &mut s.parent)
            .plain("own", 1, |s| &s.own, |s| &mut s.own)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateFieldId { unique_id: 1, .. }));

        let rtti = Child::rtti_static();
        assert_eq!(rtti.base_type().unwrap().name(), "builder::Parent");
        assert_eq!(rtti.ancestors().count(), 2);
        assert!(rtti.find_field_by_id(1).is_none());
    }

    #[test]
    fn field_access_errors() {
        let rtti = Wide::rtti_static();
        let field = rtti.find_field("small");
        let mut parent = Parent::default();

        assert_eq!(field.category(), FieldCategory::Plain);
        assert!(field.as_reflectable().is_none());
        assert!(matches!(
            field.array_size(&parent),
            Err(FieldError::NotAnArray { field: "small" })
        ));
        assert!(matches!(
            field.as_plain().unwrap().from_buffer(&mut parent, 0, &[0; 255]),
            Err(FieldError::ObjectTypeMismatch { .. })
        ));
        assert!(matches!(
            field.expect_data_block(),
            Err(FieldError::CategoryMismatch {
                expected: FieldCategory::DataBlock,
                ..
            })
        ));

        let mut wide = Wide::default();
        let plain = field.as_plain().unwrap();
        plain.from_buffer(&mut wide, 0, &[7; 255]).unwrap();
        assert_eq!(wide.small[254], 7);
        assert!(matches!(
            plain.from_buffer(&mut wide, 1, &[7; 255]),
            Err(FieldError::IndexOutOfBounds { index: 1, len: 1, .. })
        ));
        assert_eq!(plain.dynamic_size(&wide, 0).unwrap(), 255);
    }
}
