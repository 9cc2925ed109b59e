use alloc::collections::VecDeque;
use alloc::sync::Arc;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ge_utils::hash::{HashMap, HashSet};

use crate::error::RegistrationError;
use crate::info::TypeDescriptor;
use crate::{SharedObject, Typed};

// -----------------------------------------------------------------------------
// TypeRegistry

/// A registry of reflectable types, indexed by rtti id and by name.
///
/// The decoder looks every type id it meets up here. Registering a type also
/// registers its base chain and the types of its by-value and reference
/// fields, and records it in the derived list of its base.
///
/// # Example
///
/// ```
/// use ge_rtti::{Reflectable, TypeRegistry};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 110, name = "Entity")]
/// struct Entity {
///     #[rtti(id = 1)]
///     id: u64,
/// }
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 111, name = "Player", base = entity)]
/// struct Player {
///     entity: Entity,
///     #[rtti(id = 2)]
///     nickname: String,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Player>();
///
/// // The base type is registered along with it.
/// assert!(registry.contains(110));
/// assert_eq!(registry.get_with_name("Player").unwrap().rtti_id(), 111);
/// assert!(registry.is_derived_from(111, 110));
///
/// let player = registry.create_instance(111).unwrap();
/// assert_eq!(player.read().rtti_name(), "Player");
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<u32, &'static TypeDescriptor>,
    type_names: HashMap<&'static str, u32>,
    derived_types: HashMap<u32, Vec<u32>>,
    #[cfg(feature = "auto_register")]
    pub(super) auto_registered: bool,
}

impl TypeRegistry {
    /// Create a empty [`TypeRegistry`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` and its dependencies if not registered yet.
    ///
    /// # Panics
    ///
    /// Panics if the rtti id or the name of `T`, or of one of its
    /// dependencies, is already used by another type.
    /// Use [`try_register`](Self::try_register) to handle the error.
    pub fn register<T: Typed>(&mut self) {
        self.register_descriptor(T::rtti_static());
    }

    /// Registers `T` and its dependencies.
    ///
    /// Returns `Ok(false)` if `T` was already registered.
    #[inline]
    pub fn try_register<T: Typed>(&mut self) -> Result<bool, RegistrationError> {
        self.try_register_descriptor(T::rtti_static())
    }

    /// Registers a descriptor and its dependencies, see [`register`](Self::register).
    pub fn register_descriptor(&mut self, rtti: &'static TypeDescriptor) {
        if let Err(err) = self.try_register_descriptor(rtti) {
            panic!("failed to register `{}`: {err}", rtti.name());
        }
    }

    /// Registers a descriptor and its dependencies, see [`try_register`](Self::try_register).
    ///
    /// Nothing is registered when any type of the dependency closure
    /// conflicts with a registered type or with another type of the closure.
    pub fn try_register_descriptor(
        &mut self,
        rtti: &'static TypeDescriptor,
    ) -> Result<bool, RegistrationError> {
        let pending = self.collect_unregistered(rtti)?;
        if pending.is_empty() {
            return Ok(false);
        }

        for rtti in pending {
            self.types.insert(rtti.rtti_id(), rtti);
            self.type_names.insert(rtti.name(), rtti.rtti_id());
            if let Some(base) = rtti.base_type() {
                self.derived_types
                    .entry(base.rtti_id())
                    .or_default()
                    .push(rtti.rtti_id());
            }
        }
        Ok(true)
    }

    /// `rtti` and every dependency not registered yet, in discovery order.
    fn collect_unregistered(
        &self,
        rtti: &'static TypeDescriptor,
    ) -> Result<Vec<&'static TypeDescriptor>, RegistrationError> {
        let mut pending = Vec::new();
        let mut pending_ids: HashMap<u32, &'static TypeDescriptor> = HashMap::default();
        let mut pending_names: HashMap<&'static str, u32> = HashMap::default();
        let mut stack = vec![rtti];

        while let Some(rtti) = stack.pop() {
            let rtti_id = rtti.rtti_id();
            let known = self
                .types
                .get(&rtti_id)
                .or_else(|| pending_ids.get(&rtti_id));
            if let Some(&existing) = known {
                if core::ptr::eq(existing, rtti) {
                    continue;
                }
                return Err(RegistrationError::DuplicateTypeId {
                    rtti_id,
                    existing: existing.name(),
                    name: rtti.name(),
                });
            }

            let named = self
                .type_names
                .get(rtti.name())
                .or_else(|| pending_names.get(rtti.name()));
            if let Some(&existing_id) = named {
                return Err(RegistrationError::DuplicateTypeName {
                    name: rtti.name(),
                    existing_id,
                });
            }

            pending_ids.insert(rtti_id, rtti);
            pending_names.insert(rtti.name(), rtti_id);
            pending.push(rtti);
            stack.extend(dependencies(rtti));
        }

        Ok(pending)
    }

    #[inline]
    pub fn contains(&self, rtti_id: u32) -> bool {
        self.types.contains_key(&rtti_id)
    }

    #[inline]
    pub fn get(&self, rtti_id: u32) -> Option<&'static TypeDescriptor> {
        self.types.get(&rtti_id).copied()
    }

    #[inline]
    pub fn get_with_name(&self, name: &str) -> Option<&'static TypeDescriptor> {
        self.type_names.get(name).and_then(|id| self.get(*id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered descriptors, in no particular order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'static TypeDescriptor> + '_ {
        self.types.values().copied()
    }

    /// Ids of the types registered with `rtti_id` as their direct base.
    #[inline]
    pub fn derived_types(&self, rtti_id: u32) -> &[u32] {
        self.derived_types
            .get(&rtti_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` if `derived` is `base` or one of its registered
    /// descendants.
    ///
    /// Walks the derived lists breadth first, starting at `base`.
    pub fn is_derived_from(&self, derived: u32, base: u32) -> bool {
        if derived == base {
            return true;
        }

        let mut visited = HashSet::<u32>::default();
        let mut queue = VecDeque::from([base]);
        while let Some(current) = queue.pop_front() {
            for &child in self.derived_types(current) {
                if child == derived {
                    return true;
                }
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        false
    }

    /// A blank instance of the type `rtti_id`.
    ///
    /// `None` if the type is unknown or abstract.
    #[inline]
    pub fn create_instance(&self, rtti_id: u32) -> Option<SharedObject> {
        self.get(rtti_id).and_then(TypeDescriptor::new_shared)
    }

    /// Checks that no two registered types strongly reference each other.
    ///
    /// Such a pair can form a cycle that the decoder rejects, one of the
    /// two fields has to be marked [`WEAK_REF`](crate::info::FieldFlags::WEAK_REF).
    /// Reference fields that accept any type are not checked.
    pub fn check_for_circular_references(&self) -> Result<(), RegistrationError> {
        let mut types: Vec<&'static TypeDescriptor> = self.iter().collect();
        types.sort_by_key(|rtti| rtti.rtti_id());

        for &first in &types {
            for second in strong_pointees(first) {
                if second.rtti_id() == first.rtti_id() {
                    continue;
                }
                if strong_pointees(second).any(|back| first.is_subtype_of(back)) {
                    return Err(RegistrationError::CircularReference {
                        first: first.name(),
                        second: second.name(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The base type and the by-value and typed reference field types of `rtti`.
fn dependencies(
    rtti: &'static TypeDescriptor,
) -> impl Iterator<Item = &'static TypeDescriptor> {
    let fields = rtti.fields().iter().filter_map(|field| {
        if let Some(value) = field.as_reflectable() {
            Some(value.value_type())
        } else {
            field.as_reflectable_ptr()?.pointee_type()
        }
    });
    rtti.base_type().into_iter().chain(fields)
}

/// Pointee types of the strong reference fields of `rtti`, inherited fields included.
fn strong_pointees(rtti: &TypeDescriptor) -> impl Iterator<Item = &'static TypeDescriptor> + '_ {
    rtti.ancestors()
        .flat_map(|level| level.fields().iter())
        .filter(|field| !field.is_weak_ref())
        .filter_map(|field| field.as_reflectable_ptr()?.pointee_type())
}

impl core::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.types.iter().map(|(id, rtti)| (id, rtti.name())))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// TypeRegistryArc

/// A shared [`TypeRegistry`], for handing a populated registry to other threads.
#[derive(Clone, Default)]
pub struct TypeRegistryArc {
    /// The wrapped [`TypeRegistry`].
    pub internal: Arc<RwLock<TypeRegistry>>,
}

impl TypeRegistryArc {
    #[inline]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// Takes a read lock on the underlying [`TypeRegistry`].
    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`TypeRegistry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for TypeRegistryArc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.internal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::{TypeRegistry, TypeRegistryArc};
    use crate::error::RegistrationError;
    use crate::{Reflectable, SharedObject, Typed};

    #[derive(Reflectable, Default)]
    #[rtti(id = 120, name = "registry::Base")]
    struct Base {
        #[rtti(id = 1)]
        flag: bool,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 121, name = "registry::Left", base = base)]
    struct Left {
        base: Base,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 122, name = "registry::LeftLeaf", base = left)]
    struct LeftLeaf {
        left: Left,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 123, name = "registry::Right", base = base)]
    struct Right {
        base: Base,
        #[rtti(id = 2, reflectable)]
        inner: Inner,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 124, name = "registry::Inner")]
    struct Inner {
        #[rtti(id = 1)]
        value: u8,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 124, name = "registry::Impostor")]
    struct Impostor;

    #[derive(Reflectable, Default)]
    #[rtti(id = 125, name = "registry::Inner")]
    struct SameName;

    #[derive(Reflectable)]
    #[rtti(id = 126, name = "registry::Shape", abstract)]
    struct Shape {
        #[rtti(id = 1)]
        sides: u8,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 127, name = "registry::Owner")]
    struct Owner {
        #[rtti(id = 1, ptr)]
        part: Option<Arc<RwLock<Part>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 128, name = "registry::Part")]
    struct Part {
        #[rtti(id = 1, ptr)]
        owner: Option<Arc<RwLock<Owner>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 129, name = "registry::WeakPart")]
    struct WeakPart {
        #[rtti(id = 1, ptr, weak)]
        owner: Option<Arc<RwLock<WeakOwner>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 130, name = "registry::WeakOwner")]
    struct WeakOwner {
        #[rtti(id = 1, ptr)]
        part: Option<Arc<RwLock<WeakPart>>>,
        #[rtti(id = 2, ptr)]
        any: Option<SharedObject>,
    }

    #[test]
    fn register_is_idempotent_and_pulls_dependencies() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.try_register::<LeftLeaf>(), Ok(true));
        assert_eq!(registry.try_register::<LeftLeaf>(), Ok(false));
        assert_eq!(registry.len(), 3);

        registry.register::<Right>();
        assert!(registry.contains(124));
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get(121).unwrap().name(), "registry::Left");
    }

    #[test]
    fn derived_lookup_is_transitive() {
        let mut registry = TypeRegistry::new();
        registry.register::<LeftLeaf>();
        registry.register::<Right>();

        let mut direct = registry.derived_types(120).to_vec();
        direct.sort_unstable();
        assert_eq!(direct, [121, 123]);

        assert!(registry.is_derived_from(122, 120));
        assert!(registry.is_derived_from(122, 121));
        assert!(registry.is_derived_from(120, 120));
        assert!(!registry.is_derived_from(120, 122));
        assert!(!registry.is_derived_from(122, 123));
        assert!(LeftLeaf::rtti_static().is_subtype_of(Base::rtti_static()));
    }

    #[test]
    fn duplicate_ids_and_names() {
        let mut registry = TypeRegistry::new();
        registry.register::<Inner>();

        assert_eq!(
            registry.try_register::<Impostor>(),
            Err(RegistrationError::DuplicateTypeId {
                rtti_id: 124,
                existing: "registry::Inner",
                name: "registry::Impostor",
            })
        );
        assert_eq!(
            registry.try_register::<SameName>(),
            Err(RegistrationError::DuplicateTypeName {
                name: "registry::Inner",
                existing_id: 124,
            })
        );
    }

    #[test]
    fn failed_dependency_registers_nothing() {
        let mut registry = TypeRegistry::new();
        registry.register::<Impostor>();

        let err = RegistrationError::DuplicateTypeId {
            rtti_id: 124,
            existing: "registry::Impostor",
            name: "registry::Inner",
        };
        assert_eq!(registry.try_register::<Right>(), Err(err.clone()));
        assert!(!registry.contains(123));
        assert!(!registry.contains(120));
        assert!(registry.derived_types(120).is_empty());
        assert_eq!(registry.len(), 1);

        // A retry reports the same conflict instead of success.
        assert_eq!(registry.try_register::<Right>(), Err(err));
    }

    #[test]
    #[should_panic(expected = "failed to register `registry::Impostor`")]
    fn register_panics_on_conflict() {
        let mut registry = TypeRegistry::new();
        registry.register::<Inner>();
        registry.register::<Impostor>();
    }

    #[test]
    fn abstract_types_are_not_created() {
        let mut registry = TypeRegistry::new();
        registry.register::<Shape>();
        registry.register::<Inner>();

        assert!(registry.get(126).unwrap().is_abstract());
        assert!(registry.create_instance(126).is_none());
        assert!(registry.create_instance(124).is_some());
        assert!(registry.create_instance(999).is_none());
        let _ = Shape { sides: 3 };
    }

    #[test]
    fn static_cycle_check() {
        let mut registry = TypeRegistry::new();
        registry.register::<Owner>();
        assert!(matches!(
            registry.check_for_circular_references(),
            Err(RegistrationError::CircularReference { .. })
        ));

        let mut registry = TypeRegistry::new();
        registry.register::<WeakOwner>();
        assert!(registry.contains(129));
        assert_eq!(registry.check_for_circular_references(), Ok(()));
    }

    #[test]
    fn shared_registry() {
        let shared = TypeRegistryArc::default();
        shared.write().register::<Inner>();

        let reader = shared.clone();
        let handle = std::thread::spawn(move || reader.read().contains(124));
        assert!(handle.join().unwrap());
    }
}
