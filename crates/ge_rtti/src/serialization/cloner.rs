use super::{decode_from_slice, encode_to_vec};
use crate::error::{CloneError, FieldError};
use crate::info::FieldCategory;
use crate::reflection::{level, level_mut};
use crate::{Reflectable, SharedObject, TypeRegistry};

// -----------------------------------------------------------------------------
// BinaryCloner

/// Copies objects by encoding them and decoding the result.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, RwLock};
/// use ge_rtti::serialization::BinaryCloner;
/// use ge_rtti::{Reflectable, SharedObject, TypeRegistry};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 1100, name = "Texture")]
/// struct Texture {
///     #[rtti(id = 1)]
///     path: String,
/// }
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 1101, name = "Material")]
/// struct Material {
///     #[rtti(id = 1)]
///     shininess: f32,
///     #[rtti(id = 2, ptr)]
///     texture: Option<Arc<RwLock<Texture>>>,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Material>();
///
/// let texture = Arc::new(RwLock::new(Texture { path: "brick.png".into() }));
/// let material = SharedObject::new(Material {
///     shininess: 0.5,
///     texture: Some(texture.clone()),
/// });
///
/// let deep = BinaryCloner::clone(&registry, &material, false).unwrap();
/// let deep = deep.downcast::<Material>().unwrap();
/// let deep_texture = deep.read().unwrap().texture.clone().unwrap();
/// assert!(!Arc::ptr_eq(&deep_texture, &texture));
/// assert_eq!(deep_texture.read().unwrap().path, "brick.png");
///
/// let shallow = BinaryCloner::clone(&registry, &material, true).unwrap();
/// let shallow = shallow.downcast::<Material>().unwrap();
/// assert!(Arc::ptr_eq(shallow.read().unwrap().texture.as_ref().unwrap(), &texture));
/// ```
#[derive(Debug)]
pub struct BinaryCloner;

impl BinaryCloner {
    /// Returns a copy of `object`.
    ///
    /// A deep clone copies every referenced object too, keeping shared
    /// references shared among the copies. A shallow clone copies `object`
    /// and its by-value fields only, its references point to the original
    /// targets.
    pub fn clone(
        registry: &TypeRegistry,
        object: &SharedObject,
        shallow: bool,
    ) -> Result<SharedObject, CloneError> {
        let bytes = encode_to_vec(object, shallow, None)?;
        let copy = decode_from_slice(registry, &bytes, None)?;

        if shallow {
            let source = object.read();
            let mut target = copy.write();
            restore_references(&*source, &mut *target)?;
        }

        Ok(copy)
    }
}

/// Copies every reference of `source` into `target`, nested objects included.
fn restore_references(
    source: &dyn Reflectable,
    target: &mut dyn Reflectable,
) -> Result<(), FieldError> {
    for (depth, rtti) in source.rtti().ancestors().enumerate() {
        let (Some(source), Some(target)) = (level(source, depth), level_mut(target, depth)) else {
            break;
        };

        for field in rtti.fields() {
            match field.category() {
                FieldCategory::ReflectablePtr => {
                    let access = field.expect_reflectable_ptr()?;
                    let count = field.element_count(source)?.min(field.element_count(target)?);
                    for index in 0..count {
                        access.set(target, index, access.get(source, index)?)?;
                    }
                }
                FieldCategory::Reflectable => {
                    let access = field.expect_reflectable()?;
                    let count = field.element_count(source)?.min(field.element_count(target)?);
                    for index in 0..count {
                        restore_references(
                            access.get(source, index)?,
                            access.get_mut(target, index)?,
                        )?;
                    }
                }
                FieldCategory::Plain | FieldCategory::DataBlock => {}
            }
        }
    }
    Ok(())
}
