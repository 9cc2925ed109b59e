use alloc::collections::BTreeMap;
use core::any::Any;

use log::warn;

use super::{DiffHandler, SerializedArray, SerializedInstance, SerializedObject, SerializedSubObject};
use crate::error::{DiffError, FieldError};
use crate::info::{FieldCategory, FieldDescriptor, TypeDescriptor};
use crate::Reflectable;
use crate::reflection::level_mut;

// -----------------------------------------------------------------------------
// BinaryDiff

/// The default [`DiffHandler`].
///
/// Plain values and data blocks are compared byte by byte, references by
/// identity and nested objects recursively with their own type's handler.
/// Arrays are compared per index, a changed element count is always part of
/// the diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryDiff;

impl DiffHandler for BinaryDiff {
    fn generate_diff(
        &self,
        original: &SerializedObject,
        new: &SerializedObject,
    ) -> Option<SerializedObject> {
        let mut output = SerializedObject::empty(new.rtti);

        for sub_object in &new.sub_objects {
            let Some(rtti) = new.level_type(sub_object.type_id) else {
                continue;
            };
            let original_sub = original.sub_object(sub_object.type_id);

            let mut entries = BTreeMap::new();
            for (&unique_id, new_entry) in &sub_object.entries {
                let Some(field) = rtti.find_field_by_id(unique_id) else {
                    continue;
                };

                let original_entry = original_sub.and_then(|sub| sub.entries.get(&unique_id));
                let modification = match original_entry {
                    Some(original_entry) => diff_entry(field, original_entry, new_entry),
                    None => Some(new_entry.clone()),
                };

                if let Some(modification) = modification {
                    entries.insert(unique_id, modification);
                }
            }

            if !entries.is_empty() {
                output.sub_objects.push(SerializedSubObject {
                    type_id: sub_object.type_id,
                    entries,
                });
            }
        }

        if output.sub_objects.is_empty() {
            None
        } else {
            Some(output)
        }
    }

    fn apply_diff(
        &self,
        object: &mut dyn Reflectable,
        diff: &SerializedObject,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), DiffError> {
        let rtti = object.rtti();
        if rtti.rtti_id() != diff.root_type_id() {
            return Err(DiffError::TypeMismatch {
                expected: diff.rtti.name(),
                found: rtti.name(),
            });
        }

        // Levels touched by the diff, base first.
        let mut levels = Vec::new();
        for sub_object in &diff.sub_objects {
            let found = rtti
                .ancestors()
                .enumerate()
                .find(|(_, level)| level.rtti_id() == sub_object.type_id);
            if let Some((depth, level_rtti)) = found {
                levels.push((depth, level_rtti, sub_object));
            }
        }
        levels.sort_by(|a, b| b.0.cmp(&a.0));

        for &(depth, level_rtti, _) in &levels {
            if let Some(part) = level_mut(object, depth) {
                level_rtti.on_deserialization_started(part, context.as_deref_mut());
            }
        }

        let mut result = Ok(());
        for &(depth, level_rtti, sub_object) in &levels {
            let Some(part) = level_mut(object, depth) else {
                continue;
            };
            result = apply_level(level_rtti, part, sub_object, context.as_deref_mut());
            if result.is_err() {
                break;
            }
        }

        for &(depth, level_rtti, _) in &levels {
            if let Some(part) = level_mut(object, depth) {
                level_rtti.on_deserialization_ended(part, context.as_deref_mut());
            }
        }

        result
    }
}

// -----------------------------------------------------------------------------
// Generate

fn diff_entry(
    field: &FieldDescriptor,
    original: &SerializedInstance,
    new: &SerializedInstance,
) -> Option<SerializedInstance> {
    match (original, new) {
        (SerializedInstance::Array(original), SerializedInstance::Array(new)) => {
            let mut output = SerializedArray {
                num_elements: new.num_elements,
                entries: BTreeMap::new(),
            };
            for (&index, new_element) in &new.entries {
                let modification = match original.entries.get(&index) {
                    Some(original_element) => diff_element(field, original_element, new_element),
                    None => Some(new_element.clone()),
                };
                if let Some(modification) = modification {
                    output.entries.insert(index, modification);
                }
            }

            if output.entries.is_empty() && original.num_elements == new.num_elements {
                None
            } else {
                Some(SerializedInstance::Array(output))
            }
        }
        _ => diff_element(field, original, new),
    }
}

fn diff_element(
    field: &FieldDescriptor,
    original: &SerializedInstance,
    new: &SerializedInstance,
) -> Option<SerializedInstance> {
    use SerializedInstance::{DataBlock, Object, Plain, Reference};

    let changed = match (original, new) {
        (Plain(original), Plain(new)) => original != new,
        (DataBlock(original), DataBlock(new)) => original != new,
        (Reference(original), Reference(new)) => original != new,
        (Object(original), Object(new)) => {
            if original.root_type_id() != new.root_type_id() {
                return Some(Object(new.clone()));
            }
            let handler = new.rtti.diff_handler();
            return handler
                .generate_diff(original, new)
                .map(Object);
        }
        _ => {
            warn!(
                "field `{}` changed its layout between snapshots, taking the new value",
                field.name()
            );
            true
        }
    };

    changed.then(|| new.clone())
}

// -----------------------------------------------------------------------------
// Apply

fn apply_level(
    rtti: &TypeDescriptor,
    object: &mut dyn Reflectable,
    sub_object: &SerializedSubObject,
    mut context: Option<&mut dyn Any>,
) -> Result<(), DiffError> {
    for (&unique_id, entry) in &sub_object.entries {
        let Some(field) = rtti.find_field_by_id(unique_id) else {
            continue;
        };

        let field_error = |source: FieldError| DiffError::Field {
            type_name: rtti.name(),
            field: field.name(),
            source,
        };

        if field.is_array() {
            let SerializedInstance::Array(array) = entry else {
                warn!(
                    "diff entry of `{}::{}` is not an array, skipped",
                    rtti.name(),
                    field.name()
                );
                continue;
            };

            let current = field.array_size(object).map_err(field_error)?;
            if field.is_resizable() && current != array.num_elements {
                field
                    .set_array_size(object, array.num_elements)
                    .map_err(field_error)?;
            }

            let len = field.array_size(object).map_err(field_error)?;
            for (&index, element) in &array.entries {
                if index >= len {
                    continue;
                }
                apply_element(rtti, field, object, index, element, context.as_deref_mut())?;
            }
        } else {
            apply_element(rtti, field, object, 0, entry, context.as_deref_mut())?;
        }
    }

    Ok(())
}

fn apply_element(
    rtti: &TypeDescriptor,
    field: &FieldDescriptor,
    object: &mut dyn Reflectable,
    index: u32,
    entry: &SerializedInstance,
    context: Option<&mut dyn Any>,
) -> Result<(), DiffError> {
    let field_error = |source: FieldError| DiffError::Field {
        type_name: rtti.name(),
        field: field.name(),
        source,
    };

    match (field.category(), entry) {
        (FieldCategory::Plain, SerializedInstance::Plain(bytes)) => field
            .expect_plain()
            .and_then(|plain| plain.from_buffer(object, index, bytes))
            .map_err(field_error),
        (FieldCategory::DataBlock, SerializedInstance::DataBlock(stream)) => field
            .expect_data_block()
            .and_then(|block| block.set(object, stream.clone(), stream.len() as u32))
            .map_err(field_error),
        (FieldCategory::ReflectablePtr, SerializedInstance::Reference(target)) => field
            .expect_reflectable_ptr()
            .and_then(|access| access.set(object, index, target.clone()))
            .map_err(field_error),
        (FieldCategory::Reflectable, SerializedInstance::Object(nested)) => {
            let value = field
                .expect_reflectable()
                .and_then(|access| access.get_mut(object, index))
                .map_err(field_error)?;
            if value.rtti_id() != nested.root_type_id() {
                warn!(
                    "diff of `{}::{}` targets `{}` but the value is `{}`, skipped",
                    rtti.name(),
                    field.name(),
                    nested.rtti.name(),
                    value.rtti_name()
                );
                return Ok(());
            }
            let handler = value.rtti().diff_handler();
            handler.apply_diff(value, nested, context)
        }
        (category, _) => {
            warn!(
                "diff entry of `{}::{}` does not match the {category:?} field, skipped",
                rtti.name(),
                field.name()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use std::sync::RwLock;

    use crate::diff::{self, SerializedInstance};
    use crate::error::DiffError;
    use crate::info::TypeDescriptorBuilder;
    use crate::{Reflectable, SharedObject};

    #[derive(Reflectable, Default, Debug, Clone, PartialEq)]
    #[rtti(id = 200, name = "diff::Vec2")]
    struct Vec2 {
        #[rtti(id = 1)]
        x: f32,
        #[rtti(id = 2)]
        y: f32,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 201, name = "diff::Body")]
    struct Body {
        #[rtti(id = 1)]
        mass: f32,
        #[rtti(id = 2, reflectable)]
        position: Vec2,
        #[rtti(id = 3, array)]
        tags: Vec<String>,
        #[rtti(id = 4, ptr)]
        target: Option<Arc<RwLock<Vec2>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 202, name = "diff::Player", base = body, customize = Self::hooks)]
    struct Player {
        body: Body,
        #[rtti(id = 10)]
        name: String,
        #[rtti(id = 11, array, readonly)]
        slots: Vec<u8>,
        applied: u32,
    }

    impl Player {
        fn hooks(builder: TypeDescriptorBuilder<Self>) -> TypeDescriptorBuilder<Self> {
            builder.on_deserialization_ended(|player, context| {
                player.applied += 1;
                if let Some(log) = context.and_then(|ctx| ctx.downcast_mut::<Vec<&'static str>>()) {
                    log.push("player");
                }
            })
        }
    }

    #[test]
    fn equal_objects_have_no_diff() {
        let a = Vec2 { x: 1.0, y: 2.0 };
        assert!(diff::generate_diff(&a, &a.clone()).unwrap().is_none());
    }

    #[test]
    fn nested_and_array_changes() {
        let old = Body {
            mass: 1.0,
            position: Vec2 { x: 0.0, y: 0.0 },
            tags: vec!["a".into(), "b".into()],
            target: None,
        };
        let new = Body {
            mass: 1.0,
            position: Vec2 { x: 0.0, y: 5.0 },
            tags: vec!["a".into(), "c".into(), "d".into()],
            target: None,
        };

        let patch = diff::generate_diff(&old, &new).unwrap().unwrap();
        let entries = &patch.sub_objects[0].entries;
        assert!(!entries.contains_key(&1));
        let Some(SerializedInstance::Object(position)) = entries.get(&2) else {
            panic!("expected a nested diff");
        };
        assert_eq!(position.sub_objects[0].entries.len(), 1);
        let Some(SerializedInstance::Array(tags)) = entries.get(&3) else {
            panic!("expected an array diff");
        };
        assert_eq!(tags.num_elements, 3);
        assert_eq!(tags.entries.keys().copied().collect::<Vec<_>>(), [1, 2]);

        let mut target = Body {
            mass: 9.0,
            tags: vec!["z".into()],
            ..Body::default()
        };
        diff::apply_diff(&mut target, &patch, None).unwrap();
        assert_eq!(target.mass, 9.0);
        assert_eq!(target.position, Vec2 { x: 0.0, y: 5.0 });
        assert_eq!(target.tags, ["z", "c", "d"]);
    }

    #[test]
    fn references_compare_by_identity() {
        let shared = Arc::new(RwLock::new(Vec2::default()));
        let old = Body::default();
        let new = Body {
            target: Some(shared.clone()),
            ..Body::default()
        };

        let patch = diff::generate_diff(&old, &new).unwrap().unwrap();
        let mut target = Body::default();
        diff::apply_diff(&mut target, &patch, None).unwrap();
        assert!(Arc::ptr_eq(target.target.as_ref().unwrap(), &shared));

        // Equal contents behind another allocation is still a change.
        let other = Body {
            target: Some(Arc::new(RwLock::new(Vec2::default()))),
            ..Body::default()
        };
        assert!(diff::generate_diff(&new, &other).unwrap().is_some());
        assert!(diff::generate_diff(&new, &new).unwrap().is_none());
    }

    #[test]
    fn inherited_levels_and_hooks() {
        let old = Player::default();
        let new = Player {
            body: Body {
                mass: 3.0,
                ..Body::default()
            },
            name: "ada".into(),
            slots: vec![1, 2, 3],
            applied: 0,
        };

        let patch = diff::generate_diff(&old, &new).unwrap().unwrap();
        assert_eq!(patch.sub_objects.len(), 2);

        let mut target = Player {
            slots: vec![0; 2],
            ..Player::default()
        };
        let mut log: Vec<&str> = Vec::new();
        diff::apply_diff(&mut target, &patch, Some(&mut log)).unwrap();

        assert_eq!(target.name, "ada");
        assert_eq!(target.body.mass, 3.0);
        // Readonly arrays keep their length.
        assert_eq!(target.slots, [1, 2]);
        assert_eq!(target.applied, 1);
        assert_eq!(log, ["player"]);
    }

    #[test]
    fn unknown_entries_are_ignored() {
        let new = Vec2 { x: 4.0, y: 0.0 };
        let mut patch = diff::generate_diff(&Vec2::default(), &new).unwrap().unwrap();
        patch.sub_objects[0]
            .entries
            .insert(99, SerializedInstance::Plain(vec![1, 2, 3]));
        // Wrong category for `y`.
        patch.sub_objects[0]
            .entries
            .insert(2, SerializedInstance::Reference(None));

        let mut target = Vec2::default();
        diff::apply_diff(&mut target, &patch, None).unwrap();
        assert_eq!(target, Vec2 { x: 4.0, y: 0.0 });
    }

    #[test]
    fn root_type_must_match() {
        let patch = diff::generate_diff(&Vec2::default(), &Vec2 { x: 1.0, y: 1.0 })
            .unwrap()
            .unwrap();
        let mut body = Body::default();
        assert!(matches!(
            diff::apply_diff(&mut body, &patch, None),
            Err(DiffError::TypeMismatch { .. })
        ));
        assert!(matches!(
            diff::generate_diff(&Vec2::default(), &body),
            Err(DiffError::TypeMismatch { .. })
        ));

        let shared = SharedObject::new(Vec2::default());
        diff::apply_diff(&mut *shared.write(), &patch, None).unwrap();
        assert_eq!(shared.downcast::<Vec2>().unwrap().read().unwrap().x, 1.0);
    }
}
