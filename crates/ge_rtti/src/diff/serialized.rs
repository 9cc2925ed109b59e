use alloc::collections::BTreeMap;

use crate::error::{DiffError, FieldError};
use crate::info::{FieldCategory, FieldDescriptor, TypeDescriptor};
use crate::reflection::level;
use crate::{MemoryDataStream, Reflectable, SharedObject};

// -----------------------------------------------------------------------------
// SerializedObject

/// The fields of one object, grouped by inheritance level.
///
/// A full snapshot holds every field of every level. A diff holds only the
/// entries that changed.
#[derive(Debug, Clone)]
pub struct SerializedObject {
    /// Descriptor of the most derived type.
    pub rtti: &'static TypeDescriptor,
    /// One entry per level, most derived first.
    pub sub_objects: Vec<SerializedSubObject>,
}

/// The fields one level of the inheritance chain contributes.
#[derive(Debug, Clone)]
pub struct SerializedSubObject {
    pub type_id: u32,
    pub entries: BTreeMap<u16, SerializedInstance>,
}

/// The elements of an array field. Diffs only keep the changed indices.
#[derive(Debug, Clone, Default)]
pub struct SerializedArray {
    pub num_elements: u32,
    pub entries: BTreeMap<u32, SerializedInstance>,
}

/// The value of one field or array element.
#[derive(Debug, Clone)]
pub enum SerializedInstance {
    /// Encoded bytes of a plain value.
    Plain(Vec<u8>),
    /// The bytes of a data block.
    DataBlock(MemoryDataStream),
    /// A nested by-value object.
    Object(SerializedObject),
    /// A shared reference, compared by identity.
    Reference(Option<SharedObject>),
    Array(SerializedArray),
}

impl SerializedObject {
    /// Snapshots every field of `object`.
    ///
    /// Serialization hooks run around each level, like when encoding.
    pub fn new(object: &dyn Reflectable) -> Result<Self, DiffError> {
        let rtti = object.rtti();
        let mut sub_objects = Vec::new();

        for (depth, level_rtti) in rtti.ancestors().enumerate() {
            let Some(part) = level(object, depth) else {
                break;
            };

            level_rtti.on_serialization_started(part, None);
            let entries = snapshot_level(level_rtti, part);
            level_rtti.on_serialization_ended(part, None);

            sub_objects.push(SerializedSubObject {
                type_id: level_rtti.rtti_id(),
                entries: entries?,
            });
        }

        Ok(Self { rtti, sub_objects })
    }

    /// An empty diff for objects of type `rtti`.
    #[inline]
    pub fn empty(rtti: &'static TypeDescriptor) -> Self {
        Self {
            rtti,
            sub_objects: Vec::new(),
        }
    }

    #[inline]
    pub fn root_type_id(&self) -> u32 {
        self.rtti.rtti_id()
    }

    pub fn sub_object(&self, type_id: u32) -> Option<&SerializedSubObject> {
        self.sub_objects.iter().find(|sub| sub.type_id == type_id)
    }

    /// The descriptor of the level `type_id` in the chain of the root type.
    pub(crate) fn level_type(&self, type_id: u32) -> Option<&'static TypeDescriptor> {
        let mut current = Some(self.rtti);
        while let Some(rtti) = current {
            if rtti.rtti_id() == type_id {
                return Some(rtti);
            }
            current = rtti.base_type();
        }
        None
    }

    /// `true` if no level has entries.
    pub fn is_empty(&self) -> bool {
        self.sub_objects.iter().all(|sub| sub.entries.is_empty())
    }
}

// -----------------------------------------------------------------------------
// Snapshot

fn snapshot_level(
    rtti: &TypeDescriptor,
    object: &dyn Reflectable,
) -> Result<BTreeMap<u16, SerializedInstance>, DiffError> {
    let mut entries = BTreeMap::new();

    for field in rtti.fields() {
        let context = |source: FieldError| DiffError::Field {
            type_name: rtti.name(),
            field: field.name(),
            source,
        };

        let instance = if field.is_array() {
            let num_elements = field.array_size(object).map_err(context)?;
            let mut array = SerializedArray {
                num_elements,
                entries: BTreeMap::new(),
            };
            for index in 0..num_elements {
                let element = snapshot_element(field, object, index)?;
                array.entries.insert(index, element);
            }
            SerializedInstance::Array(array)
        } else {
            snapshot_element(field, object, 0)?
        };

        entries.insert(field.unique_id(), instance);
    }

    Ok(entries)
}

fn snapshot_element(
    field: &FieldDescriptor,
    object: &dyn Reflectable,
    index: u32,
) -> Result<SerializedInstance, DiffError> {
    let context = |source: FieldError| DiffError::Field {
        type_name: object.rtti_name(),
        field: field.name(),
        source,
    };

    match field.category() {
        FieldCategory::Plain => {
            let mut bytes = Vec::new();
            field
                .expect_plain()
                .and_then(|plain| plain.to_buffer(object, index, &mut bytes))
                .map_err(context)?;
            Ok(SerializedInstance::Plain(bytes))
        }
        FieldCategory::Reflectable => {
            let value = field
                .expect_reflectable()
                .and_then(|access| access.get(object, index))
                .map_err(context)?;
            Ok(SerializedInstance::Object(SerializedObject::new(value)?))
        }
        FieldCategory::ReflectablePtr => {
            let value = field
                .expect_reflectable_ptr()
                .and_then(|access| access.get(object, index))
                .map_err(context)?;
            Ok(SerializedInstance::Reference(value))
        }
        FieldCategory::DataBlock => {
            let (stream, size) = field
                .expect_data_block()
                .and_then(|access| access.get(object))
                .map_err(context)?;
            Ok(SerializedInstance::DataBlock(MemoryDataStream::from(stream.block(size))))
        }
    }
}
