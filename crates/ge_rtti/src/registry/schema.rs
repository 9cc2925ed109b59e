use serde::{Deserialize, Serialize};

use super::TypeRegistry;
use crate::info::{FieldCategory, FieldDescriptor, TypeDescriptor};

// -----------------------------------------------------------------------------
// Schema

/// A serializable description of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub unique_id: u16,
    pub name: String,
    pub category: FieldCategory,
    pub is_array: bool,
    pub type_size: u32,
    pub has_dynamic_size: bool,
    #[serde(default)]
    pub weak_ref: bool,
    /// Type name of by-value objects and typed references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

/// A serializable description of one registered type.
///
/// Comparing the schema exported by two builds shows which fields were
/// added, removed or changed between them.
///
/// # Examples
///
/// ```
/// use ge_rtti::{Reflectable, TypeRegistry};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 150, name = "Door")]
/// struct Door {
///     #[rtti(id = 1)]
///     open: bool,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Door>();
///
/// let schema = registry.schema();
/// assert_eq!(schema[0].name, "Door");
/// assert_eq!(schema[0].fields[0].name, "open");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub rtti_id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<u32>,
    pub is_abstract: bool,
    pub fields: Vec<FieldSchema>,
}

impl From<&FieldDescriptor> for FieldSchema {
    fn from(field: &FieldDescriptor) -> Self {
        let value_type = match (field.as_reflectable(), field.as_reflectable_ptr()) {
            (Some(value), _) => Some(value.value_type().name()),
            (_, Some(ptr)) => ptr.pointee_type().map(TypeDescriptor::name),
            _ => None,
        };
        Self {
            unique_id: field.unique_id(),
            name: field.name().into(),
            category: field.category(),
            is_array: field.is_array(),
            type_size: field.type_size(),
            has_dynamic_size: field.has_dynamic_size(),
            weak_ref: field.is_weak_ref(),
            value_type: value_type.map(Into::into),
        }
    }
}

impl From<&TypeDescriptor> for TypeSchema {
    fn from(rtti: &TypeDescriptor) -> Self {
        Self {
            rtti_id: rtti.rtti_id(),
            name: rtti.name().into(),
            base: rtti.base_type().map(TypeDescriptor::rtti_id),
            is_abstract: rtti.is_abstract(),
            fields: rtti.fields().iter().map(FieldSchema::from).collect(),
        }
    }
}

impl TypeRegistry {
    /// Describes every registered type, sorted by rtti id.
    pub fn schema(&self) -> Vec<TypeSchema> {
        let mut schema: Vec<TypeSchema> = self.iter().map(TypeSchema::from).collect();
        schema.sort_by_key(|rtti| rtti.rtti_id);
        schema
    }
}
