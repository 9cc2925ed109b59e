//! Parsing of `#[rtti(...)]` attributes.

use proc_macro2::Span;
use syn::{Attribute, Ident, LitInt, LitStr, Path};

use crate::RTTI_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// Type Attributes

/// Attributes on the type itself.
pub(crate) struct TypeAttributes {
    pub id: Option<LitInt>,
    pub name: Option<LitStr>,
    pub base: Option<Ident>,
    pub is_abstract: bool,
    pub auto_register: bool,
    pub customize: Option<Path>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self {
            id: None,
            name: None,
            base: None,
            is_abstract: false,
            auto_register: false,
            customize: None,
        };

        for attr in attrs {
            if !attr.path().is_ident(RTTI_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    out.id = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("name") {
                    out.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("base") {
                    out.base = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("abstract") {
                    out.is_abstract = true;
                } else if meta.path.is_ident("auto_register") {
                    out.auto_register = true;
                } else if meta.path.is_ident("customize") {
                    out.customize = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown type attribute, expected one of \
                        `id`, `name`, `base`, `abstract`, `auto_register`, `customize`"));
                }
                Ok(())
            })?;
        }

        Ok(out)
    }
}

// -----------------------------------------------------------------------------
// Field Attributes

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Plain,
    Reflectable,
    Ptr,
    DataBlock,
}

/// Attributes on one field. `None` when the field is not serialized.
pub(crate) struct FieldAttributes {
    pub id: LitInt,
    pub kind: FieldKind,
    pub array: bool,
    pub readonly: bool,
    pub weak: bool,
    pub get: Option<Path>,
    pub set: Option<Path>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute], span: Span) -> syn::Result<Option<Self>> {
        let mut found = false;
        let mut id: Option<LitInt> = None;
        let mut kind: Option<FieldKind> = None;
        let mut array = false;
        let mut readonly = false;
        let mut weak = false;
        let mut get = None;
        let mut set = None;

        for attr in attrs {
            if !attr.path().is_ident(RTTI_ATTRIBUTE_NAME) {
                continue;
            }
            found = true;
            attr.parse_nested_meta(|meta| {
                let mut set_kind = |new: FieldKind| {
                    if kind.replace(new).is_some() {
                        Err(meta.error("a field can only have one category"))
                    } else {
                        Ok(())
                    }
                };

                if meta.path.is_ident("reflectable") {
                    set_kind(FieldKind::Reflectable)?;
                } else if meta.path.is_ident("ptr") {
                    set_kind(FieldKind::Ptr)?;
                } else if meta.path.is_ident("data_block") {
                    set_kind(FieldKind::DataBlock)?;
                } else if meta.path.is_ident("id") {
                    id = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("array") {
                    array = true;
                } else if meta.path.is_ident("readonly") {
                    readonly = true;
                } else if meta.path.is_ident("weak") {
                    weak = true;
                } else if meta.path.is_ident("get") {
                    get = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("set") {
                    set = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown field attribute, expected one of \
                        `id`, `reflectable`, `ptr`, `data_block`, `array`, `readonly`, \
                        `weak`, `get`, `set`"));
                }
                Ok(())
            })?;
        }

        if !found {
            return Ok(None);
        }

        let Some(id) = id else {
            return Err(syn::Error::new(span, "serialized fields need `#[rtti(id = ...)]`"));
        };
        let kind = kind.unwrap_or(FieldKind::Plain);

        if weak && kind != FieldKind::Ptr {
            return Err(syn::Error::new(span, "`weak` only applies to `ptr` fields"));
        }
        if readonly && !array {
            return Err(syn::Error::new(span, "`readonly` only applies to `array` fields"));
        }
        if kind == FieldKind::DataBlock {
            if array {
                return Err(syn::Error::new(span, "data block fields cannot be arrays"));
            }
            if get.is_none() || set.is_none() {
                return Err(syn::Error::new(
                    span,
                    "data block fields need `get = path` and `set = path`",
                ));
            }
        } else if get.is_some() || set.is_some() {
            return Err(syn::Error::new(span, "`get` and `set` only apply to `data_block` fields"));
        }

        Ok(Some(Self {
            id,
            kind,
            array,
            readonly,
            weak,
            get,
            set,
        }))
    }
}
