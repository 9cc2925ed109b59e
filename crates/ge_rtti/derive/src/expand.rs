//! Code generation of `#[derive(Reflectable)]`.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, Member};

use crate::attributes::{FieldAttributes, FieldKind, TypeAttributes};

// -----------------------------------------------------------------------------
// Entry

pub(crate) fn expand_reflectable(ast: &DeriveInput) -> syn::Result<TokenStream> {
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new(
            ast.generics.span(),
            "`Reflectable` cannot be derived for generic types",
        ));
    }

    let Data::Struct(data) = &ast.data else {
        return Err(syn::Error::new(
            ast.ident.span(),
            "`Reflectable` can only be derived for structs",
        ));
    };

    let attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    let Some(rtti_id) = &attrs.id else {
        return Err(syn::Error::new(
            ast.ident.span(),
            "missing `#[rtti(id = ...)]` on the type",
        ));
    };

    let ident = &ast.ident;
    let name = match &attrs.name {
        Some(name) => name.to_token_stream(),
        None => ident.to_string().to_token_stream(),
    };

    let builder = if attrs.is_abstract {
        quote!(::ge_rtti::info::TypeDescriptor::abstract_builder::<Self>(#rtti_id, #name))
    } else {
        quote!(::ge_rtti::info::TypeDescriptor::builder::<Self>(#rtti_id, #name))
    };

    let base = match &attrs.base {
        Some(base) => {
            find_base(&data.fields, base)?;
            quote!(.base(|s| &s.#base, |s| &mut s.#base))
        }
        None => TokenStream::new(),
    };

    let fields = expand_fields(&data.fields, attrs.base.as_ref())?;

    let customize = match &attrs.customize {
        Some(path) => quote!(let builder = #path(builder);),
        None => TokenStream::new(),
    };

    let auto_register = expand_auto_register(ident, &attrs);

    Ok(quote! {
        impl ::ge_rtti::Typed for #ident {
            fn rtti_static() -> &'static ::ge_rtti::info::TypeDescriptor {
                static CELL: ::ge_rtti::info::TypeDescriptorCell =
                    ::ge_rtti::info::TypeDescriptorCell::new();
                CELL.get_or_init(|| {
                    let builder = #builder #base #(#fields)*;
                    #customize
                    builder.finish()
                })
            }
        }

        ::ge_rtti::impl_reflectable!(#ident);

        #auto_register
    })
}

// -----------------------------------------------------------------------------
// Fields

fn find_base(fields: &Fields, base: &Ident) -> syn::Result<()> {
    let found = fields
        .iter()
        .any(|field| field.ident.as_ref() == Some(base));
    if found {
        Ok(())
    } else {
        Err(syn::Error::new(base.span(), "the base field does not exist"))
    }
}

fn expand_fields(fields: &Fields, base: Option<&Ident>) -> syn::Result<Vec<TokenStream>> {
    let mut out = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(attrs) = FieldAttributes::parse_attrs(&field.attrs, field.span())? else {
            continue;
        };

        if base.is_some() && field.ident.as_ref() == base {
            return Err(syn::Error::new(
                field.span(),
                "the base field cannot be serialized by itself",
            ));
        }

        let (member, name) = match &field.ident {
            Some(ident) => (Member::from(ident.clone()), ident.to_string()),
            None => (Member::from(index), index.to_string()),
        };
        let id = &attrs.id;

        let mut tokens = match (attrs.kind, attrs.array) {
            (FieldKind::Plain, false) => {
                quote!(.plain(#name, #id, |s| &s.#member, |s| &mut s.#member))
            }
            (FieldKind::Plain, true) => {
                quote!(.plain_array(#name, #id, |s| &s.#member, |s| &mut s.#member))
            }
            (FieldKind::Reflectable, false) => {
                quote!(.reflectable(#name, #id, |s| &s.#member, |s| &mut s.#member))
            }
            (FieldKind::Reflectable, true) => {
                quote!(.reflectable_array(#name, #id, |s| &s.#member, |s| &mut s.#member))
            }
            (FieldKind::Ptr, false) => {
                quote!(.reflectable_ptr(#name, #id, |s| &s.#member, |s| &mut s.#member))
            }
            (FieldKind::Ptr, true) => {
                quote!(.reflectable_ptr_array(#name, #id, |s| &s.#member, |s| &mut s.#member))
            }
            (FieldKind::DataBlock, _) => {
                let get = &attrs.get;
                let set = &attrs.set;
                quote!(.data_block(#name, #id, #get, #set))
            }
        };

        if attrs.weak {
            tokens.extend(quote!(.field_flags(::ge_rtti::info::FieldFlags::WEAK_REF)));
        }
        if attrs.readonly {
            tokens.extend(quote!(.readonly_size()));
        }

        out.push(tokens);
    }

    Ok(out)
}

// -----------------------------------------------------------------------------
// Auto Register

#[cfg(feature = "auto_register")]
fn expand_auto_register(ident: &Ident, attrs: &TypeAttributes) -> TokenStream {
    if attrs.auto_register {
        quote! {
            ::ge_rtti::auto_register!(#ident);
        }
    } else {
        TokenStream::new()
    }
}

#[cfg(not(feature = "auto_register"))]
fn expand_auto_register(_: &Ident, _: &TypeAttributes) -> TokenStream {
    TokenStream::new()
}
