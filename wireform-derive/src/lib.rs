//! # Wireform Derive Macros
//!
//! This crate provides the procedural macro for `wireform`. It implements
//! the `Reflect` trait for user-defined types, turning their structure into
//! the type-descriptor metadata the engine synthesises codecs from.
//!
//! ## Supported shapes
//! 1. **Structs with named fields:** each field becomes a `FieldDescriptor`
//!    in declaration order; field types must themselves implement `Reflect`.
//! 2. **Enums with unit variants:** the variant names become the enum's
//!    constant list and values travel as name strings.
//!
//! `#[wireform(rename = "…")]` overrides the wire name of the type, a
//! field, or a variant.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

/// Derives `wireform::Reflect`.
#[proc_macro_derive(WireformObject, attributes(wireform))]
pub fn derive_wireform_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new(
            name.span(),
            "WireformObject does not support generic types",
        )
        .to_compile_error()
        .into();
    }

    let type_name = match parse_rename(&input.attrs) {
        Ok(rename) => rename.unwrap_or_else(|| name.to_string()),
        Err(e) => return e.to_compile_error().into(),
    };

    let expanded = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => generate_struct(&name, &type_name, &fields),
            _ => {
                return syn::Error::new(
                    name.span(),
                    "WireformObject only supports structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        Data::Enum(data) => generate_enum(&name, &type_name, &data),
        Data::Union(_) => {
            return syn::Error::new(name.span(), "WireformObject does not support unions")
                .to_compile_error()
                .into();
        }
    };

    match expanded {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Parsing Logic (Syn 2.0) ---

/// Parses `#[wireform(rename = "…")]` attributes.
fn parse_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs {
        if attr.path().is_ident("wireform") {
            attr.parse_nested_meta(|meta| {
                // Case: #[wireform(rename = "Name")]
                if meta.path.is_ident("rename") {
                    let value = meta.value()?; // Expects ' = '
                    let s: LitStr = value.parse()?; // Expects string literal
                    rename = Some(s.value());
                    return Ok(());
                }

                // Error on unknown keys
                Err(meta.error("Unknown wireform attribute key"))
            })?;
        }
    }
    Ok(rename)
}

// --- Generator: struct ---

fn generate_struct(
    name: &syn::Ident,
    type_name: &str,
    fields: &syn::FieldsNamed,
) -> syn::Result<proc_macro2::TokenStream> {
    struct FieldInfo {
        ident: syn::Ident,
        ty: syn::Type,
        wire_name: String,
    }

    let mut infos = Vec::new();
    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let wire_name = parse_rename(&field.attrs)?.unwrap_or_else(|| ident.to_string());
        infos.push(FieldInfo {
            ident,
            ty: field.ty.clone(),
            wire_name,
        });
    }

    let descriptor_fields = infos.iter().map(|f| {
        let fname = &f.wire_name;
        let fty = &f.ty;
        quote! {
            ::wireform::FieldDescriptor::new(
                #fname,
                <#fty as ::wireform::Reflect>::type_key(),
            )
        }
    });

    let register_deps = infos.iter().map(|f| {
        let fty = &f.ty;
        quote! {
            <#fty as ::wireform::Reflect>::register(engine);
        }
    });

    let to_value_fields = infos.iter().map(|f| {
        let fident = &f.ident;
        let fname = &f.wire_name;
        quote! {
            (
                #fname.to_string(),
                ::wireform::Reflect::to_value(&self.#fident),
            )
        }
    });

    let from_value_fields = infos.iter().map(|f| {
        let fident = &f.ident;
        let fname = &f.wire_name;
        let fty = &f.ty;
        quote! {
            #fident: <#fty as ::wireform::Reflect>::from_value(
                ::wireform::reflect::take_field(&mut fields, #fname),
            )?
        }
    });

    Ok(quote! {
        impl ::wireform::Reflect for #name {
            fn type_key() -> ::wireform::TypeKey {
                ::wireform::TypeKey::named(#type_name)
            }

            fn register(engine: &::wireform::Wireform) {
                // Insert before recursing so cyclic types terminate.
                if engine.has_descriptor(#type_name) {
                    return;
                }
                engine.register_descriptor(::wireform::TypeDescriptor::object(
                    #type_name,
                    vec![#(#descriptor_fields),*],
                ));
                #(#register_deps)*
            }

            fn to_value(&self) -> ::wireform::Value {
                ::wireform::Value::object(
                    #type_name,
                    vec![#(#to_value_fields),*],
                )
            }

            fn from_value(value: ::wireform::Value) -> ::wireform::Result<Self> {
                match value {
                    ::wireform::Value::Object { mut fields, .. } => Ok(Self {
                        #(#from_value_fields),*
                    }),
                    other => Err(::wireform::reflect::conversion_error(
                        #type_name,
                        &other,
                    )),
                }
            }
        }
    })
}

// --- Generator: enum ---

fn generate_enum(
    name: &syn::Ident,
    type_name: &str,
    data: &syn::DataEnum,
) -> syn::Result<proc_macro2::TokenStream> {
    let mut idents = Vec::new();
    let mut constants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "WireformObject enums must have unit variants only",
            ));
        }
        let constant =
            parse_rename(&variant.attrs)?.unwrap_or_else(|| variant.ident.to_string());
        idents.push(variant.ident.clone());
        constants.push(constant);
    }

    let to_value_arms = idents.iter().zip(&constants).map(|(ident, constant)| {
        quote! {
            Self::#ident => ::wireform::Value::enumeration(#type_name, #constant),
        }
    });

    let from_value_arms = idents.iter().zip(&constants).map(|(ident, constant)| {
        quote! {
            #constant => Ok(Self::#ident),
        }
    });

    Ok(quote! {
        impl ::wireform::Reflect for #name {
            fn type_key() -> ::wireform::TypeKey {
                ::wireform::TypeKey::named(#type_name)
            }

            fn register(engine: &::wireform::Wireform) {
                if engine.has_descriptor(#type_name) {
                    return;
                }
                engine.register_descriptor(::wireform::TypeDescriptor::enumeration(
                    #type_name,
                    vec![#(#constants),*],
                ));
            }

            fn to_value(&self) -> ::wireform::Value {
                match self {
                    #(#to_value_arms)*
                }
            }

            fn from_value(value: ::wireform::Value) -> ::wireform::Result<Self> {
                match value {
                    ::wireform::Value::Enum(_, constant) => match constant.as_str() {
                        #(#from_value_arms)*
                        other => Err(::wireform::WireformError::UnknownEnumConstant(
                            format!("'{other}' is not a constant of enum {}", #type_name),
                        )),
                    },
                    other => Err(::wireform::reflect::conversion_error(
                        #type_name,
                        &other,
                    )),
                }
            }
        }
    })
}
