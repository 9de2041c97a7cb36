//! Derive macros for composable interactions
//!
//! This crate provides procedural macros to reduce boilerplate when declaring
//! interaction attributes.
//!
//! # Available Macros
//!
//! - `#[derive(Attributes)]` - Implements the attribute store contract over a struct's fields
//!
//! # Example
//!
//! ```ignore
//! use composable_interactions_macros::Attributes;
//! use composable_interactions_runtime::Many;
//!
//! #[derive(Attributes, Default)]
//! struct PlaceOrder {
//!     customer_id: Option<i64>,
//!     #[attributes(rename = "note")]
//!     comment: Option<String>,
//!     #[nested]
//!     items: Many<AddLineItem>,
//!     #[attributes(skip)]
//!     repository: Option<Arc<dyn OrderRepository>>,
//! }
//!
//! // Generated:
//! assert_eq!(PlaceOrder::attribute_names(), &["customer_id", "note"]);
//! assert_eq!(PlaceOrder::relation_names(), &["items"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr};

/// How a struct field takes part in the attribute store
enum FieldRole {
    Attribute { key: String },
    Relation { key: String },
    Skipped,
}

/// Derive macro for the `Attributes` trait
///
/// Every named field becomes a scalar attribute keyed by its name, read and
/// written through `serde_json` (so its type must implement `Serialize` and
/// `DeserializeOwned`).
///
/// # Attributes
///
/// - `#[nested]` - The field is a relation slot (`One<C>` / `Many<C>`)
/// - `#[attributes(skip)]` - The field is internal state, not an attribute
/// - `#[attributes(rename = "key")]` - Expose the field under another key
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to anything other than a struct with named fields
/// - A field is both `#[nested]` and `#[attributes(skip)]`
/// - An `#[attributes(...)]` option is not recognised
///
/// # Example
///
/// ```ignore
/// #[derive(Attributes, Default)]
/// struct AddLineItem {
///     sku: Option<String>,
///     quantity: Option<i64>,
/// }
///
/// let mut item = AddLineItem::default();
/// item.set_attribute("quantity", json!(3))?;
/// assert_eq!(item.get_attribute("quantity")?, json!(3));
/// ```
#[proc_macro_derive(Attributes, attributes(attributes, nested))]
pub fn derive_attributes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_attributes(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_attributes(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Attributes)] can only be used on structs",
        ));
    };
    let Fields::Named(fields) = &data_struct.fields else {
        return Err(syn::Error::new_spanned(
            &data_struct.fields,
            "#[derive(Attributes)] requires named fields",
        ));
    };

    let mut attributes: Vec<(&Ident, String)> = Vec::new();
    let mut relations: Vec<(&Ident, String)> = Vec::new();

    for field in &fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        match field_role(ident, &field.attrs)? {
            FieldRole::Attribute { key } => attributes.push((ident, key)),
            FieldRole::Relation { key } => relations.push((ident, key)),
            FieldRole::Skipped => {},
        }
    }

    let attribute_keys = attributes.iter().map(|(_, key)| key);
    let relation_keys = relations.iter().map(|(_, key)| key);

    let get_arms = attributes.iter().map(|(ident, key)| {
        quote! {
            #key => ::composable_interactions_core::attributes::to_value(name, &self.#ident),
        }
    });
    let set_arms = attributes.iter().map(|(ident, key)| {
        quote! {
            #key => {
                self.#ident = ::composable_interactions_core::attributes::from_value(name, value)?;
                Ok(())
            }
        }
    });
    let relation_arms = relations.iter().map(|(_, key)| {
        quote! {
            #key => Err(::composable_interactions_core::attributes::AttributeError::Relation(
                name.to_string(),
            )),
        }
    });
    let relation_arms_mut = relation_arms.clone();

    let relation_refs = relations.iter().map(|(ident, key)| {
        quote! {
            (#key, &self.#ident as &dyn ::composable_interactions_core::nested::NestedRelation)
        }
    });
    let relation_muts = relations.iter().map(|(ident, key)| {
        quote! {
            (#key, &mut self.#ident as &mut dyn ::composable_interactions_core::nested::NestedRelation)
        }
    });

    Ok(quote! {
        impl #impl_generics ::composable_interactions_core::attributes::Attributes
            for #name #ty_generics #where_clause
        {
            fn attribute_names() -> &'static [&'static str] {
                &[#(#attribute_keys),*]
            }

            fn get_attribute(
                &self,
                name: &str,
            ) -> ::core::result::Result<
                ::composable_interactions_core::Value,
                ::composable_interactions_core::attributes::AttributeError,
            > {
                match name {
                    #(#get_arms)*
                    #(#relation_arms)*
                    _ => Err(::composable_interactions_core::attributes::AttributeError::Unknown(
                        name.to_string(),
                    )),
                }
            }

            #[allow(unused_variables)]
            fn set_attribute(
                &mut self,
                name: &str,
                value: ::composable_interactions_core::Value,
            ) -> ::core::result::Result<(), ::composable_interactions_core::attributes::AttributeError> {
                match name {
                    #(#set_arms)*
                    #(#relation_arms_mut)*
                    _ => Err(::composable_interactions_core::attributes::AttributeError::Unknown(
                        name.to_string(),
                    )),
                }
            }

            fn relation_names() -> &'static [&'static str] {
                &[#(#relation_keys),*]
            }

            fn relations(
                &self,
            ) -> ::std::vec::Vec<(&'static str, &dyn ::composable_interactions_core::nested::NestedRelation)> {
                ::std::vec![#(#relation_refs),*]
            }

            fn relations_mut(
                &mut self,
            ) -> ::std::vec::Vec<(&'static str, &mut dyn ::composable_interactions_core::nested::NestedRelation)> {
                ::std::vec![#(#relation_muts),*]
            }
        }
    })
}

fn field_role(ident: &Ident, attrs: &[Attribute]) -> syn::Result<FieldRole> {
    let mut key = ident.to_string();
    let mut skip = false;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("attributes")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let renamed: LitStr = meta.value()?.parse()?;
                key = renamed.value();
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `rename = \"...\"`"))
            }
        })?;
    }

    let nested = attrs.iter().find(|attr| attr.path().is_ident("nested"));

    match (nested, skip) {
        (Some(attr), true) => Err(syn::Error::new_spanned(
            attr,
            "a field cannot be both #[nested] and #[attributes(skip)]",
        )),
        (Some(_), false) => Ok(FieldRole::Relation { key }),
        (None, true) => Ok(FieldRole::Skipped),
        (None, false) => Ok(FieldRole::Attribute { key }),
    }
}
