//! `#[derive(Model)]` expansion

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr};

const TOKENS: [&str; 4] = ["required", "readonly", "writeonly", "hidden"];

/// One struct field as the generated code sees it
struct ModelField<'a> {
    field: &'a Field,
    wire_name: String,
    annotations: Vec<String>,
}

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Model can only be derived for structs with named fields",
                ))
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Model can only be derived for structs with named fields",
            ))
        }
    };

    let container = parse_container(&input.attrs)?;
    let fields = named
        .iter()
        .map(|field| parse_field(field, container.rename_all))
        .collect::<syn::Result<Vec<_>>>()?;

    if !container.default {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Model requires `#[serde(default)]` on the struct so absent fields decode to their zero value",
        ));
    }

    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let descriptors = fields.iter().map(|f| {
        let wire_name = &f.wire_name;
        let annotations = f.annotations.join(",");
        let ty = &f.field.ty;
        quote! {
            ::sleepy::FieldDescriptor::new(
                #wire_name,
                #annotations,
                <#ty as ::sleepy::Reflect>::descriptor(),
            )
        }
    });

    let idents: Vec<_> = fields.iter().map(|f| &f.field.ident).collect();
    let indices: Vec<usize> = (0..fields.len()).collect();

    Ok(quote! {
        impl #impl_generics ::sleepy::Reflect for #name #ty_generics #where_clause {
            fn descriptor() -> ::core::option::Option<::sleepy::Record> {
                ::core::option::Option::Some(::sleepy::Record::new(
                    #name_str,
                    ::std::vec![#(#descriptors),*],
                ))
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn ::sleepy::Reflect> {
                match index {
                    #(#indices => ::core::option::Option::Some(&self.#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn ::sleepy::Reflect> {
                match index {
                    #(#indices => ::core::option::Option::Some(&mut self.#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn is_zero(&self) -> bool {
                true #(&& ::sleepy::Reflect::is_zero(&self.#idents))*
            }

            fn reset(&mut self) {
                #(::sleepy::Reflect::reset(&mut self.#idents);)*
            }
        }
    })
}

/// Container-level serde options that affect the wire shape
#[derive(Default)]
struct Container {
    default: bool,
    rename_all: Option<RenameRule>,
}

#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    const NAMES: [(&'static str, RenameRule); 8] = [
        ("lowercase", RenameRule::Lower),
        ("UPPERCASE", RenameRule::Upper),
        ("PascalCase", RenameRule::Pascal),
        ("camelCase", RenameRule::Camel),
        ("snake_case", RenameRule::Snake),
        ("SCREAMING_SNAKE_CASE", RenameRule::ScreamingSnake),
        ("kebab-case", RenameRule::Kebab),
        ("SCREAMING-KEBAB-CASE", RenameRule::ScreamingKebab),
    ];

    fn parse(lit: &LitStr) -> syn::Result<Self> {
        let value = lit.value();
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, rule)| *rule)
            .ok_or_else(|| syn::Error::new_spanned(lit, format!("unknown rename rule `{}`", value)))
    }

    /// Apply to a snake_case field name, the way serde does
    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => {
                let mut pascal = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

fn parse_container(attrs: &[Attribute]) -> syn::Result<Container> {
    let mut container = Container::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                container.default = true;
                if meta.input.peek(syn::Token![=]) {
                    let _: syn::Expr = meta.value()?.parse()?;
                }
            } else if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                container.rename_all = Some(RenameRule::parse(&value)?);
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(container)
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream = content.parse()?;
    }
    Ok(())
}

fn parse_field(field: &Field, rename_all: Option<RenameRule>) -> syn::Result<ModelField<'_>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

    let mut annotations = Vec::new();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("sleepy")) {
        attr.parse_nested_meta(|meta| {
            let token = meta
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            if !TOKENS.contains(&token.as_str()) {
                return Err(meta.error(format!(
                    "unknown sleepy annotation, expected one of: {}",
                    TOKENS.join(", ")
                )));
            }
            if !annotations.contains(&token) {
                annotations.push(token);
            }
            Ok(())
        })?;
    }

    let wire_name = match serde_rename(&field.attrs)? {
        Some(renamed) => renamed,
        None => {
            let name = ident.to_string();
            let name = name.trim_start_matches("r#");
            rename_all.map_or_else(|| name.to_string(), |rule| rule.apply(name))
        }
    };

    Ok(ModelField {
        field,
        wire_name,
        annotations,
    })
}

/// The `rename` value of a field's `#[serde(...)]` attributes, if any
fn serde_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(rename)
}
