//! Procedural macros for orichalcum

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Case convention applied to every variant name without an explicit `name`
    #[darling(default)]
    rename_all: Option<String>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit tag override
    #[darling(default)]
    name: Option<String>,
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

fn apply_case(rule: &str, variant: &str) -> Option<String> {
    match rule {
        "PascalCase" => Some(variant.to_string()),
        "snake_case" => Some(to_snake_case(variant)),
        "SCREAMING_SNAKE_CASE" => Some(to_snake_case(variant).to_uppercase()),
        "kebab-case" => Some(to_snake_case(variant).replace('_', "-")),
        _ => None,
    }
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method returning the action's tag: the variant name,
/// the container's `rename_all` convention applied to it, or a per-variant
/// `#[action(name = "...")]` override.
///
/// Supported `rename_all` values: `PascalCase`, `snake_case`,
/// `SCREAMING_SNAKE_CASE`, `kebab-case`.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(rename_all = "SCREAMING_SNAKE_CASE")]
/// enum TodoAction {
///     AddTodo { message: String },
///     #[action(name = "DROP")]
///     RemoveTodo(u64),
/// }
///
/// assert_eq!(TodoAction::AddTodo { message: "x".into() }.name(), "ADD_TODO");
/// assert_eq!(TodoAction::RemoveTodo(1).name(), "DROP");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let mut name_arms = Vec::with_capacity(variants.len());
    for v in variants.iter() {
        let variant_name = &v.ident;
        let tag = match (&v.name, &opts.rename_all) {
            (Some(explicit), _) => explicit.clone(),
            (None, Some(rule)) => match apply_case(rule, &variant_name.to_string()) {
                Some(tag) => tag,
                None => {
                    return syn::Error::new_spanned(
                        &input.ident,
                        format!("unsupported rename_all convention `{rule}`"),
                    )
                    .to_compile_error()
                    .into();
                }
            },
            (None, None) => variant_name.to_string(),
        };

        name_arms.push(match &v.fields.style {
            darling::ast::Style::Unit => quote! {
                #name::#variant_name => #tag
            },
            darling::ast::Style::Tuple => quote! {
                #name::#variant_name(..) => #tag
            },
            darling::ast::Style::Struct => quote! {
                #name::#variant_name { .. } => #tag
            },
        });
    }

    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();
    let expanded = quote! {
        impl #impl_generics orichalcum::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
