//! Procedural macros for flow-dispatch

use std::collections::BTreeMap;

use darling::util::SpannedValue;
use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use proc_macro2::Span;
use syn::{parse_macro_input, DeriveInput, Ident};

/// Enum-level options for `#[derive(Action)]`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionInput {
    ident: Ident,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Group variants into categories by their name prefix
    #[darling(default)]
    infer_categories: bool,
}

/// Variant-level options
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit category, wins over inference
    #[darling(default)]
    category: Option<SpannedValue<String>>,

    /// Keep this variant uncategorized
    #[darling(default)]
    skip_category: bool,
}

// Words that end the subject part of a variant name. `CountIncrement` is the
// `Increment` verb applied to the `count` subject.
const VERBS: &[&str] = &[
    "Start", "Stop", "End", "Open", "Close", "Submit", "Confirm", "Cancel", "Next", "Prev", "Up",
    "Down", "Enter", "Exit", "Add", "Remove", "Clear", "Update", "Set", "Get", "Load", "Save",
    "Delete", "Create", "Increment", "Decrement", "Reset", "Show", "Hide", "Enable", "Disable",
    "Toggle", "Select", "Move", "Cycle", "Scroll", "Schedule", "Fire", "Retry",
];

/// Split `ConnectionFormSubmit` into `["Connection", "Form", "Submit"]`
fn words(name: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, ch) in name.char_indices().skip(1) {
        if ch.is_uppercase() {
            out.push(&name[start..i]);
            start = i;
        }
    }
    if start < name.len() {
        out.push(&name[start..]);
    }
    out
}

fn snake_case(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}

/// Category for a variant name, derived from the words before its verb.
///
/// `Did*` variants are results of deferred work and share `async_result`.
/// Names starting with a verb, or with no verb at all, stay uncategorized.
fn infer_category(name: &str) -> Option<String> {
    let words = words(name);
    match words.first() {
        Some(&"Did") => return Some("async_result".to_string()),
        Some(first) if VERBS.contains(first) => return None,
        None => return None,
        _ => {}
    }

    let verb_at = words.iter().skip(1).position(|w| VERBS.contains(w))? + 1;
    Some(snake_case(&words[..verb_at]))
}

/// Check that `label` can name a category method and enum variant.
fn validate_category(label: &str) -> Result<(), String> {
    let well_formed = label.starts_with(|c: char| c.is_ascii_lowercase())
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !label.ends_with('_')
        && !label.contains("__");
    if !well_formed {
        return Err(format!(
            "category `{}` must be snake_case: lowercase ASCII letters, digits and single underscores",
            label
        ));
    }
    match label {
        "uncategorized" => Err("category `uncategorized` is reserved".to_string()),
        "self" => Err("category `self` cannot name an enum variant".to_string()),
        _ => Ok(()),
    }
}

/// Derive macro for the Action trait
///
/// Generates `Action::name()`, returning the variant name.
///
/// With `#[action(infer_categories)]` it also generates:
/// - a `{Name}Category` enum with one variant per discovered category plus
///   `Uncategorized`
/// - inherent `category()`, `category_enum()` and `is_{category}()` methods
/// - an `ActionCategory` impl
///
/// Variants can opt out with `#[action(skip_category)]` or pick a category
/// with `#[action(category = "name")]`.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(infer_categories)]
/// enum CounterAction {
///     Init,
///     CountIncrement,
///     CountReset,
///     DidTick,
///     #[action(category = "count")]
///     Bump,
/// }
///
/// assert_eq!(CounterAction::CountReset.name(), "CountReset");
/// assert_eq!(CounterAction::Bump.category(), Some("count"));
/// assert!(CounterAction::DidTick.is_async_result());
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionInput::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        darling::ast::Data::Struct(_) => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let mut expanded = expand_name(&opts.ident, variants);
    if opts.infer_categories {
        match expand_categories(&opts.ident, variants) {
            Ok(categories) => expanded.extend(categories),
            Err(e) => return e.to_compile_error().into(),
        }
    }
    expanded.into()
}

fn expand_name(name: &Ident, variants: &[ActionVariant]) -> TokenStream2 {
    let arms = variants.iter().map(|v| {
        let ident = &v.ident;
        let label = ident.to_string();
        let pattern = match v.fields.style {
            darling::ast::Style::Unit => quote! { #name::#ident },
            darling::ast::Style::Tuple => quote! { #name::#ident(..) },
            darling::ast::Style::Struct => quote! { #name::#ident { .. } },
        };
        quote! { #pattern => #label }
    });

    quote! {
        impl ::flow_dispatch::Action for #name {
            fn name(&self) -> &'static str {
                match self {
                    #(#arms,)*
                }
            }
        }
    }
}

fn expand_categories(name: &Ident, variants: &[ActionVariant]) -> syn::Result<TokenStream2> {
    let mut errors: Option<syn::Error> = None;
    let mut assigned: Vec<(&Ident, Option<String>)> = Vec::with_capacity(variants.len());
    for v in variants {
        let category: Option<(String, Span)> = if v.skip_category {
            None
        } else if let Some(explicit) = &v.category {
            Some((explicit.as_str().to_owned(), explicit.span()))
        } else {
            infer_category(&v.ident.to_string()).map(|label| (label, v.ident.span()))
        };

        if let Some((label, span)) = &category {
            if let Err(message) = validate_category(label) {
                let error = syn::Error::new(*span, message);
                match &mut errors {
                    Some(errors) => errors.combine(error),
                    None => errors = Some(error),
                }
            }
        }
        assigned.push((&v.ident, category.map(|(label, _)| label)));
    }
    if let Some(errors) = errors {
        return Err(errors);
    }

    // BTreeMap keeps the generated enum in a stable order
    let mut members: BTreeMap<String, Vec<&Ident>> = BTreeMap::new();
    for (ident, category) in &assigned {
        if let Some(category) = category {
            members.entry(category.clone()).or_default().push(*ident);
        }
    }

    let category_enum = format_ident!("{}Category", name);
    let labels: Vec<&String> = members.keys().collect();
    let enum_variants: Vec<Ident> = labels
        .iter()
        .map(|label| format_ident!("{}", pascal_case(label)))
        .collect();

    let category_arms = assigned.iter().map(|(ident, category)| match category {
        Some(label) => quote! { #name::#ident { .. } => ::core::option::Option::Some(#label) },
        None => quote! { #name::#ident { .. } => ::core::option::Option::None },
    });

    let enum_arms = assigned.iter().map(|(ident, category)| {
        let variant = match category {
            Some(label) => format_ident!("{}", pascal_case(label)),
            None => format_ident!("Uncategorized"),
        };
        quote! { #name::#ident { .. } => #category_enum::#variant }
    });

    let predicates = members.iter().map(|(label, idents)| {
        let method = format_ident!("is_{}", label);
        let doc = format!("Returns true if this action belongs to the `{}` category.", label);
        quote! {
            #[doc = #doc]
            pub fn #method(&self) -> bool {
                matches!(self, #(#name::#idents { .. })|*)
            }
        }
    });

    let enum_doc = format!("Action categories of [`{}`].", name);

    Ok(quote! {
        #[doc = #enum_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum #category_enum {
            #(#enum_variants,)*
            /// Actions without a category
            Uncategorized,
        }

        impl #category_enum {
            /// Every category, `Uncategorized` last
            pub fn all() -> &'static [Self] {
                &[#(Self::#enum_variants,)* Self::Uncategorized]
            }

            /// Category name as used by `category()`
            pub fn name(&self) -> &'static str {
                match self {
                    #(Self::#enum_variants => #labels,)*
                    Self::Uncategorized => "uncategorized",
                }
            }
        }

        impl #name {
            /// The action's category, if it has one
            pub fn category(&self) -> ::core::option::Option<&'static str> {
                match self {
                    #(#category_arms,)*
                }
            }

            /// The action's category as an enum value
            pub fn category_enum(&self) -> #category_enum {
                match self {
                    #(#enum_arms,)*
                }
            }

            #(#predicates)*
        }

        impl ::flow_dispatch::ActionCategory for #name {
            type Category = #category_enum;

            fn category(&self) -> ::core::option::Option<&'static str> {
                #name::category(self)
            }

            fn category_enum(&self) -> Self::Category {
                #name::category_enum(self)
            }
        }
    })
}
