//! Derive macros for the merchant console
//!
//! This crate provides procedural macros that remove the boilerplate around
//! reducer actions and state.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates helpers for action enums (commands/events)
//! - `#[derive(State)]` - Generates common state traits and helpers
//!
//! # Example
//!
//! ```ignore
//! use merchant_console_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum ProductAction {
//!     #[command]
//!     DeleteProduct { id: String },
//!
//!     #[event]
//!     ProductDeleted { id: String },
//! }
//!
//! // Generated methods:
//! assert!(ProductAction::DeleteProduct { id: "p-1".into() }.is_command());
//! assert!(ProductAction::ProductDeleted { id: "p-1".into() }.is_event());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Data, Fields, Attribute};

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant is a command
/// - `is_event()` - Returns true if this variant is an event
/// - `event_type()` - Returns the event type name for serialization
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[event]` - Mark a variant as an event
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]` attributes
///
/// # Example
///
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum OrderAction {
///     #[command]
///     AdvanceOrder { order_id: String },
///
///     #[event]
///     OrderAdvanced { order_id: String, timestamp: DateTime<Utc> },
/// }
///
/// let action = OrderAction::AdvanceOrder {
///     order_id: "O1".into(),
/// };
///
/// assert!(action.is_command());
/// assert!(!action.is_event());
/// assert_eq!(action.event_type(), "unknown");
/// ```
#[proc_macro_derive(Action, attributes(command, event))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut is_command_arms = Vec::new();
    let mut is_event_arms = Vec::new();
    let mut event_type_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        if is_command && is_event {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[event]",
            )
            .to_compile_error()
            .into();
        }

        let pattern = variant_pattern(&variant.ident, &variant.fields);

        if is_command {
            is_command_arms.push(quote! { #pattern => true, });
        }

        if is_event {
            let type_name = format!("{}.v1", variant.ident);
            is_event_arms.push(quote! { #pattern => true, });
            event_type_arms.push(quote! { #pattern => #type_name, });
        }
    }

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns the versioned event type name used in logs and serialized records
            ///
            /// Only events have type names. Everything else returns "unknown".
            #[must_use]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Derive macro for State structs
///
/// Generates version accessors for state structs whose revision field is
/// marked with `#[version]`. Structs without such a field get nothing.
///
/// # Attributes
///
/// - `#[version]` - Mark a field as the version tracker
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-struct type
///
/// # Example
///
/// ```ignore
/// use merchant_console_macros::State;
/// use merchant_console_core::version::Version;
///
/// #[derive(State, Clone, Debug)]
/// struct OrderBook {
///     pub orders: Vec<Order>,
///     #[version]
///     pub revision: Option<Version>,
/// }
/// ```
#[proc_macro_derive(State, attributes(version))]
pub fn derive_state(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(State)] can only be used on structs")
            .to_compile_error()
            .into();
    };

    let version_field = data_struct
        .fields
        .iter()
        .find(|field| has_attribute(&field.attrs, "version"));

    let Some(field) = version_field else {
        return TokenStream::new();
    };

    let Some(field_name) = field.ident.as_ref() else {
        return syn::Error::new_spanned(field, "#[version] requires a named field")
            .to_compile_error()
            .into();
    };

    let expanded = quote! {
        impl #name {
            /// Get the current version of this state
            #[must_use]
            pub const fn version(&self) -> Option<merchant_console_core::version::Version> {
                self.#field_name
            }

            /// Set the version of this state
            pub fn set_version(&mut self, version: merchant_console_core::version::Version) {
                self.#field_name = Some(version);
            }
        }
    };

    TokenStream::from(expanded)
}

/// Match pattern for a variant that ignores its payload
fn variant_pattern(ident: &syn::Ident, fields: &Fields) -> proc_macro2::TokenStream {
    match fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident(name)
    })
}
