#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the service crates.
//! They remove the boilerplate around error enums, feature slices and
//! API data models so every slice looks the same.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! evreg-derive.workspace = true
//! thiserror.workspace = true   # required by `evreg_error`
//! ```
//!
//! Examples below are `ignore`d because proc-macro crates cannot use their own macros.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro to define a standard API data model.
///
/// # Injected Behaviors
///
/// * **Derives**: Adds `Debug`, `Serialize`, and `Deserialize` if missing.
/// * **`OpenAPI`**: Adds `utoipa::ToSchema` when the consuming crate enables `server`.
/// * **Serde Policy**:
///     * `rename_all = "camelCase"` by default (can be overridden).
///     * `deny_unknown_fields` by default (can be disabled).
///
/// # Example
///
/// ```rust,ignore
/// use evreg_derive::api_model;
///
/// #[api_model(deny_unknown_fields = false)]
/// pub struct SeatsUpdate {
///     pub total_seats: serde_json::Value,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Attribute macro to bridge Axum handlers with `OpenAPI` documentation.
///
/// Accepts standard `utoipa::path` arguments such as `get`, `post`, `path = "..."`,
/// `responses(...)`, and `tag = "..."`. The `utoipa::path` attribute is only emitted
/// when the consuming crate enables its `server` feature.
///
/// # Example
///
/// ```rust,ignore
/// use evreg_derive::api_handler;
///
/// #[api_handler(
///     get,
///     path = "/health",
///     responses((status = OK, body = HealthResponse)),
///     tag = "System"
/// )]
/// pub async fn health_handler() -> impl IntoResponse {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Attribute macro for defining domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source` field,
///   enabling the use of the `?` operator for upstream errors.
/// * **Internal Fallback**: Provides `From<&str>` and `From<String>` if an `Internal`
///   variant is present.
/// * **Error Codes**: Generates `code(&self) -> &'static str`, the variant name in
///   `SCREAMING_SNAKE_CASE` (`CapacityExceeded` becomes `CAPACITY_EXCEEDED`).
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Context fields must be `context: Option<Cow<'static, str>>`.
/// 3. Variants with a `source` field must also have a context field.
///
/// # Example
///
/// ```rust,ignore
/// use evreg_derive::evreg_error;
/// use std::borrow::Cow;
///
/// #[evreg_error]
/// pub enum DatabaseError {
///     #[error("SurrealDB error{}: {source}", format_context(.context))]
///     Surreal { source: surrealdb::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn count(db: &Surreal<Any>) -> Result<(), DatabaseError> {
///     db.query("RETURN count(SELECT id FROM registration)").await.context("Counting")?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn evreg_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Attribute macro to define a feature slice handle.
///
/// 1. Renames the annotated struct to `<Name>Inner`.
/// 2. Generates a thread-safe `Arc` wrapper named `<Name>` with `Deref` to the inner state.
/// 3. Implements `FeatureSlice` so the kernel can register and look the slice up.
///
/// # Example
/// ```rust,ignore
/// #[evreg_derive::evreg_slice]
/// pub struct Registrations {
///     pub service: RegistrationService,
/// }
///
/// let slice = Registrations::new(RegistrationsInner { service });
/// ```
#[proc_macro_attribute]
pub fn evreg_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
