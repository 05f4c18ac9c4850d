#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the wingman workspace. Currently this is the
//! [`macro@mora_error`] attribute that every crate uses to declare its error enum.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to any `Result` whose error converts into this enum.
/// * **Standard Conversions**: Implements `From<T>` for variants made of exactly a `source`
///   field and a `context` field. Variants that carry additional data (the name of a failed
///   call, a secret name, ...) must be constructed explicitly.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal` variant
///   is present.
/// * **Introspection**: `variant_name()` returns the variant identifier, handy as a structured
///   logging field.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants with a source must also carry the context field.
///
/// # Example
///
/// ```rust,ignore
/// use mora_derive::mora_error;
/// use std::borrow::Cow;
///
/// #[mora_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("state.bin").context("Reading state snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn mora_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
