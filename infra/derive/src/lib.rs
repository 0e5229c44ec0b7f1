#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros shared by every Strongbox crate.
//!
//! * [`macro@sbox_error`] turns a plain enum into a `thiserror` error with context support.
//! * [`macro@sbox_service`] turns a struct into a cheaply clonable `Arc` handle.
//!
//! Doc examples are `ignore`d because a proc-macro crate cannot use its own output;
//! the `tests/ui` cases compile them for real.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemStruct, parse_macro_input};

/// Defines a crate error enum with context support.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already present.
/// * `<ErrorName>Ext` trait adding `.context(...)` to `Result<T, ErrorName>` and to
///   `Result<T, SourceError>` for every variant with a source field.
/// * `From<SourceError>` for variants carrying a `source` field (or `#[source]`/`#[from]`).
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * A private `format_context` helper used by the `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. Only enums with named-field variants are accepted.
/// 2. A `context` field must be typed `Option<Cow<'static, str>>`.
/// 3. Variants with a source must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[sbox_derive::sbox_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("vault.json").context("Reading vault snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn sbox_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Turns a struct into a shared service handle.
///
/// The annotated fields move into a generated `<Name>Inner` struct; `<Name>` becomes a
/// thin `Arc<<Name>Inner>` wrapper with `new`, `Clone`, `Debug` and `Deref` to the inner state.
/// Every field must be `Debug + Clone`.
///
/// # Example
/// ```rust,ignore
/// #[sbox_derive::sbox_service]
/// pub struct FolderService {
///     state: DomainStateService<Folders>,
///     api: Arc<dyn FolderApi>,
/// }
///
/// let service = FolderService::new(FolderServiceInner { state, api });
/// ```
#[proc_macro_attribute]
pub fn sbox_service(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::service::expand_service(input).into()
}
