//! Procedural macros for Sleepy
//!
//! - `#[derive(Model)]` implements `sleepy::Reflect` so a struct can be used
//!   with `reads::<T>()` and `returns::<T>()`
//! - `#[sleepy::main]` is the async entry point

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemFn};

mod model;

/// Main entry point macro for Sleepy applications
///
/// This macro wraps your async main function with the tokio runtime.
///
/// # Example
///
/// ```rust,ignore
/// use sleepy::prelude::*;
///
/// #[sleepy::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let mut api = Api::new();
///     api.register(users())?;
///     api.serve("127.0.0.1:3000").await?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let expanded = quote::quote! {
        #(#attrs)*
        #[::tokio::main]
        #vis #sig {
            #block
        }
    };

    TokenStream::from(expanded)
}

/// Derive `sleepy::Reflect` for a struct with named fields
///
/// Field obligations are declared with `#[sleepy(...)]` using the tokens
/// `required`, `readonly`, `writeonly` and `hidden`. Fields whose type is
/// itself a `Model` are walked recursively, so nested obligations are found
/// too. Fields are reported under their wire name, following
/// `#[serde(rename = "...")]` and a container `#[serde(rename_all = "...")]`.
///
/// The struct must carry `#[serde(default)]`: absent fields then decode to
/// their zero value and `required` decides whether that is an error.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default, Serialize, Deserialize, Model)]
/// #[serde(default)]
/// struct User {
///     #[sleepy(readonly)]
///     id: String,
///     #[sleepy(required)]
///     first_name: String,
///     #[sleepy(required, writeonly)]
///     password: String,
///     address: Address,
/// }
/// ```
#[proc_macro_derive(Model, attributes(sleepy))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
