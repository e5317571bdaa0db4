//! `#[derive(Bind)]`, re-exported by `micro-bind`.

mod bind;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bind::expand(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}
