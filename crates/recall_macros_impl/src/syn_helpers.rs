// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helpers for consuming and producing Rust syntax elements.

use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{Attribute, Meta};

/// Combines a token stream with a syn-originating contextual error message that contains
/// all the necessary metadata to emit rich errors (with red underlines and all that).
///
/// Also preserves the original token stream, merely appending the error instead of replacing.
#[must_use]
#[expect(clippy::needless_pass_by_value, reason = "Convention for syn-based code")]
pub fn token_stream_and_error(s: TokenStream, e: syn::Error) -> TokenStream {
    let error = e.to_compile_error();

    // Keeping the original input avoids follow-up "cannot find function" errors at every
    // call site of the item we failed to rewrite.
    quote! {
        #s
        #error
    }
}

/// Combines a token stream with a warning that does not stop compilation.
///
/// Stable proc macros cannot emit warnings, so the message is carried by the use of a
/// deprecated constant spanned at `span`. The carrier is a free item: it cannot follow an
/// associated item in a trait or `impl` block.
#[must_use]
pub fn token_stream_and_warning(s: TokenStream, message: &str, span: Span) -> TokenStream {
    let warning = quote_spanned! {span=>
        const _: () = {
            #[deprecated(note = #message)]
            const RECALL_WARNING: () = ();
            RECALL_WARNING
        };
    };

    quote! {
        #s
        #warning
    }
}

/// Returns `true` for `#[cached]`, `#[cached(...)]` and path-qualified forms such as
/// `#[recall::cached]`.
#[must_use]
pub fn is_cached_attr(attr: &Attribute) -> bool {
    attr.path().segments.last().is_some_and(|segment| segment.ident == "cached")
}

/// Removes the first `cached` attribute from `attrs` and returns it.
pub fn take_cached_attr(attrs: &mut Vec<Attribute>) -> Option<Attribute> {
    let position = attrs.iter().position(is_cached_attr)?;
    Some(attrs.remove(position))
}

/// Extracts the argument tokens of an attribute: empty for `#[cached]`, the list contents for
/// `#[cached(...)]`.
pub fn attr_args(attr: &Attribute) -> syn::Result<TokenStream> {
    match &attr.meta {
        Meta::Path(_) => Ok(TokenStream::new()),
        Meta::List(list) => Ok(list.tokens.clone()),
        Meta::NameValue(name_value) => Err(syn::Error::new_spanned(
            name_value,
            "expected `#[cached]` or `#[cached(...)]`",
        )),
    }
}

/// Attempts to identify any compile-time error in the token stream. This is useful for unit
/// testing macros - if the macro is expected to produce a compile-time error, we can check
/// whether one exists.
#[cfg(test)]
#[must_use]
pub fn contains_compile_error(tokens: &TokenStream) -> bool {
    // String-based implementation, so vulnerable to false positives in very unlikely cases.
    tokens.to_string().contains(":: core :: compile_error ! {")
}

/// Attempts to identify a warning produced by [`token_stream_and_warning`].
#[cfg(test)]
#[must_use]
pub fn contains_warning(tokens: &TokenStream) -> bool {
    tokens.to_string().contains("# [deprecated (note =")
}
