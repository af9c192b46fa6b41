// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use quote::ToTokens;
use thiserror::Error;

/// Reasons a `#[cached]` or `#[cache_scope]` rewrite cannot be performed.
///
/// `Ineligible` and `IneligibleScope` are reported as warnings next to the unchanged item.
/// Every other variant is a compile error for the annotated function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The annotated item is not a function with a body.
    #[error("annotated item must be a function with a body")]
    Ineligible,

    /// `#[cache_scope]` was applied to something other than an inline module or an `impl` block.
    #[error("`cache_scope` applies to an inline module or an `impl` block")]
    IneligibleScope,

    /// The key or value type cannot be determined as a concrete, owned, nameable type.
    #[error("cannot determine a concrete cache type: {0}")]
    UnresolvedType(&'static str),

    /// The method receiver does not match the requested holder.
    #[error("{0}")]
    Receiver(&'static str),

    /// The attribute arguments contradict each other.
    #[error("invalid `cached` arguments: {0}")]
    InvalidArguments(&'static str),
}

impl TransformError {
    /// Attaches the error to the span of `tokens`.
    #[must_use]
    pub fn at(self, tokens: impl ToTokens) -> syn::Error {
        syn::Error::new_spanned(tokens, self)
    }
}
