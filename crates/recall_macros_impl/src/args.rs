// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro2::{Ident, TokenStream};
use syn::{Path, parse_quote};

use crate::TransformError;

/// Arguments accepted by `#[cached(...)]`.
#[derive(Debug, Default, FromMeta)]
pub struct CacheArgs {
    /// Name reported by the holder's telemetry.
    /// Default `None` means the function name.
    pub name: Option<String>,
    /// Holder type constructor, instantiated as `holder<K, V>` and created with `Default`.
    /// Default `None` means `<crate_path>::MemoCache`.
    pub holder: Option<Path>,
    /// Field of `self` holding a per-instance cache.
    /// Default `None` means a `static` holder shared by every call.
    pub instance: Option<Path>,
    /// Path to the runtime crate (for situations where it is re-exported or renamed).
    /// Default `None` means `::recall`.
    /// Example: `::reexporting_crate::recall`
    pub crate_path: Option<Path>,
}

impl CacheArgs {
    /// Parses the tokens inside `#[cached(...)]`.
    pub fn parse(attr: TokenStream) -> darling::Result<Self> {
        let list = NestedMeta::parse_meta_list(attr)?;
        let args = Self::from_list(&list)?;

        if let (Some(holder), Some(_)) = (&args.holder, &args.instance) {
            return Err(
                darling::Error::custom(TransformError::InvalidArguments("`holder` and `instance` cannot be combined"))
                    .with_span(holder),
            );
        }

        if let Some(instance) = &args.instance
            && instance.get_ident().is_none()
        {
            return Err(
                darling::Error::custom(TransformError::InvalidArguments("`instance` must name a single field of `self`"))
                    .with_span(instance),
            );
        }

        Ok(args)
    }

    /// The runtime crate path, defaulting to `::recall`.
    #[must_use]
    pub fn crate_path(&self) -> Path {
        self.crate_path.clone().unwrap_or_else(|| parse_quote!(::recall))
    }

    /// The per-instance holder field, if any.
    #[must_use]
    pub fn instance_field(&self) -> Option<&Ident> {
        self.instance.as_ref().and_then(Path::get_ident)
    }
}

/// Arguments accepted by `#[cache_scope(...)]`.
#[derive(Debug, Default, FromMeta)]
pub struct ScopeArgs {
    /// Path to the runtime crate, used by every `#[cached]` function in the scope that does not
    /// set its own.
    /// Default `None` means `::recall`.
    pub crate_path: Option<Path>,
}

impl ScopeArgs {
    /// Parses the tokens inside `#[cache_scope(...)]`.
    pub fn parse(attr: TokenStream) -> darling::Result<Self> {
        let list = NestedMeta::parse_meta_list(attr)?;
        Self::from_list(&list)
    }
}
