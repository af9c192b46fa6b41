// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Generation of the holder declaration and the memoizing function body.

use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{Block, Expr, ItemStatic, Path, Type, parse_quote};

use crate::signature::{FunctionSignature, Param, ungroup};

/// The type of a `static` holder.
#[derive(Debug, Clone)]
pub enum HolderKind {
    /// `<crate>::MemoCache<K, V>`, const-initialized.
    Memo,
    /// A user-supplied type constructor, initialized lazily through `Default`.
    Custom(Path),
}

/// Where the cached entries of one function live.
#[derive(Debug, Clone)]
pub enum HolderSite {
    /// A `static` declared next to (or inside) the function.
    Static {
        /// Fresh holder identifier.
        ident: Ident,
        /// Holder type.
        kind: HolderKind,
        /// Name reported by the holder's telemetry.
        cache_name: String,
    },
    /// A field of `self`.
    Instance {
        /// Field name.
        field: Ident,
    },
}

/// Output of the synthesis: the holder declaration, if any, and the replacement body.
#[derive(Debug, Clone)]
pub struct Synthesized {
    /// Declaration of the `static` holder. `None` for per-instance holders.
    pub holder: Option<ItemStatic>,
    /// The memoizing body that wraps the original one.
    pub body: Block,
}

/// Produces the holder declaration and the memoizing body for one function.
#[must_use]
pub fn synthesize(signature: &FunctionSignature, original: &Block, site: &HolderSite, crate_path: &Path) -> Synthesized {
    let key_ty = key_type(&signature.params);
    let holder = holder_decl(site, crate_path, &key_ty, &signature.output);
    let body = body(signature, original, &holder_ref(site), crate_path);

    Synthesized { holder, body }
}

/// Returns the owned type and the owning expression for one key component.
///
/// A reference parameter contributes its `ToOwned::Owned` form, anything else is cloned.
fn key_component(param: &Param) -> (Type, Expr) {
    let binding = &param.binding;

    match ungroup(&param.ty) {
        Type::Reference(reference) => {
            let elem = &reference.elem;
            (
                parse_quote!(<#elem as ::std::borrow::ToOwned>::Owned),
                parse_quote!(<#elem as ::std::borrow::ToOwned>::to_owned(&*#binding)),
            )
        }
        ty => (ty.clone(), parse_quote!(::core::clone::Clone::clone(&#binding))),
    }
}

/// The key type: a tuple of every owned component, `()` without parameters.
#[must_use]
pub fn key_type(params: &[Param]) -> Type {
    let components = params.iter().map(|param| key_component(param).0);
    parse_quote!((#(#components,)*))
}

/// The key expression, evaluated once per call.
#[must_use]
pub fn key_expr(params: &[Param]) -> Expr {
    let components = params.iter().map(|param| key_component(param).1);
    parse_quote!((#(#components,)*))
}

fn holder_decl(site: &HolderSite, crate_path: &Path, key: &Type, value: &Type) -> Option<ItemStatic> {
    let HolderSite::Static { ident, kind, cache_name } = site else {
        return None;
    };

    let declaration = match kind {
        HolderKind::Memo => parse_quote! {
            static #ident: #crate_path::MemoCache<#key, #value> = #crate_path::MemoCache::new(#cache_name);
        },
        HolderKind::Custom(holder) => parse_quote! {
            static #ident: ::std::sync::LazyLock<#holder<#key, #value>> =
                ::std::sync::LazyLock::new(<#holder<#key, #value> as ::core::default::Default>::default);
        },
    };

    Some(declaration)
}

/// The expression through which the body reaches its holder.
#[must_use]
pub fn holder_ref(site: &HolderSite) -> Expr {
    match site {
        HolderSite::Static {
            ident,
            kind: HolderKind::Memo,
            ..
        } => parse_quote!(&#ident),
        HolderSite::Static {
            ident,
            kind: HolderKind::Custom(_),
            ..
        } => parse_quote!(&*#ident),
        HolderSite::Instance { field } => parse_quote!(&self.#field),
    }
}

fn body(signature: &FunctionSignature, original: &Block, holder: &Expr, crate_path: &Path) -> Block {
    let key = Ident::new("key", Span::mixed_site());
    let result = Ident::new("result", Span::mixed_site());
    let cached = Ident::new("cached", Span::mixed_site());

    let key_expr = key_expr(&signature.params);
    let value = &signature.output;

    let destructure = signature.params.iter().filter_map(|param| {
        let pattern = param.pattern.as_ref()?;
        let binding = &param.binding;
        Some(quote!(let #pattern = #binding;))
    });
    let stmts = &original.stmts;

    parse_quote! {{
        let #key = #key_expr;
        if let ::core::option::Option::Some(#cached) = #crate_path::CacheHolder::get(#holder, &#key) {
            return #cached;
        }
        #[allow(clippy::redundant_closure_call, reason = "the original body runs only on a cache miss")]
        let #result: #value = (|| -> #value {
            #(#destructure)*
            #(#stmts)*
        })();
        #crate_path::CacheHolder::put(#holder, #key, ::core::clone::Clone::clone(&#result));
        #result
    }}
}
