// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The transform driver: eligibility, holder placement and assembly of the rewritten function.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::ext::IdentExt;
use syn::{Block, Item, ItemFn, ItemImpl, ItemStatic, Signature, Stmt, TraitItemFn, Type};

use crate::TransformError;
use crate::args::CacheArgs;
use crate::fresh::NameAllocator;
use crate::signature::{FunctionSignature, TypeRules};
use crate::syn_helpers::{token_stream_and_error, token_stream_and_warning};
use crate::synthesis::{HolderKind, HolderSite, synthesize};

/// The `impl` block a method is rewritten in, as seen by `#[cache_scope]`.
#[derive(Debug, Clone)]
pub struct ImplOwner {
    /// The implementing type, substituted for `Self` in static holder types.
    pub self_ty: Type,
    /// Whether the block declares generic parameters, which a `static` cannot name.
    pub generic: bool,
}

impl ImplOwner {
    /// Describes `item`.
    #[must_use]
    pub fn of(item: &ItemImpl) -> Self {
        Self {
            self_ty: (*item.self_ty).clone(),
            generic: !item.generics.params.is_empty(),
        }
    }
}

/// The rewritten pieces of one cached function.
#[derive(Debug, Clone)]
pub struct Rewritten {
    /// The holder declaration, absent for per-instance holders.
    pub holder: Option<ItemStatic>,
    /// The signature with destructuring parameters replaced by their bindings.
    pub sig: Signature,
    /// The memoizing body.
    pub block: Block,
}

/// A cached function and its holder, ready to be placed in the enclosing scope.
#[derive(Debug, Clone)]
pub struct TransformedFn {
    /// The holder declaration, absent for per-instance holders.
    pub holder: Option<ItemStatic>,
    /// The rewritten function.
    pub function: ItemFn,
}

impl TransformedFn {
    /// The definitions to insert into the enclosing scope: the holder first, then the function.
    #[must_use]
    pub fn definitions(self) -> Vec<Item> {
        let mut items = Vec::with_capacity(2);
        items.extend(self.holder.map(Item::Static));
        items.push(Item::Fn(self.function));
        items
    }

    /// Moves the holder to the top of the function body.
    ///
    /// An attribute on a free-standing function cannot add siblings to its scope it knows
    /// nothing about, but an item declared in the body is private to the function and still
    /// lives for the whole program.
    #[must_use]
    pub fn into_inline(self) -> ItemFn {
        let mut function = self.function;
        if let Some(holder) = self.holder {
            function.block.stmts.insert(0, Stmt::Item(Item::Static(holder)));
        }
        function
    }
}

/// Result of applying `#[cached]` to one definition.
#[derive(Debug, Clone)]
pub enum Expansion {
    /// The definition was a function and has been rewritten.
    Transformed(TransformedFn),
    /// The definition is not a function with a body. It is passed through unchanged.
    Ineligible {
        /// The definition as written.
        original: TokenStream,
        /// The single diagnostic explaining why nothing was generated.
        diagnostic: syn::Error,
        /// Whether a free item may follow the definition. A function declaration without a
        /// body only appears in traits and `extern` blocks, where the diagnostic is an error.
        free: bool,
    },
}

impl ToTokens for Expansion {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            Self::Transformed(transformed) => transformed.clone().into_inline().to_tokens(tokens),
            Self::Ineligible {
                original,
                diagnostic,
                free: true,
            } => {
                tokens.extend(token_stream_and_warning(
                    original.clone(),
                    &diagnostic.to_string(),
                    diagnostic.span(),
                ));
            }
            Self::Ineligible {
                original,
                diagnostic,
                free: false,
            } => {
                tokens.extend(token_stream_and_error(original.clone(), diagnostic.clone()));
            }
        }
    }
}

/// Entrypoint of `#[cached]`.
#[must_use]
pub fn cached(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match CacheArgs::parse(attr) {
        Ok(args) => args,
        Err(e) => {
            let errors = e.write_errors();
            return quote! {
                #item
                #errors
            };
        }
    };

    match transform(&args, item.clone(), &mut NameAllocator::new()) {
        Ok(expansion) => expansion.into_token_stream(),
        Err(e) => token_stream_and_error(item, e),
    }
}

/// Rewrites one free-standing definition.
///
/// Anything that does not parse as a function with a body is [`Expansion::Ineligible`] and
/// is reported with a warning.
/// A function that cannot be cached is a fatal error.
pub fn transform(args: &CacheArgs, item: TokenStream, names: &mut NameAllocator) -> syn::Result<Expansion> {
    let Ok(mut function) = syn::parse2::<ItemFn>(item.clone()) else {
        let diagnostic = TransformError::Ineligible.at(&item);
        let free = !matches!(syn::parse2::<TraitItemFn>(item.clone()), Ok(declaration) if declaration.default.is_none());
        return Ok(Expansion::Ineligible {
            original: item,
            diagnostic,
            free,
        });
    };

    let rewritten = transform_parts(args, &function.sig, &function.block, names, None)?;
    function.sig = rewritten.sig;
    *function.block = rewritten.block;

    Ok(Expansion::Transformed(TransformedFn {
        holder: rewritten.holder,
        function,
    }))
}

/// Rewrites the signature and body of one function or method.
///
/// `owner` is the enclosing `impl` block when it is known to the caller.
pub fn transform_parts(
    args: &CacheArgs,
    sig: &Signature,
    block: &Block,
    names: &mut NameAllocator,
    owner: Option<&ImplOwner>,
) -> syn::Result<Rewritten> {
    let instance = args.instance_field();

    let rules = match (instance, owner) {
        (Some(_), _) => TypeRules {
            self_ty: None,
            forbid_self: false,
        },
        (None, Some(owner)) if owner.generic => {
            return Err(TransformError::UnresolvedType(
                "a `static` holder cannot name the parameters of a generic `impl`; use `#[cached(instance = field)]`",
            )
            .at(&sig.ident));
        }
        (None, owner) => TypeRules {
            self_ty: owner.map(|owner| &owner.self_ty),
            forbid_self: true,
        },
    };

    let signature = FunctionSignature::extract(sig, &rules)?;

    if instance.is_none()
        && let Some(receiver) = &signature.receiver
    {
        return Err(TransformError::Receiver(
            "methods keep one cache per instance: add `#[cached(instance = field)]`",
        )
        .at(receiver));
    }

    if instance.is_some() && !signature.has_reference_receiver() {
        return Err(TransformError::Receiver("`instance` requires a `&self` or `&mut self` receiver").at(&sig.ident));
    }

    let site = match instance {
        Some(field) => HolderSite::Instance { field: field.clone() },
        None => {
            names.reserve_block_items(&block.stmts);
            HolderSite::Static {
                ident: names.allocate(&sig.ident),
                kind: args.holder.clone().map_or(HolderKind::Memo, HolderKind::Custom),
                cache_name: args.name.clone().unwrap_or_else(|| sig.ident.unraw().to_string()),
            }
        }
    };

    let synthesized = synthesize(&signature, block, &site, &args.crate_path());

    let mut sig = sig.clone();
    signature.rebind_patterns(&mut sig);

    Ok(Rewritten {
        holder: synthesized.holder,
        sig,
        block: synthesized.body,
    })
}
