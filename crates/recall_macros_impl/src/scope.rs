// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `#[cache_scope]`: rewrites every `#[cached]` function of an inline module or an `impl` block
//! and places each holder next to the item that uses it.

use proc_macro2::{TokenStream, TokenTree};
use quote::{ToTokens, quote};
use syn::ext::IdentExt;
use syn::{Attribute, Block, ImplItem, Item, ItemImpl, ItemMod, ItemStatic, Signature};

use crate::TransformError;
use crate::args::{CacheArgs, ScopeArgs};
use crate::driver::{ImplOwner, Rewritten, TransformedFn, transform_parts};
use crate::fresh::NameAllocator;
use crate::syn_helpers::{attr_args, take_cached_attr, token_stream_and_warning};

/// Entrypoint of `#[cache_scope]`.
#[must_use]
pub fn cache_scope(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match ScopeArgs::parse(attr) {
        Ok(args) => args,
        Err(e) => {
            let errors = e.write_errors();
            return quote! {
                #item
                #errors
            };
        }
    };

    match syn::parse2::<Item>(item.clone()) {
        Ok(Item::Mod(mut module)) if module.content.is_some() => {
            let mut errors = TokenStream::new();
            rewrite_mod(&args, &mut module, &mut errors);
            quote! {
                #module
                #errors
            }
        }
        Ok(Item::Impl(mut item_impl)) => {
            let mut names = NameAllocator::from_impl_items(&item_impl.items);
            if let Some(prefix) = owner_prefix(&item_impl) {
                names = names.with_prefix(&prefix);
            }

            let mut errors = TokenStream::new();
            let holders = rewrite_impl(&args, &mut item_impl, &mut names, &mut errors);
            quote! {
                #(#holders)*
                #item_impl
                #errors
            }
        }
        _ => {
            let diagnostic = TransformError::IneligibleScope.at(&item);
            token_stream_and_warning(item, &diagnostic.to_string(), diagnostic.span())
        }
    }
}

/// Rewrites the cached functions of `module` and of the `impl` blocks directly inside it.
///
/// Nested modules are left alone. Errors are appended to `errors`; the function that caused
/// one is kept as written, minus its `cached` attribute.
fn rewrite_mod(args: &ScopeArgs, module: &mut ItemMod, errors: &mut TokenStream) {
    let Some((_, items)) = &mut module.content else {
        return;
    };

    let mut names = NameAllocator::from_items(items.iter());
    let mut rewritten = Vec::with_capacity(items.len());

    for item in std::mem::take(items) {
        match item {
            Item::Fn(mut function) => {
                let Some(attr) = take_cached_attr(&mut function.attrs) else {
                    rewritten.push(Item::Fn(function));
                    continue;
                };

                match rewrite_fn(args, &attr, &function.sig, &function.block, &mut names, None) {
                    Ok(parts) => {
                        function.sig = parts.sig;
                        *function.block = parts.block;
                        rewritten.extend(
                            TransformedFn {
                                holder: parts.holder,
                                function,
                            }
                            .definitions(),
                        );
                    }
                    Err(error) => {
                        errors.extend(error);
                        rewritten.push(Item::Fn(function));
                    }
                }
            }
            Item::Impl(mut item_impl) => {
                let holders = rewrite_impl(args, &mut item_impl, &mut names, errors);
                rewritten.extend(holders.into_iter().map(Item::Static));
                rewritten.push(Item::Impl(item_impl));
            }
            other => rewritten.push(other),
        }
    }

    *items = rewritten;
}

/// Rewrites the cached methods of `item_impl` and returns their holders.
fn rewrite_impl(
    args: &ScopeArgs,
    item_impl: &mut ItemImpl,
    names: &mut NameAllocator,
    errors: &mut TokenStream,
) -> Vec<ItemStatic> {
    let owner = ImplOwner::of(item_impl);
    let mut holders = Vec::new();

    for impl_item in &mut item_impl.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let Some(attr) = take_cached_attr(&mut method.attrs) else {
            continue;
        };

        match rewrite_fn(args, &attr, &method.sig, &method.block, names, Some(&owner)) {
            Ok(parts) => {
                holders.extend(parts.holder);
                method.sig = parts.sig;
                method.block = parts.block;
            }
            Err(error) => errors.extend(error),
        }
    }

    holders
}

fn rewrite_fn(
    scope: &ScopeArgs,
    attr: &Attribute,
    sig: &Signature,
    block: &Block,
    names: &mut NameAllocator,
    owner: Option<&ImplOwner>,
) -> Result<Rewritten, TokenStream> {
    let tokens = attr_args(attr).map_err(|e| e.to_compile_error())?;
    let mut args = CacheArgs::parse(tokens).map_err(darling::Error::write_errors)?;
    if args.crate_path.is_none() {
        args.crate_path.clone_from(&scope.crate_path);
    }

    transform_parts(&args, sig, block, names, owner).map_err(|e| e.to_compile_error())
}

/// Holders of a top-level `impl` land in a module this macro cannot see, so their names are
/// qualified by the full implementing type and trait, generic arguments included, to keep
/// sibling `impl` blocks apart.
fn owner_prefix(item_impl: &ItemImpl) -> Option<String> {
    let mut words = Vec::new();
    spell(item_impl.self_ty.to_token_stream(), &mut words);
    if let Some((_, path, _)) = &item_impl.trait_ {
        spell(path.to_token_stream(), &mut words);
    }

    (!words.is_empty()).then(|| words.join("_"))
}

/// Collects the words of a type or path. Underscores inside a word are doubled so they stay
/// distinct from the single underscores that `owner_prefix` puts between words.
fn spell(tokens: TokenStream, words: &mut Vec<String>) {
    for tree in tokens {
        match tree {
            TokenTree::Group(group) => spell(group.stream(), words),
            TokenTree::Ident(ident) => words.push(ident.unraw().to_string().replace('_', "__")),
            TokenTree::Literal(literal) => {
                let word: String = literal.to_string().chars().filter(char::is_ascii_alphanumeric).collect();
                if !word.is_empty() {
                    words.push(word);
                }
            }
            TokenTree::Punct(_) => {}
        }
    }
}
