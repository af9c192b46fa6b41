// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Allocation of holder identifiers that cannot collide with anything in their scope.

use std::collections::HashSet;

use proc_macro2::{Ident, Span};
use syn::ext::IdentExt;
use syn::{ImplItem, Item, Stmt, UseTree};

/// Tracks the identifiers already used in one scope and hands out fresh holder names.
///
/// Holder names have the shape `__<FUNCTION>_CACHE_<n>`, where `n` is the smallest counter
/// value not yet taken in the scope. Every allocated name is recorded, so repeated
/// allocations for the same function name never return the same identifier.
///
/// An allocator with a prefix produces `__<PREFIX>_<FUNCTION>_CACHE_<n>` instead, for holders
/// emitted into a scope whose other members cannot be inspected.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
    prefix: Option<String>,
}

impl NameAllocator {
    /// Creates an allocator for an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator seeded with every name declared by `items`.
    #[must_use]
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut allocator = Self::new();
        allocator.reserve_items(items);
        allocator
    }

    /// Creates an allocator seeded with every associated item name of an `impl` block.
    #[must_use]
    pub fn from_impl_items<'a>(items: impl IntoIterator<Item = &'a ImplItem>) -> Self {
        let mut allocator = Self::new();
        for item in items {
            match item {
                ImplItem::Const(constant) => allocator.reserve(&constant.ident),
                ImplItem::Fn(function) => allocator.reserve(&function.sig.ident),
                ImplItem::Type(alias) => allocator.reserve(&alias.ident),
                _ => {}
            }
        }
        allocator
    }

    /// Qualifies every allocated name with `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_uppercase());
        self
    }

    /// Marks `name` as used.
    pub fn reserve(&mut self, name: &Ident) {
        self.taken.insert(name.unraw().to_string());
    }

    /// Marks every name declared by `items` as used, including the leaves of `use` trees.
    pub fn reserve_items<'a>(&mut self, items: impl IntoIterator<Item = &'a Item>) {
        for item in items {
            match item {
                Item::Const(item) => self.reserve(&item.ident),
                Item::Enum(item) => self.reserve(&item.ident),
                Item::ExternCrate(item) => match &item.rename {
                    Some((_, rename)) => self.reserve(rename),
                    None => self.reserve(&item.ident),
                },
                Item::Fn(item) => self.reserve(&item.sig.ident),
                Item::Macro(item) => {
                    if let Some(ident) = &item.ident {
                        self.reserve(ident);
                    }
                }
                Item::Mod(item) => self.reserve(&item.ident),
                Item::Static(item) => self.reserve(&item.ident),
                Item::Struct(item) => self.reserve(&item.ident),
                Item::Trait(item) => self.reserve(&item.ident),
                Item::TraitAlias(item) => self.reserve(&item.ident),
                Item::Type(item) => self.reserve(&item.ident),
                Item::Union(item) => self.reserve(&item.ident),
                Item::Use(item) => self.reserve_use_tree(&item.tree),
                _ => {}
            }
        }
    }

    /// Marks every item declared at the top level of a function body as used.
    ///
    /// Body-local items shadow anything declared outside the body, including holders.
    pub fn reserve_block_items(&mut self, stmts: &[Stmt]) {
        self.reserve_items(stmts.iter().filter_map(|stmt| match stmt {
            Stmt::Item(item) => Some(item),
            _ => None,
        }));
    }

    fn reserve_use_tree(&mut self, tree: &UseTree) {
        match tree {
            UseTree::Path(path) => self.reserve_use_tree(&path.tree),
            UseTree::Name(name) => self.reserve(&name.ident),
            UseTree::Rename(rename) => self.reserve(&rename.rename),
            UseTree::Group(group) => {
                for tree in &group.items {
                    self.reserve_use_tree(tree);
                }
            }
            UseTree::Glob(_) => {}
        }
    }

    /// Returns `true` if `name` is already used in this scope.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Allocates a fresh holder name derived from `function` and records it.
    #[must_use]
    pub fn allocate(&mut self, function: &Ident) -> Ident {
        let function = function.unraw().to_string().to_uppercase();
        let base = match &self.prefix {
            Some(prefix) => format!("__{prefix}_{function}_CACHE"),
            None => format!("__{function}_CACHE"),
        };

        let mut counter = 0_usize;
        loop {
            let candidate = format!("{base}_{counter}");
            if self.taken.insert(candidate.clone()) {
                return Ident::new(&candidate, Span::call_site());
            }
            counter += 1;
        }
    }
}
