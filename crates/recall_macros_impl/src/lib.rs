// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! <div class="warning">This crate is a private dependency of <b>recall</b> crate.</div>
//!
//! The source-to-source rewrite behind `#[recall::cached]` and `#[recall::cache_scope]`.
//!
//! Given a function, the rewrite produces a cache holder keyed by the tuple of the function's
//! arguments and a new body that consults the holder before running the original body:
//!
//! ```ignore
//! #[cached]
//! fn f(x: i32, y: i32) -> i32 { x * y }
//!
//! // becomes, roughly
//! fn f(x: i32, y: i32) -> i32 {
//!     static __F_CACHE_0: ::recall::MemoCache<(i32, i32,), i32> = ::recall::MemoCache::new("f");
//!     let key = (x.clone(), y.clone(),);
//!     if let Some(cached) = ::recall::CacheHolder::get(&__F_CACHE_0, &key) {
//!         return cached;
//!     }
//!     let result: i32 = (|| -> i32 { x * y })();
//!     ::recall::CacheHolder::put(&__F_CACHE_0, key, result.clone());
//!     result
//! }
//! ```
//!
//! Everything operates on [`proc_macro2::TokenStream`] so it can be tested outside the compiler.

#![doc(hidden)]
#![doc(html_no_source)]

pub mod args;
pub mod driver;
mod error;
pub mod fresh;
pub mod scope;
pub mod signature;
pub mod syn_helpers;
pub mod synthesis;

pub use args::{CacheArgs, ScopeArgs};
pub use driver::{Expansion, ImplOwner, TransformedFn, cached, transform, transform_parts};
pub use error::TransformError;
pub use fresh::NameAllocator;
pub use scope::cache_scope;
pub use signature::{FunctionSignature, Param, TypeRules};
pub use synthesis::{HolderKind, HolderSite, Synthesized, synthesize};
