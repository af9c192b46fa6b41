// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Memoization of Rust functions through an attribute.
//!
//! `#[cached]` rewrites a function so that it keeps the result of every call in a holder keyed
//! by the tuple of its arguments. A later call with equal arguments returns a clone of the stored
//! result instead of running the body again.
//!
//! The rewrite happens at compile time. For
//!
//! ```
//! #[recall::cached]
//! fn f(x: i32, y: i32) -> i32 {
//!     x * y
//! }
//! # assert_eq!(f(1, 2), 2);
//! ```
//!
//! the macro declares a `static` [`MemoCache<(i32, i32), i32>`](MemoCache) inside `f` and replaces
//! the body with a lookup that runs the original body only on a miss.
//!
//! # Keys and values
//!
//! Every parameter becomes one element of the key, in declaration order. Reference parameters
//! are stored in their owned form: `&str` keys a `String`, `&[T]` keys a `Vec<T>`. Key types must
//! implement `Clone + Hash + Eq`, the return type must implement `Clone`. A function without
//! parameters has a single slot.
//!
//! Types must be nameable by a `static`, so `impl Trait`, generic parameters and borrowed data
//! with a non-`'static` lifetime are rejected with a compile error.
//!
//! # Holders
//!
//! [`CacheHolder`] is the two-operation contract the generated code calls. It is implemented by
//! [`MemoCache`] (the default) and by `parking_lot::Mutex`, `parking_lot::RwLock` and
//! `RefCell` wrapping a `HashMap`. Other holders are selected with `holder = Path`, where
//! `Path<K, V>` implements `Default`:
//!
//! ```
//! use std::collections::HashMap;
//!
//! type Table<K, V> = parking_lot::RwLock<HashMap<K, V>>;
//!
//! #[recall::cached(holder = Table)]
//! fn shout(text: &str) -> String {
//!     text.to_uppercase()
//! }
//! # assert_eq!(shout("hi"), "HI");
//! ```
//!
//! Methods cache per instance, in a field named with `instance = field`:
//!
//! ```
//! use std::cell::RefCell;
//! use std::collections::HashMap;
//!
//! struct Rectangle {
//!     width: u64,
//!     height: u64,
//!     areas: RefCell<HashMap<(u64,), u64>>,
//! }
//!
//! impl Rectangle {
//!     #[recall::cached(instance = areas)]
//!     fn scaled_area(&self, scale: u64) -> u64 {
//!         self.width * self.height * scale
//!     }
//! }
//!
//! let rectangle = Rectangle { width: 2, height: 3, areas: RefCell::default() };
//! assert_eq!(rectangle.scaled_area(2), 12);
//! assert_eq!(rectangle.areas.borrow().len(), 1);
//! ```
//!
//! # Sibling holders
//!
//! `#[cache_scope]` on an inline module or an `impl` block declares each holder as an item next
//! to its function, where the rest of the module can inspect it:
//!
//! ```
//! #[recall::cache_scope]
//! mod geometry {
//!     #[cached]
//!     pub fn hypotenuse_squared(a: u64, b: u64) -> u64 {
//!         a * a + b * b
//!     }
//!
//!     pub fn lookups() -> recall::CacheStats {
//!         __HYPOTENUSE_SQUARED_CACHE_0.stats()
//!     }
//! }
//!
//! geometry::hypotenuse_squared(3, 4);
//! geometry::hypotenuse_squared(3, 4);
//! assert_eq!(geometry::lookups().hits, 1);
//! ```
//!
//! # Concurrency
//!
//! The lookup and the store are two separate operations. Concurrent calls with the same
//! arguments may both miss and both run the body; the last store wins.
//!
//! # Feature Flags
//! * **`macros`** *(default)* – Re-exports [`cached`] and [`cache_scope`].
//! * **`logs`** – [`MemoCache`] emits `tracing` events named `cache.event` with `cache.name` and
//!   `cache.activity` fields: hits and misses at `DEBUG`, inserts at `TRACE`.

mod holder;
mod memo;
mod stats;
mod telemetry;
#[cfg(all(test, feature = "logs"))]
mod testing;

#[doc(inline)]
pub use holder::CacheHolder;
#[doc(inline)]
pub use memo::MemoCache;
#[cfg(feature = "macros")]
#[doc(inline)]
pub use recall_macros::{cache_scope, cached};
#[doc(inline)]
pub use stats::CacheStats;
