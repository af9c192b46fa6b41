// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Macros for the [`recall`](https://docs.rs/recall) crate.
//!
//! # Provided Attributes
//!
//! * `#[cached]` – Memoizes a function: a holder keyed by the argument tuple stores each result.
//! * `#[cache_scope]` – Applied to an inline module or an `impl` block, places the holders of its
//!   `#[cached]` functions next to them instead of inside their bodies.

use proc_macro::TokenStream;

/// Memoizes a function by the tuple of its arguments.
///
/// The first call with a given set of arguments runs the body and stores a clone of the result;
/// later calls with equal arguments return a clone of the stored result without running it.
/// Reference parameters are stored in their owned form (`&str` as `String`, `&[T]` as `Vec<T>`).
///
/// Every argument type must implement `Clone + Hash + Eq` (or `ToOwned` with such an owned form)
/// and the return type must implement `Clone`.
///
/// # Arguments
/// * `name = "..."` – Name reported by the cache's telemetry. Defaults to the function name.
/// * `holder = Path` – Holder type constructor, instantiated as `Path<K, V>` and created with
///   `Default`, such as a type alias for `parking_lot::RwLock<HashMap<K, V>>`.
/// * `instance = field` – Keeps the cache in `self.field` so each instance caches on its own.
///   Required for methods with a `&self` or `&mut self` receiver.
/// * `crate_path = path` – Path to the `recall` crate when it is re-exported or renamed.
///
/// # Errors
/// The function is left as written with a compile error next to it when its key or value type
/// cannot be named by a `static` (`impl Trait`, generics, non-`'static` borrows, `Self`), when it
/// is `async` or `const`, or when the receiver does not match the holder.
///
/// # Example
/// ```ignore
/// #[recall::cached]
/// fn fib(n: u64) -> u64 {
///     if n < 2 { n } else { fib(n - 1) + fib(n - 2) }
/// }
/// ```
#[proc_macro_attribute]
#[cfg_attr(test, mutants::skip)]
pub fn cached(attr: TokenStream, item: TokenStream) -> TokenStream {
    recall_macros_impl::cached(attr.into(), item.into()).into()
}

/// Rewrites every `#[cached]` function of an inline module or an `impl` block, declaring each
/// holder as a sibling item right before the function (or the `impl` block) that uses it.
///
/// Inside a non-generic `impl` block, `Self` in parameter and return types refers to the
/// implementing type.
///
/// # Arguments
/// * `crate_path = path` – Default `recall` path for the functions of the scope.
///
/// # Example
/// ```ignore
/// #[recall::cache_scope]
/// mod geometry {
///     #[cached]
///     pub fn hypotenuse_squared(a: u64, b: u64) -> u64 {
///         a * a + b * b
///     }
/// }
/// ```
#[proc_macro_attribute]
#[cfg_attr(test, mutants::skip)]
pub fn cache_scope(attr: TokenStream, item: TokenStream) -> TokenStream {
    recall_macros_impl::cache_scope(attr.into(), item.into()).into()
}
