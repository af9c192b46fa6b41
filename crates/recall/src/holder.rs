// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Storage for the results of a memoized function.
///
/// Code generated by [`cached`](crate::cached) calls [`get`](Self::get) once per call and
/// [`put`](Self::put) once per miss. Both take `&self` so a holder can live in a `static`;
/// implementations synchronize internally (or, like `RefCell`, are single-threaded).
///
/// The check-then-store sequence is not atomic: two threads missing on the same key both run
/// the function and the last `put` wins.
pub trait CacheHolder<K, V> {
    /// Returns a clone of the value stored for `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` for `key` and returns the value it replaced.
    fn put(&self, key: K, value: V) -> Option<V>;
}

impl<K, V, S> CacheHolder<K, V> for Mutex<HashMap<K, V, S>>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        self.lock().insert(key, value)
    }
}

impl<K, V, S> CacheHolder<K, V> for RwLock<HashMap<K, V, S>>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }
}

impl<K, V, S> CacheHolder<K, V> for RefCell<HashMap<K, V, S>>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<V> {
        self.borrow().get(key).cloned()
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        self.borrow_mut().insert(key, value)
    }
}

impl<K, V, H> CacheHolder<K, V> for Arc<H>
where
    H: CacheHolder<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        (**self).put(key, value)
    }
}
