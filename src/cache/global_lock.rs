//! One lock around the whole map.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

/// Cache that checks, computes, and inserts under a single `Mutex`.
///
/// Correct by construction, at the price of serializing every request behind
/// every in-flight computation, whatever its key.
pub(super) struct GlobalLockCache<K, V> {
    values: Mutex<HashMap<K, V>>,
}

impl<K, V> GlobalLockCache<K, V> {
    pub(super) fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> GlobalLockCache<K, V> {
    pub(super) fn try_get_or_compute<E, F: FnOnce(K) -> Result<V, E>>(
        &self,
        key: K,
        produce: F,
    ) -> Result<V, E> {
        // A producer that panicked on an earlier call poisoned the lock while
        // leaving the map itself untouched, so the entry is safe to reuse and
        // the key can be computed again.
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(value) = values.get(&key) {
            return Ok(value.clone());
        }

        let value = produce(key.clone())?;
        values.insert(key, value.clone());
        Ok(value)
    }
}
