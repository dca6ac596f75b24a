//! Check-then-act baseline without exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// Cache that looks up and inserts without holding anything in between.
///
/// Two threads that miss on the same key both run the producer; whichever
/// insert happens last stays in the map. Each call still returns the value
/// its own producer made, so callers observe a consistent result even while
/// the exactly-once guarantee is being violated.
pub(super) struct NaiveCache<K, V> {
    values: RwLock<HashMap<K, V>>,
}

impl<K, V> NaiveCache<K, V> {
    pub(super) fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> NaiveCache<K, V> {
    pub(super) fn try_get_or_compute<E, F: FnOnce(K) -> Result<V, E>>(
        &self,
        key: K,
        produce: F,
    ) -> Result<V, E> {
        if let Some(value) = self.values.read().unwrap().get(&key) {
            return Ok(value.clone());
        }

        // The read lock is gone by now, so another thread can reach this
        // point for the same key. That is the race this strategy exists to
        // demonstrate.
        let value = produce(key.clone())?;
        self.values.write().unwrap().insert(key, value.clone());
        Ok(value)
    }
}
