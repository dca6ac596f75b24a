//! Per-key claim counters with retry.

use std::collections::HashMap;
use std::hash::Hash;

#[cfg(not(feature = "check-loom"))]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(feature = "check-loom"))]
use std::sync::{Arc, Mutex, RwLock};

#[cfg(feature = "check-loom")]
use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(feature = "check-loom")]
use loom::sync::{Arc, Mutex, RwLock};

#[cfg(not(feature = "check-loom"))]
use crossbeam_utils::Backoff;
use crossbeam_utils::CachePadded;

/// Cache that elects the computing thread with a claim counter per key.
///
/// A missing key is computed by the thread whose `fetch_add` raised the key's
/// claim counter from zero. Everyone else undoes its increment, backs off,
/// and retries; they pick the value up from the fast path once the winner
/// commits. The producer itself runs with no lock held, so computations for
/// different keys proceed in parallel.
pub(super) struct ClaimRetryCache<K, V> {
    /// Committed values. A key is written here once and never overwritten.
    values: RwLock<HashMap<K, V>>,
    /// One claim counter per key that ever saw a miss. Counters are created
    /// on demand and never removed: the winner leaves its claim in place, so
    /// a counter that came back at zero would hand out a second claim for a
    /// key that is already committed.
    claims: Mutex<HashMap<K, Arc<CachePadded<AtomicUsize>>>>,
}

impl<K, V> ClaimRetryCache<K, V> {
    pub(super) fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            claims: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> ClaimRetryCache<K, V> {
    pub(super) fn try_get_or_compute<E, F: FnOnce(K) -> Result<V, E>>(
        &self,
        key: K,
        produce: F,
    ) -> Result<V, E> {
        #[cfg(not(feature = "check-loom"))]
        let backoff = Backoff::new();

        loop {
            if let Some(value) = self.lookup(&key) {
                return Ok(value);
            }

            // The counter only elects a winner; the value itself is published
            // through the `values` lock, so `Relaxed` suffices here.
            let counter = self.claim_counter(&key);
            if counter.fetch_add(1, Ordering::Relaxed) == 0 {
                // This thread holds the only live claim for `key`. The claim
                // is rolled back if the producer fails, and stays in place
                // forever once the value is committed.
                let claim = ClaimGuard::new(&counter);
                let value = produce(key.clone())?;
                self.values.write().unwrap().insert(key, value.clone());
                claim.commit();
                return Ok(value);
            }

            // Someone else holds the claim. Undo the probe and retry; the
            // fast path returns the value once the winner commits.
            let _ = counter.fetch_sub(1, Ordering::Relaxed);
            #[cfg(not(feature = "check-loom"))]
            backoff.snooze();
            #[cfg(feature = "check-loom")]
            loom::thread::yield_now();
        }
    }

    fn lookup(&self, key: &K) -> Option<V> {
        self.values.read().unwrap().get(key).cloned()
    }

    fn claim_counter(&self, key: &K) -> Arc<CachePadded<AtomicUsize>> {
        let mut claims = self.claims.lock().unwrap();
        let counter = claims
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CachePadded::new(AtomicUsize::new(0))));
        Arc::clone(counter)
    }
}

/// Rolls a claim back unless the value made it into the map.
struct ClaimGuard<'a> {
    counter: &'a AtomicUsize,
    committed: bool,
}

impl<'a> ClaimGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        ClaimGuard {
            counter,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        // Runs on producer error or panic; the next contender to raise the
        // counter from zero becomes the new winner.
        if !self.committed {
            let _ = self.counter.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
