//! Thread-safe memoizing key/value cache.

use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;

mod claim;
mod global_lock;
mod naive;

use claim::ClaimRetryCache;
use global_lock::GlobalLockCache;
use naive::NaiveCache;

/// How a [`Cache`] arbitrates concurrent requests for a missing key.
///
/// The strategy is fixed when the cache is built; it decides who runs the
/// producer when several threads request the same uncommitted key at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Check-then-act with no exclusion between the check and the insert.
    ///
    /// Concurrent requests for the same missing key may all run the producer,
    /// so the exactly-once guarantee does not hold. Kept as the baseline the
    /// trial driver is expected to catch.
    Naive,
    /// A single lock around the whole map; the producer runs inside it.
    ///
    /// Always exactly-once, but one in-flight computation blocks every other
    /// request, including requests for unrelated keys.
    GlobalLock,
    /// Per-key claim counters with retry.
    ///
    /// Exactly one contender wins the claim for a missing key and computes;
    /// the rest back off and retry until the value is committed. Requests for
    /// different keys never wait on each other.
    #[default]
    ClaimRetry,
}

/// Cache that remembers the result of a producer function for each key.
///
/// All methods take `&self`, so a single instance can be shared across
/// threads (via a scope or an `Arc`) and drives all synchronization
/// internally. Entries are never evicted: once a key is committed, every
/// later request returns the committed value.
pub struct Cache<K, V> {
    backend: Backend<K, V>,
}

enum Backend<K, V> {
    Naive(NaiveCache<K, V>),
    GlobalLock(GlobalLockCache<K, V>),
    ClaimRetry(ClaimRetryCache<K, V>),
}

impl<K, V> Cache<K, V> {
    /// Creates an empty cache using the default [`Strategy::ClaimRetry`].
    pub fn new() -> Self {
        Self::with_strategy(Strategy::default())
    }

    /// Creates an empty cache that arbitrates requests with `strategy`.
    pub fn with_strategy(strategy: Strategy) -> Self {
        let backend = match strategy {
            Strategy::Naive => Backend::Naive(NaiveCache::new()),
            Strategy::GlobalLock => Backend::GlobalLock(GlobalLockCache::new()),
            Strategy::ClaimRetry => Backend::ClaimRetry(ClaimRetryCache::new()),
        };
        Cache { backend }
    }

    /// Returns the strategy this cache was built with.
    pub fn strategy(&self) -> Strategy {
        match &self.backend {
            Backend::Naive(_) => Strategy::Naive,
            Backend::GlobalLock(_) => Strategy::GlobalLock,
            Backend::ClaimRetry(_) => Strategy::ClaimRetry,
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Cache<K, V> {
    /// Retrieves the value for `key`, running `produce` to create it on the
    /// first request.
    ///
    /// Since `produce` may be expensive, it runs at most once per key: even
    /// when many threads request the same missing key concurrently, a single
    /// invocation commits the value and the others receive it. An invocation
    /// with one key does not block invocations with different keys, except
    /// under [`Strategy::GlobalLock`], which serializes every computation.
    /// [`Strategy::Naive`] deliberately forgoes the at-most-once guarantee.
    ///
    /// `produce` must not request `key` from the same cache again; no
    /// strategy supports re-entrant requests for a key that is being
    /// computed.
    pub fn get_or_compute<F: FnOnce(K) -> V>(&self, key: K, produce: F) -> V {
        let result: Result<V, Infallible> = self.try_get_or_compute(key, |key| Ok(produce(key)));
        match result {
            Ok(value) => value,
            Err(infallible) => match infallible {},
        }
    }

    /// Like [`get_or_compute`](Cache::get_or_compute), for producers that can
    /// fail.
    ///
    /// A failure is not committed: the error propagates to the caller whose
    /// producer ran, the key stays absent, and a later request runs its own
    /// producer again. Other threads waiting on the same key simply see the
    /// key as still missing.
    ///
    /// ```
    /// use memo_cache::Cache;
    ///
    /// let cache = Cache::new();
    /// let miss: Result<u32, &str> = cache.try_get_or_compute(1, |_| Err("backend down"));
    /// assert_eq!(miss, Err("backend down"));
    ///
    /// // The failure was not cached; the next request may succeed.
    /// assert_eq!(cache.try_get_or_compute(1, |key| Ok::<_, &str>(key + 10)), Ok(11));
    /// ```
    pub fn try_get_or_compute<E, F: FnOnce(K) -> Result<V, E>>(
        &self,
        key: K,
        produce: F,
    ) -> Result<V, E> {
        match &self.backend {
            Backend::Naive(cache) => cache.try_get_or_compute(key, produce),
            Backend::GlobalLock(cache) => cache.try_get_or_compute(key, produce),
            Backend::ClaimRetry(cache) => cache.try_get_or_compute(key, produce),
        }
    }
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("strategy", &self.strategy())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Cache<String, Vec<u8>>: Send, Sync);
