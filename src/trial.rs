//! Concurrent trial driver that counts producer invocations per key.
//!
//! A trial shares one [`Cache`] among many worker threads. Every worker
//! hammers the cache with requests for uniformly random keys, and every
//! producer invocation bumps a per-key counter that lives outside the cache.
//! The resulting [`TrialReport`] tells whether each key was computed exactly
//! once, which is the property the cache strategies are measured by.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

use rand::Rng;

use crate::cache::{Cache, Strategy};

/// Shape of a concurrent cache trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialConfig {
    /// Number of worker threads issuing requests.
    pub workers: usize,
    /// Number of requests each worker issues.
    pub attempts: usize,
    /// Keys are drawn uniformly from `0..key_space`.
    pub key_space: usize,
}

impl Default for TrialConfig {
    /// A configuration sized for quick checks rather than stress runs.
    fn default() -> Self {
        Self {
            workers: 32,
            attempts: 256,
            key_space: 64,
        }
    }
}

/// Per-key producer invocation counts collected by a trial.
#[derive(Debug)]
pub struct TrialReport {
    invocations: Box<[usize]>,
}

impl TrialReport {
    /// The key space the trial drew from.
    pub fn key_space(&self) -> usize {
        self.invocations.len()
    }

    /// How many times the producer ran for `key`.
    pub fn invocations(&self, key: usize) -> usize {
        self.invocations[key]
    }

    /// Number of keys whose producer ran at least once.
    pub fn resolved_keys(&self) -> usize {
        self.invocations.iter().filter(|&&n| n > 0).count()
    }

    /// Number of keys whose producer ran more than once.
    pub fn overcomputed_keys(&self) -> usize {
        self.invocations.iter().filter(|&&n| n > 1).count()
    }

    /// The largest invocation count any key collected.
    pub fn max_invocations(&self) -> usize {
        self.invocations.iter().copied().max().unwrap_or(0)
    }

    /// Whether every key was requested and none was computed twice.
    pub fn is_exactly_once(&self) -> bool {
        self.invocations.iter().all(|&n| n == 1)
    }

    /// Panics unless every key was computed exactly once.
    pub fn assert_exactly_once(&self) {
        // Every key must have been requested at least once; if not, the trial
        // needs more attempts, not a better cache.
        assert_eq!(
            self.resolved_keys(),
            self.key_space(),
            "some keys were never requested; increase the attempt count"
        );

        for (key, &count) in self.invocations.iter().enumerate() {
            assert_eq!(
                count, 1,
                "key {key} was computed {count} times; the cache is not atomic enough"
            );
        }
    }
}

/// The value a trial producer returns for `key`.
///
/// Odd-constant multiplication keys the mapping bijectively, so a value that
/// leaked from one key to another changes the result and trips the per-call
/// check in [`run_trial`].
pub fn value_for(key: usize) -> u64 {
    (key as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1)
}

/// Runs a trial of `config` against a fresh cache using `strategy`.
///
/// Workers start behind a barrier so the key space sees maximal contention,
/// and every producer yields once before returning to widen the window in
/// which a broken strategy can double-compute. Each request checks that the
/// returned value matches [`value_for`] of the requested key.
pub fn run_trial(strategy: Strategy, config: &TrialConfig) -> TrialReport {
    let cancel = AtomicBool::new(false);
    run_cancellable_trial(strategy, config, &cancel)
}

/// Like [`run_trial`], but workers stop at the next attempt boundary once
/// `cancel` is set.
///
/// Set the flag with `Ordering::Release`; workers read it with
/// `Ordering::Acquire` before every attempt.
pub fn run_cancellable_trial(
    strategy: Strategy,
    config: &TrialConfig,
    cancel: &AtomicBool,
) -> TrialReport {
    let cache = Cache::with_strategy(strategy);
    let invocations: Vec<AtomicUsize> = (0..config.key_space).map(|_| AtomicUsize::new(0)).collect();
    let barrier = Barrier::new(config.workers);

    thread::scope(|s| {
        for _ in 0..config.workers {
            let _ = s.spawn(|| {
                let mut rng = rand::thread_rng();
                let _ = barrier.wait();
                for _ in 0..config.attempts {
                    if cancel.load(Ordering::Acquire) {
                        break;
                    }
                    let key = rng.gen_range(0..config.key_space);
                    let value = cache.get_or_compute(key, |key| {
                        let _ = invocations[key].fetch_add(1, Ordering::Relaxed);
                        thread::yield_now();
                        value_for(key)
                    });
                    assert_eq!(
                        value,
                        value_for(key),
                        "cache returned a value computed for a different key"
                    );
                }
            });
        }
    });

    TrialReport {
        invocations: invocations.into_iter().map(AtomicUsize::into_inner).collect(),
    }
}
