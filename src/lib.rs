//! Concurrency-safe memoizing cache.
//!
//! A [`Cache`] remembers the result of a producer function for each key and
//! serves that result to every later request. Its guarantee is about what
//! happens *before* a key is committed: when many threads ask for the same
//! missing key at once, only one of them runs the producer and everyone gets
//! the committed value.
//!
//! The arbitration algorithm is picked per cache with a [`Strategy`], which
//! ranges from a deliberately racy baseline to per-key claim counters. The
//! [`trial`] module drives a cache from many threads and counts producer
//! invocations per key, so the strategies can be compared (and the baseline
//! caught misbehaving) under real contention.
//!
//! ```
//! use memo_cache::Cache;
//!
//! let cache = Cache::new();
//! assert_eq!(cache.get_or_compute(7, |key| key * 2), 14);
//! // The committed value is served without running the producer again.
//! assert_eq!(cache.get_or_compute(7, |_| unreachable!()), 14);
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![deny(unsafe_code)]

mod cache;
pub mod trial;

pub use cache::{Cache, Strategy};
