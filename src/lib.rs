#![deny(missing_docs)]
//! Cache entries with probabilistic early expiration, following the XFetch
//! algorithm.
//!
//! # Cache Stampede
//!
//! A cache stampede (also called dog-piling) is a cascading failure of heavily
//! loaded systems that sit behind a cache. While load is normal, an expired
//! entry is recomputed by whoever notices first and everyone else keeps going.
//! Under heavy load, many processes or threads notice the same expiry at the
//! same instant and all of them recompute it, adding load to the very
//! resource the cache was meant to protect.
//!
//! This crate mitigates stampedes with the algorithm from Vattani, A.;
//! Chierichetti, F.; Lowenstein, K. (2015), [Optimal Probabilistic Cache
//! Stampede Prevention][vldb]. Every reader independently decides whether to
//! volunteer for recomputation, with a probability that rises as the entry
//! approaches its expiry. Recomputation gets spread over a window before the
//! deadline instead of piling up on it.
//!
//! ```ignore
//! function XFetch(key, ttl; beta = 1)
//!     value, delta, expiry <- cache_read(key)
//!     if !value or time() - delta * beta * ln(rand()) > expiry then
//!         start <- time()
//!         value <- recompute_value()
//!         delta <- time() - start
//!         cache_write(key, (value, delta), ttl)
//!     end
//!     return value
//! end
//! ```
//!
//! - **delta** is the time the recomputation takes. It is measured when the
//!   entry is built unless overridden. Slower recomputations start earlier.
//! - **beta** scales the window. Values above `1.0` favor earlier
//!   recomputation, values below favor later, and `0.0` turns the entry into a
//!   plain TTL. The default `1.0` is optimal for most use cases.
//! - `rand()` is uniform on the open interval (0, 1).
//!
//! This crate only decides. Storing entries, and making sure only one of the
//! readers that saw an expiry actually recomputes, is up to the surrounding
//! cache.
//!
//! # Examples
//!
//! Create a single cache entry and test its expiration:
//!
//! ```rust
//! # struct SomeValue { value: u64, ttl: u64 };
//! # fn expensive_computation() -> SomeValue { SomeValue { value: 42, ttl: 10000 } }
//! use xfetch_entry::CacheEntry;
//! use std::time::Duration;
//!
//! let entry = CacheEntry::builder(|| {
//!     expensive_computation()
//! })
//! .with_ttl(|value| {
//!     Duration::from_millis(value.ttl)
//! })
//! .build();
//!
//! assert!(!entry.is_expired());
//! ```
//!
//! Parameters can also come from a [CacheEntryOptions](struct.CacheEntryOptions.html)
//! value, for example one loaded from configuration:
//!
//! ```rust
//! use std::time::Duration;
//! use xfetch_entry::{CacheEntry, CacheEntryOptions};
//!
//! let options = CacheEntryOptions::new()
//!     .delta(Duration::from_millis(500))
//!     .ttl(Duration::from_secs(60));
//! options.validate().unwrap();
//!
//! let entry = CacheEntry::with_options(|| "hello", options);
//! assert_eq!(entry.delta(), Duration::from_millis(500));
//! ```
//!
//! The [CacheEntry](struct.CacheEntry.html) can be used with any cache library.
//! For example the `lru` crate:
//!
//! ```rust
//! use lru::LruCache;
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//! use xfetch_entry::CacheEntry;
//!
//! struct SomeValue {
//!     value: u64,
//!     ttl: u64,
//! }
//!
//! fn recompute_value(n: u64) -> SomeValue {
//!     SomeValue { value: n, ttl: 10000 }
//! }
//!
//! fn fetch(n: u64) -> CacheEntry<SomeValue> {
//!     CacheEntry::builder(|| recompute_value(n))
//!         .with_ttl(|v| Duration::from_millis(v.ttl))
//!         .build()
//! }
//!
//! let mut cache = LruCache::new(NonZeroUsize::new(2).unwrap());
//! cache.put("apple", fetch(3));
//! cache.put("banana", fetch(2));
//!
//! let fresh = match cache.get(&"apple") {
//!     Some(entry) if !entry.is_expired() => Some(entry.get().value),
//!     _ => None,
//! };
//! let value = match fresh {
//!     Some(value) => value,
//!     None => {
//!         cache.put("apple", fetch(3));
//!         3
//!     }
//! };
//! assert_eq!(value, 3);
//! ```
//!
//! # Concurrency
//!
//! Entries are immutable once built and may be read from many threads at
//! once. [`CacheEntry::is_expired`](struct.CacheEntry.html#method.is_expired)
//! draws from the thread-local generator. When supplying your own generator
//! through `is_expired_with_rng` or `is_expired_at`, give each thread its
//! own; `&mut` access already forbids sharing one unsynchronized.
//!
//! # References
//!
//! - Wikipedia [Cache Stampede][wikipedia].
//! - Vattani, A.; Chierichetti, F.; Lowenstein, K. (2015), [Optimal
//!   Probabilistic Cache Stampede Prevention][vldb] (PDF), 8 (8), VLDB, pp. 886-897,
//!   ISSN 2150-8097.
//! - Jim Nelson, Internet Archive, [RedisConf17 - Preventing cache stampede with Redis & XFetch][archive].
//!
//! [vldb]: http://www.vldb.org/pvldb/vol8/p886-vattani.pdf
//! [wikipedia]: https://en.wikipedia.org/wiki/Cache_stampede
//! [archive]: https://www.slideshare.net/RedisLabs/redisconf17-internet-archive-preventing-cache-stampede-with-redis-and-xfetch

mod entry;
mod error;
mod options;
pub mod oracle;

pub use entry::{CacheEntry, CacheEntryBuilder};
pub use error::{Error, Result};
pub use options::{CacheEntryOptions, Ttl, DEFAULT_BETA};
pub use oracle::early_expiration_window;
