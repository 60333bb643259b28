//! Time-boxed aggregation cache with single-flight loading.
//!
//! `pulse-cache` sits between aggregate requests and the cluster API. Every
//! [`CacheKey`] owns one slot; a fresh slot is served without I/O, and a
//! stale or missing one is reloaded by exactly one caller while every other
//! caller for the same key shares that load.
//!
//! # Policies
//!
//! - **In-flight policy**: callers arriving while a load is running either
//!   wait for it ([`InFlightPolicy::Wait`], the default) or take the previous
//!   value immediately ([`InFlightPolicy::ServeStale`]). Forced refreshes
//!   always wait.
//! - **Failure**: a failed load keeps the previous value. Callers that shared
//!   the load get that value marked [`Freshness::Stale`] together with the
//!   error; with no previous value they get the error and the slot stays
//!   empty so the next call retries.
//! - **Cancellation**: dropping the loading caller clears the in-flight
//!   marker and a waiting caller takes the load over.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use pulse_cache::{AggregationCache, CacheKey, Freshness};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: AggregationCache<u32, String> = AggregationCache::new();
//! let key = CacheKey::new("prod", "overview");
//!
//! let first = cache
//!     .get(&key, Duration::from_secs(30), false, || async { Ok(7) })
//!     .await
//!     .unwrap();
//! assert_eq!(first.freshness, Freshness::Loaded);
//!
//! let second = cache
//!     .get(&key, Duration::from_secs(30), false, || async { Ok(8) })
//!     .await
//!     .unwrap();
//! assert_eq!(second.value, 7);
//! assert_eq!(second.freshness, Freshness::Cached);
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/pulse-cache/0.1.0")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod clock;
pub mod key;

pub use cache::{AggregationCache, CacheConfig, CacheStats, Freshness, InFlightPolicy, Lookup};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
