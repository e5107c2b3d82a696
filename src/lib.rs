//! Score-ordered counter collections backed by a sorted-set store.
//!
//! This crate provides [`SortedSetCounter`], a counter-like collection of
//! unique members, each carrying a floating-point score, kept sorted by score.
//! Beyond point reads and writes it answers range questions:
//!
//! - [`items`](SortedSetCounter::items) - Entries inside a rank window, a score window, or both
//! - [`count_between`](SortedSetCounter::count_between) - How many entries score within bounds
//! - [`discard_between`](SortedSetCounter::discard_between) - Remove a whole window in one request
//! - [`most_common`](SortedSetCounter::most_common) - The top `n` entries by score
//!
//! # Example
//!
//! ```
//! use sorted_set_counter::{MemoryStore, RangeSpec, SortedSetCounter};
//!
//! let store = MemoryStore::new();
//! let visits = SortedSetCounter::new(&store, "visits");
//!
//! visits.increment_score("home", 3)?;
//! visits.increment_score("about", 1)?;
//! visits.increment_score("blog", 2)?;
//!
//! assert_eq!(visits.get_rank("home", false)?, Some(2));
//! assert_eq!(visits.count_between(Some(2.0), None)?, 2);
//!
//! // Top two pages, highest first
//! let top: Vec<_> = visits.most_common(Some(2))?.into_iter().map(|(page, _)| page.to_string()).collect();
//! assert_eq!(top, ["'home'", "'blog'"]);
//!
//! // Drop everything ranked below the top one
//! assert_eq!(visits.discard_between(&RangeSpec::new().max_rank(-2))?, 2);
//! assert_eq!(visits.to_string(), "{'home': 3.0}");
//! # Ok::<(), sorted_set_counter::Error>(())
//! ```
//!
//! # Stores
//!
//! A counter holds no entries itself: it names one sorted set inside an
//! [`OrderedStore`]. Two backends ship with the crate:
//!
//! - [`MemoryStore`] - In-process, backed by an order-statistic B+tree
//! - `RedisStore` - A Redis server, behind the **`redis`** feature
//!
//! # Members
//!
//! Members are integers, floats, text or raw bytes ([`Member`]). Each kind has
//! a canonical byte encoding, so `1` and `"1"` are different members, and
//! entries with equal scores are ordered by that encoding.

// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[cfg(feature = "redis")]
pub mod config;
mod error;
mod member;
pub mod range_spec;
mod raw;
mod score;
mod sorted_set_counter;
pub mod store;

pub use error::{Error, Result};
pub use member::Member;
pub use range_spec::RangeSpec;
pub use score::IntoScore;
pub use sorted_set_counter::{Iter, SortedSetCounter};
pub use store::{MemoryStore, OrderedStore, StoreError};
