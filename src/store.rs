//! The ordered key-score store the collection runs on.
//!
//! A store holds any number of sorted sets, each addressed by a string key.
//! Members cross this boundary in their canonical byte encoding (see
//! [`Member::encode`](crate::Member::encode)); within one set, entries are
//! ordered by score and then by member bytes.

use auto_impl::auto_impl;

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

/// An encoded member paired with its score, as read from a store.
pub type RawEntry = (Vec<u8>, f64);

/// Failures reported by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport or connection failure; the request may not have run.
    #[error(transparent)]
    Unavailable(Box<dyn std::error::Error + Send + Sync>),
    /// The store answered, but with data that is not a valid sorted set.
    #[error("{0}")]
    Inconsistent(String),
}

/// Primitive sorted-set operations.
///
/// Every method is a single request against the store and is atomic on its
/// own. Rank arguments are inclusive and may be negative, counting from the
/// end (`-1` is the last entry); out-of-range ranks are clamped. Score bounds
/// are inclusive, and an inverted range selects nothing.
#[auto_impl(&, &mut, Box, Arc)]
pub trait OrderedStore {
    /// Inserts `member` or overwrites its score.
    fn put(&self, key: &str, member: &[u8], score: f64) -> Result<(), StoreError>;

    /// Applies every upsert in `entries` in order, all or nothing.
    fn put_many(&self, key: &str, entries: &[RawEntry]) -> Result<(), StoreError>;

    /// Adds `amount` to the score of `member` (absent counts as `0`) and
    /// returns the new score.
    fn incr(&self, key: &str, member: &[u8], amount: f64) -> Result<f64, StoreError>;

    /// Removes `member` if present.
    fn remove(&self, key: &str, member: &[u8]) -> Result<(), StoreError>;

    /// Removes every listed member in one atomic request.
    fn remove_many(&self, key: &str, members: &[Vec<u8>]) -> Result<(), StoreError>;

    fn score_of(&self, key: &str, member: &[u8]) -> Result<Option<f64>, StoreError>;

    /// Zero-based position of `member`, counted from the highest score when
    /// `reverse` is set.
    fn rank_of(&self, key: &str, member: &[u8], reverse: bool) -> Result<Option<usize>, StoreError>;

    fn size(&self, key: &str) -> Result<usize, StoreError>;

    /// Entries with ranks `start..=stop`. With `reverse`, ranks are counted
    /// from the highest score and entries come back in descending order.
    fn range_by_rank(&self, key: &str, start: isize, stop: isize, reverse: bool) -> Result<Vec<RawEntry>, StoreError>;

    /// Entries with `min <= score <= max`, ascending unless `reverse`.
    fn range_by_score(&self, key: &str, min: f64, max: f64, reverse: bool) -> Result<Vec<RawEntry>, StoreError>;

    fn count_by_score(&self, key: &str, min: f64, max: f64) -> Result<usize, StoreError>;

    /// Drops the whole set stored under `key`.
    fn clear(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically swaps the set under `key` for exactly `entries`, applied in
    /// order. On failure the previous set is left as it was.
    fn replace(&self, key: &str, entries: &[RawEntry]) -> Result<(), StoreError>;

    /// Atomically replaces whatever is stored under `new_key` with a copy of
    /// the set under `key`.
    fn copy_snapshot(&self, key: &str, new_key: &str) -> Result<(), StoreError>;
}
