use core::fmt;

use tracing::debug;

use crate::error::Result;
use crate::member::Member;
use crate::range_spec::RangeSpec;
use crate::score::IntoScore;
use crate::store::{OrderedStore, RawEntry};

mod iter;
mod windowed;

pub use iter::Iter;

/// A counter-like collection of unique members, each with a score, kept
/// sorted by score (ties broken by the member's encoded bytes).
///
/// The handle owns no entries. It names one sorted set inside an
/// [`OrderedStore`] and every call goes to the store, so any number of
/// handles, in this process or others, may share a key and always observe
/// the store's current state. Single operations are atomic; sequences of
/// operations are not.
///
/// # Examples
///
/// ```
/// use sorted_set_counter::{MemoryStore, RangeSpec, SortedSetCounter};
///
/// let store = MemoryStore::new();
/// let ladder = SortedSetCounter::with_data(&store, "ladder", [("a", 1.0), ("b", 2.0), ("c", 4.0), ("d", 8.0)])?;
///
/// ladder.increment_score("a", 10)?;
/// assert_eq!(ladder.get_score("a")?, Some(11.0));
///
/// // Ranks 1..=3 that also score at most 8, highest first.
/// let window = RangeSpec::new().ranks(1, 3).max_score(8.0).reverse(true);
/// let members: Vec<_> = ladder.items(&window)?.into_iter().map(|(member, _)| member.to_string()).collect();
/// assert_eq!(members, ["'d'", "'c'"]);
/// # Ok::<(), sorted_set_counter::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct SortedSetCounter<S> {
    key: String,
    store: S,
}

/// Generates a fresh 128-bit key, rendered as 32 hex digits.
fn random_key() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn encode_entries<I, M, V>(source: I) -> Result<Vec<RawEntry>>
where
    I: IntoIterator<Item = (M, V)>,
    M: Into<Member>,
    V: IntoScore,
{
    source
        .into_iter()
        .map(|(member, score)| Ok((member.into().encode(), score.into_score()?)))
        .collect()
}

pub(crate) fn decode_entries(raw: Vec<RawEntry>) -> Result<Vec<(Member, f64)>> {
    raw.into_iter()
        .map(|(member, score)| Ok((Member::decode(&member)?, score)))
        .collect()
}

impl<S: OrderedStore> SortedSetCounter<S> {
    /// Binds a handle to the sorted set stored under `key`. Existing data is
    /// left untouched.
    #[must_use]
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self { key: key.into(), store }
    }

    /// Binds a handle to a fresh, randomly named key.
    #[must_use]
    pub fn with_random_key(store: S) -> Self {
        Self::new(store, random_key())
    }

    /// Binds a handle to `key` and replaces whatever is stored there with
    /// `data`, in one atomic request. Later pairs win over earlier ones for
    /// the same member.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeConversion`](crate::Error::TypeConversion) if a
    /// score is invalid, before the store is touched, or with a store error,
    /// in which case the previous contents of `key` are left in place.
    pub fn with_data<I, M, V>(store: S, key: impl Into<String>, data: I) -> Result<Self>
    where
        I: IntoIterator<Item = (M, V)>,
        M: Into<Member>,
        V: IntoScore,
    {
        let counter = Self::new(store, key);
        let entries = encode_entries(data)?;
        counter.store.replace(&counter.key, &entries)?;
        debug!(key = %counter.key, entries = entries.len(), "seeded sorted set");
        Ok(counter)
    }

    /// The key this handle addresses.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The store every call goes to.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of members.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn len(&self) -> Result<usize> {
        Ok(self.store.size(&self.key)?)
    }

    /// # Errors
    ///
    /// Propagates store failures.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether `member` is present. No numeric coercion happens: `1` and
    /// `1.0` are different members.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn contains(&self, member: impl Into<Member>) -> Result<bool> {
        Ok(self.get_score(member)?.is_some())
    }

    /// The score of `member`, or `None` if it is absent.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn get_score(&self, member: impl Into<Member>) -> Result<Option<f64>> {
        Ok(self.store.score_of(&self.key, &member.into().encode())?)
    }

    /// The score of `member`, or `default` if it is absent.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn get_score_or(&self, member: impl Into<Member>, default: f64) -> Result<f64> {
        Ok(self.get_score(member)?.unwrap_or(default))
    }

    /// Inserts `member`, or overwrites its score.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeConversion`](crate::Error::TypeConversion) if
    /// `score` is not a real number, or with a store error.
    pub fn set_score(&self, member: impl Into<Member>, score: impl IntoScore) -> Result<()> {
        let score = score.into_score()?;
        Ok(self.store.put(&self.key, &member.into().encode(), score)?)
    }

    /// Atomically adds `amount` to the score of `member`, treating an absent
    /// member as scoring `0`, and returns the new score.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeConversion`](crate::Error::TypeConversion) if
    /// `amount` is not a real number, with
    /// [`Error::StoreInconsistency`](crate::Error::StoreInconsistency) if the
    /// stored score cannot take part in the addition, or with a store error.
    pub fn increment_score(&self, member: impl Into<Member>, amount: impl IntoScore) -> Result<f64> {
        let amount = amount.into_score()?;
        Ok(self.store.incr(&self.key, &member.into().encode(), amount)?)
    }

    /// Removes `member`. Removing an absent member does nothing.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn discard_member(&self, member: impl Into<Member>) -> Result<()> {
        Ok(self.store.remove(&self.key, &member.into().encode())?)
    }

    /// Zero-based position of `member` in ascending order, or in descending
    /// order if `reverse` is set. `None` if the member is absent.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn get_rank(&self, member: impl Into<Member>, reverse: bool) -> Result<Option<usize>> {
        Ok(self.store.rank_of(&self.key, &member.into().encode(), reverse)?)
    }

    /// Upserts every `(member, score)` pair of `source` in one batch. Later
    /// pairs win over earlier ones for the same member. Maps, vectors and
    /// arrays of pairs are all accepted.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeConversion`](crate::Error::TypeConversion) if
    /// any score is invalid, in which case nothing is written, or with a
    /// store error, in which case the caller should assume nothing was
    /// written.
    pub fn update<I, M, V>(&self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = (M, V)>,
        M: Into<Member>,
        V: IntoScore,
    {
        let entries = encode_entries(source)?;
        if entries.is_empty() {
            return Ok(());
        }
        self.store.put_many(&self.key, &entries)?;
        debug!(key = %self.key, entries = entries.len(), "updated sorted set");
        Ok(())
    }

    /// Upserts every entry of another counter, which may live in a different
    /// store.
    ///
    /// # Errors
    ///
    /// Propagates store failures from either side.
    pub fn update_from<T: OrderedStore>(&self, other: &SortedSetCounter<T>) -> Result<()> {
        let entries = other.store.range_by_rank(&other.key, 0, -1, false)?;
        if entries.is_empty() {
            return Ok(());
        }
        self.store.put_many(&self.key, &entries)?;
        debug!(key = %self.key, source = %other.key, entries = entries.len(), "updated sorted set from another");
        Ok(())
    }

    /// Removes every member.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn clear(&self) -> Result<()> {
        Ok(self.store.clear(&self.key)?)
    }

    /// Snapshots the current entries under `key` (or a fresh random key) and
    /// returns a handle to the copy, which evolves independently afterwards.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn copy(&self, key: Option<&str>) -> Result<Self>
    where
        S: Clone,
    {
        let new_key = key.map_or_else(random_key, ToOwned::to_owned);
        if new_key != self.key {
            self.store.copy_snapshot(&self.key, &new_key)?;
        }
        debug!(key = %self.key, copy = %new_key, "copied sorted set");
        Ok(Self::new(self.store.clone(), new_key))
    }

    /// Lazily walks `(member, score)` pairs in ascending order.
    ///
    /// Entries are fetched from the store in chunks as the iterator advances,
    /// so writes made while iterating may or may not be seen. Every call
    /// starts over from the current state.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, S> {
        Iter::new(self)
    }
}

/// Renders every entry in ascending order, e.g. `{'zero': 0.0, 'one': 1.0}`.
///
/// Scores print at full precision. A store failure surfaces as
/// [`fmt::Error`].
impl<S: OrderedStore> fmt::Display for SortedSetCounter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.items(&RangeSpec::new()).map_err(|_| fmt::Error)?;

        f.write_str("{")?;
        for (i, (member, score)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{member}: {score:?}")?;
        }
        f.write_str("}")
    }
}

impl<'a, S: OrderedStore> IntoIterator for &'a SortedSetCounter<S> {
    type Item = Result<(Member, f64)>;
    type IntoIter = Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
