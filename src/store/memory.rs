use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::RwLock;

use super::{OrderedStore, RawEntry, StoreError};
use crate::range_spec::rank_window;
use crate::raw::RankTree;

/// An in-process [`OrderedStore`].
///
/// Each sorted set pairs a member-to-score map with an order-statistic tree
/// over `(score, member)`, so point lookups are O(1) and rank or score
/// windows cost O(log n + k). Every primitive runs under a single lock and is
/// therefore atomic with respect to other handles sharing the store.
///
/// # Examples
///
/// ```
/// use sorted_set_counter::{MemoryStore, SortedSetCounter};
///
/// let store = MemoryStore::new();
/// let scores = SortedSetCounter::new(&store, "scores");
/// scores.set_score("alice", 3.0)?;
/// scores.set_score("bob", 1.0)?;
///
/// assert_eq!(scores.get_rank("alice", false)?, Some(1));
/// # Ok::<(), sorted_set_counter::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: RwLock<HashMap<String, ScoredSet>>,
}

#[derive(Clone, Debug)]
struct ScoredSet {
    scores: HashMap<Vec<u8>, f64>,
    order: RankTree<Entry>,
}

#[derive(Clone, Debug)]
struct Entry {
    score: f64,
    member: Vec<u8>,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score).then_with(|| self.member.cmp(&other.member))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl Entry {
    fn to_raw(&self) -> RawEntry {
        (self.member.clone(), self.score)
    }
}

/// Folds `-0.0` into `0.0` so both sort as the same score.
fn normalize(score: f64) -> f64 {
    score + 0.0
}

impl ScoredSet {
    fn new() -> Self {
        Self {
            scores: HashMap::new(),
            order: RankTree::new(),
        }
    }

    fn upsert(&mut self, member: &[u8], score: f64) {
        let score = normalize(score);
        if let Some(previous) = self.scores.insert(member.to_vec(), score) {
            self.order.remove(&Entry {
                score: previous,
                member: member.to_vec(),
            });
        }
        self.order.insert(Entry {
            score,
            member: member.to_vec(),
        });
    }

    fn remove(&mut self, member: &[u8]) {
        if let Some((member, score)) = self.scores.remove_entry(member) {
            self.order.remove(&Entry { score, member });
        }
    }

    fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn rank_of(&self, member: &[u8], reverse: bool) -> Option<usize> {
        let score = *self.scores.get(member)?;
        let rank = self.order.rank_of(&Entry {
            score,
            member: member.to_vec(),
        })?;
        Some(if reverse { self.order.len() - 1 - rank } else { rank })
    }

    fn range_by_rank(&self, start: isize, stop: isize, reverse: bool) -> Vec<RawEntry> {
        let len = self.order.len();
        let Some(window) = rank_window(start, stop, len) else {
            return Vec::new();
        };

        if reverse {
            // Descending positions `a..b` are ascending positions
            // `len - b..len - a`, walked backwards.
            let entries = self.order.slice(len - window.end, len - window.start);
            entries.into_iter().rev().map(Entry::to_raw).collect()
        } else {
            let entries = self.order.slice(window.start, window.end);
            entries.into_iter().map(Entry::to_raw).collect()
        }
    }

    /// Ascending position range of the entries with `min <= score <= max`.
    fn score_window(&self, min: f64, max: f64) -> (usize, usize) {
        let start = self.order.partition_point(|entry| entry.score < min);
        let end = self.order.partition_point(|entry| entry.score <= max);
        (start, end.max(start))
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty sorted sets currently held.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.sets.read().len()
    }

    fn read<T>(&self, key: &str, f: impl FnOnce(&ScoredSet) -> T) -> Option<T> {
        self.sets.read().get(key).map(f)
    }

    fn write<T>(&self, key: &str, f: impl FnOnce(&mut ScoredSet) -> T) -> T {
        let mut sets = self.sets.write();
        let set = sets.entry(key.to_owned()).or_insert_with(ScoredSet::new);
        let result = f(set);
        // An emptied set disappears along with its key.
        if set.is_empty() {
            sets.remove(key);
        }
        result
    }
}

impl OrderedStore for MemoryStore {
    fn put(&self, key: &str, member: &[u8], score: f64) -> Result<(), StoreError> {
        self.write(key, |set| set.upsert(member, score));
        Ok(())
    }

    fn put_many(&self, key: &str, entries: &[RawEntry]) -> Result<(), StoreError> {
        self.write(key, |set| {
            for (member, score) in entries {
                set.upsert(member, *score);
            }
        });
        Ok(())
    }

    fn incr(&self, key: &str, member: &[u8], amount: f64) -> Result<f64, StoreError> {
        self.write(key, |set| {
            let current = set.scores.get(member).copied().unwrap_or(0.0);
            let score = current + amount;
            if score.is_nan() {
                return Err(StoreError::Inconsistent(format!(
                    "incrementing {current} by {amount} does not produce a number"
                )));
            }
            set.upsert(member, score);
            Ok(normalize(score))
        })
    }

    fn remove(&self, key: &str, member: &[u8]) -> Result<(), StoreError> {
        self.write(key, |set| set.remove(member));
        Ok(())
    }

    fn remove_many(&self, key: &str, members: &[Vec<u8>]) -> Result<(), StoreError> {
        self.write(key, |set| {
            for member in members {
                set.remove(member);
            }
        });
        Ok(())
    }

    fn score_of(&self, key: &str, member: &[u8]) -> Result<Option<f64>, StoreError> {
        Ok(self.read(key, |set| set.scores.get(member).copied()).flatten())
    }

    fn rank_of(&self, key: &str, member: &[u8], reverse: bool) -> Result<Option<usize>, StoreError> {
        Ok(self.read(key, |set| set.rank_of(member, reverse)).flatten())
    }

    fn size(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.read(key, |set| set.order.len()).unwrap_or(0))
    }

    fn range_by_rank(&self, key: &str, start: isize, stop: isize, reverse: bool) -> Result<Vec<RawEntry>, StoreError> {
        Ok(self.read(key, |set| set.range_by_rank(start, stop, reverse)).unwrap_or_default())
    }

    fn range_by_score(&self, key: &str, min: f64, max: f64, reverse: bool) -> Result<Vec<RawEntry>, StoreError> {
        Ok(self
            .read(key, |set| {
                let (start, end) = set.score_window(min, max);
                let entries = set.order.slice(start, end);
                if reverse {
                    entries.into_iter().rev().map(Entry::to_raw).collect()
                } else {
                    entries.into_iter().map(Entry::to_raw).collect()
                }
            })
            .unwrap_or_default())
    }

    fn count_by_score(&self, key: &str, min: f64, max: f64) -> Result<usize, StoreError> {
        Ok(self
            .read(key, |set| {
                let (start, end) = set.score_window(min, max);
                end - start
            })
            .unwrap_or(0))
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.sets.write().remove(key);
        Ok(())
    }

    fn replace(&self, key: &str, entries: &[RawEntry]) -> Result<(), StoreError> {
        let mut set = ScoredSet::new();
        for (member, score) in entries {
            set.upsert(member, *score);
        }

        let mut sets = self.sets.write();
        if set.is_empty() {
            sets.remove(key);
        } else {
            sets.insert(key.to_owned(), set);
        }
        Ok(())
    }

    fn copy_snapshot(&self, key: &str, new_key: &str) -> Result<(), StoreError> {
        let mut sets = self.sets.write();
        match sets.get(key).cloned() {
            Some(snapshot) => {
                sets.insert(new_key.to_owned(), snapshot);
            }
            None => {
                sets.remove(new_key);
            }
        }
        Ok(())
    }
}
