use tracing::{debug, trace};

use super::{SortedSetCounter, decode_entries};
use crate::error::Result;
use crate::member::Member;
use crate::range_spec::{Plan, Query, RangeSpec, intersect};
use crate::store::{OrderedStore, RawEntry, StoreError};

impl<S: OrderedStore> SortedSetCounter<S> {
    fn run(&self, query: Query) -> Result<Vec<RawEntry>, StoreError> {
        match query {
            Query::Rank { start, stop, reverse } => self.store.range_by_rank(&self.key, start, stop, reverse),
            Query::Score { min, max, reverse } => self.store.range_by_score(&self.key, min, max, reverse),
        }
    }

    /// Fetches the raw entries selected by `spec`, in report order.
    fn resolve(&self, spec: &RangeSpec) -> Result<Vec<RawEntry>> {
        let plan = spec.plan()?;
        trace!(key = %self.key, ?plan, "resolving range");

        match plan {
            Plan::Single(query) => Ok(self.run(query)?),
            Plan::Intersect { ranks, scores } => {
                let rank_window = self.run(ranks)?;
                if rank_window.is_empty() {
                    return Ok(Vec::new());
                }
                let score_window = self.run(scores)?;
                Ok(intersect(&rank_window, score_window, spec.reverse))
            }
        }
    }

    /// The entries matching every bound of `spec`, in ascending order or, with
    /// `spec.reverse`, descending.
    ///
    /// When both rank and score bounds are given, an entry must sit inside
    /// the rank window *and* inside the score window.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeConversion`](crate::Error::TypeConversion) for a
    /// NaN score bound, [`Error::Decode`](crate::Error::Decode) for a member
    /// the store mangled, or with a store error.
    pub fn items(&self, spec: &RangeSpec) -> Result<Vec<(Member, f64)>> {
        decode_entries(self.resolve(spec)?)
    }

    /// Number of entries scoring within `min_score..=max_score`; an open
    /// bound is unbounded. An inverted range counts `0`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeConversion`](crate::Error::TypeConversion) for a
    /// NaN bound, or with a store error.
    pub fn count_between(&self, min_score: Option<f64>, max_score: Option<f64>) -> Result<usize> {
        let spec = RangeSpec {
            min_score,
            max_score,
            ..RangeSpec::default()
        };
        self.count(&spec)
    }

    /// Number of entries `spec` selects.
    ///
    /// Rank-only and score-only specs are answered without transferring any
    /// entries; combined specs have to fetch both windows.
    ///
    /// # Errors
    ///
    /// Same as [`items`](Self::items).
    pub fn count(&self, spec: &RangeSpec) -> Result<usize> {
        match spec.plan()? {
            Plan::Single(Query::Rank { .. }) => Ok(spec.rank_window_len(self.len()?)),
            Plan::Single(Query::Score { min, max, .. }) => Ok(self.store.count_by_score(&self.key, min, max)?),
            Plan::Intersect { .. } => Ok(self.resolve(spec)?.len()),
        }
    }

    /// Removes every entry `spec` selects and returns how many were removed.
    /// `spec.reverse` has no effect on what is removed.
    ///
    /// Matches are collected first and then removed with a single atomic
    /// request, so no reader observes a partial removal. A member written
    /// between those two steps that would also have matched survives.
    ///
    /// # Errors
    ///
    /// Same as [`items`](Self::items). If the removal request fails, assume
    /// nothing was removed.
    pub fn discard_between(&self, spec: &RangeSpec) -> Result<usize> {
        let members: Vec<Vec<u8>> = self
            .resolve(&spec.ascending())?
            .into_iter()
            .map(|(member, _)| member)
            .collect();
        if members.is_empty() {
            return Ok(0);
        }

        self.store.remove_many(&self.key, &members)?;
        debug!(key = %self.key, removed = members.len(), "discarded range");
        Ok(members.len())
    }

    /// The `n` highest-scoring entries, highest first; every entry if `n` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Same as [`items`](Self::items).
    pub fn most_common(&self, n: Option<usize>) -> Result<Vec<(Member, f64)>> {
        let spec = match n {
            None => RangeSpec::new().reverse(true),
            Some(0) => return Ok(Vec::new()),
            Some(n) => {
                let n = isize::try_from(n).unwrap_or(isize::MAX);
                RangeSpec::new().ranks(-n, -1).reverse(true)
            }
        };
        self.items(&spec)
    }
}
