//! Translation of rank and score bounds into store queries.
//!
//! Nothing here performs I/O. A [`RangeSpec`] is turned into a [`Plan`] of one
//! or two primitive [`Query`]s; when both axes are bounded, the two fetched
//! windows are combined with [`intersect`].

use std::collections::HashSet;
use std::hash::Hash;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A possibly partial set of rank and score bounds.
///
/// All bounds are inclusive and any of them may be left open. Ranks index the
/// ascending order and may be negative, counting from the end as in sequence
/// slicing (`-1` is the last entry). `reverse` only flips the order in which
/// matches are reported; it never changes which entries match.
///
/// # Examples
///
/// ```
/// use sorted_set_counter::RangeSpec;
///
/// // The second through the second-to-last entries, if they score at least 4.
/// let spec = RangeSpec::new().min_rank(1).max_rank(-2).min_score(4.0);
/// assert_eq!(spec.min_rank, Some(1));
/// assert!(!spec.reverse);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeSpec {
    pub min_rank: Option<isize>,
    pub max_rank: Option<isize>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub reverse: bool,
}

/// A single primitive range request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Query {
    /// Inclusive rank window, in store rank semantics.
    Rank { start: isize, stop: isize, reverse: bool },
    /// Inclusive score window.
    Score { min: f64, max: f64, reverse: bool },
}

/// How to obtain the entries selected by a [`RangeSpec`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Plan {
    /// One query yields the answer directly, already in report order.
    Single(Query),
    /// Run both ascending queries, then [`intersect`] their results.
    Intersect { ranks: Query, scores: Query },
}

impl RangeSpec {
    /// An unbounded spec: every entry, ascending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest rank to include; negative counts from the end.
    #[must_use]
    pub fn min_rank(mut self, rank: isize) -> Self {
        self.min_rank = Some(rank);
        self
    }

    /// Highest rank to include; negative counts from the end.
    #[must_use]
    pub fn max_rank(mut self, rank: isize) -> Self {
        self.max_rank = Some(rank);
        self
    }

    /// Lowest score to include.
    #[must_use]
    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = Some(score);
        self
    }

    /// Highest score to include.
    #[must_use]
    pub fn max_score(mut self, score: f64) -> Self {
        self.max_score = Some(score);
        self
    }

    /// Sets both rank bounds.
    #[must_use]
    pub fn ranks(self, min: isize, max: isize) -> Self {
        self.min_rank(min).max_rank(max)
    }

    /// Sets both score bounds.
    #[must_use]
    pub fn scores(self, min: f64, max: f64) -> Self {
        self.min_score(min).max_score(max)
    }

    /// Report entries highest score first. Selection is unaffected.
    #[must_use]
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Whether either rank bound is set.
    #[must_use]
    pub fn has_rank_bounds(&self) -> bool {
        self.min_rank.is_some() || self.max_rank.is_some()
    }

    /// Whether either score bound is set.
    #[must_use]
    pub fn has_score_bounds(&self) -> bool {
        self.min_score.is_some() || self.max_score.is_some()
    }

    fn rank_bounds(&self) -> (isize, isize) {
        (self.min_rank.unwrap_or(0), self.max_rank.unwrap_or(-1))
    }

    fn score_bounds(&self) -> Result<(f64, f64)> {
        let min = self.min_score.unwrap_or(f64::NEG_INFINITY);
        let max = self.max_score.unwrap_or(f64::INFINITY);
        for bound in [min, max] {
            if bound.is_nan() {
                return Err(Error::TypeConversion {
                    value: bound.to_string(),
                });
            }
        }
        Ok((min, max))
    }

    /// Resolves these bounds into primitive store queries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeConversion`] if a score bound is NaN.
    pub fn plan(&self) -> Result<Plan> {
        let (start, stop) = self.rank_bounds();

        if !self.has_score_bounds() {
            let query = if self.reverse {
                // Ascending index `i` is descending index `-i - 1` (`!i`), so
                // this descending window holds exactly the ascending one.
                Query::Rank {
                    start: !stop,
                    stop: !start,
                    reverse: true,
                }
            } else {
                Query::Rank {
                    start,
                    stop,
                    reverse: false,
                }
            };
            return Ok(Plan::Single(query));
        }

        let (min, max) = self.score_bounds()?;
        if !self.has_rank_bounds() {
            return Ok(Plan::Single(Query::Score {
                min,
                max,
                reverse: self.reverse,
            }));
        }

        Ok(Plan::Intersect {
            ranks: Query::Rank {
                start,
                stop,
                reverse: false,
            },
            scores: Query::Score {
                min,
                max,
                reverse: false,
            },
        })
    }

    /// Number of entries a rank-only spec selects from a set of `len`
    /// entries.
    #[must_use]
    pub fn rank_window_len(&self, len: usize) -> usize {
        let (start, stop) = self.rank_bounds();
        rank_window(start, stop, len).map_or(0, |window| window.len())
    }

    /// The same selection, reported in ascending order.
    #[must_use]
    pub fn ascending(self) -> Self {
        self.reverse(false)
    }
}

/// Resolves an inclusive `start..=stop` rank window over `len` entries into a
/// half-open range of positions.
///
/// Negative ranks are first offset by `len`; the result is then clamped to the
/// valid positions. Returns `None` when nothing is selected.
///
/// ```
/// use sorted_set_counter::range_spec::rank_window;
///
/// assert_eq!(rank_window(1, -2, 6), Some(1..5));
/// assert_eq!(rank_window(-100, 2, 6), Some(0..3));
/// assert_eq!(rank_window(4, 1, 6), None);
/// ```
#[must_use]
pub fn rank_window(start: isize, stop: isize, len: usize) -> Option<Range<usize>> {
    let len = isize::try_from(len).ok()?;
    if len == 0 {
        return None;
    }

    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }

    Some(usize::try_from(start).ok()?..usize::try_from(stop).ok()? + 1)
}

/// Keeps the entries of `score_window` whose member also appears in
/// `rank_window`.
///
/// Both inputs are ascending; the result keeps the score window's order and
/// scores, and is reversed last when `reverse` is set.
pub fn intersect<M, S>(rank_window: &[(M, S)], score_window: Vec<(M, S)>, reverse: bool) -> Vec<(M, S)>
where
    M: Eq + Hash,
{
    let in_rank_window: HashSet<&M> = rank_window.iter().map(|(member, _)| member).collect();
    let mut matches: Vec<(M, S)> = score_window
        .into_iter()
        .filter(|(member, _)| in_rank_window.contains(member))
        .collect();

    if reverse {
        matches.reverse();
    }
    matches
}
