use core::iter::FusedIterator;
use std::vec;

use super::SortedSetCounter;
use crate::error::Result;
use crate::member::Member;
use crate::store::{OrderedStore, RawEntry};

/// Entries fetched per store round trip.
const CHUNK: usize = 128;

/// Lazy ascending iterator over a [`SortedSetCounter`].
///
/// Created by [`SortedSetCounter::iter`]. Fetches entries by rank in chunks;
/// after an error it yields that error once and then stops.
#[derive(Debug)]
pub struct Iter<'a, S> {
    counter: &'a SortedSetCounter<S>,
    next_rank: usize,
    buffer: vec::IntoIter<RawEntry>,
    exhausted: bool,
}

impl<'a, S: OrderedStore> Iter<'a, S> {
    pub(super) fn new(counter: &'a SortedSetCounter<S>) -> Self {
        Self {
            counter,
            next_rank: 0,
            buffer: Vec::new().into_iter(),
            exhausted: false,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let start = isize::try_from(self.next_rank).unwrap_or(isize::MAX);
        let stop = isize::try_from(self.next_rank + CHUNK - 1).unwrap_or(isize::MAX);
        let chunk = self.counter.store.range_by_rank(&self.counter.key, start, stop, false)?;

        if chunk.len() < CHUNK {
            self.exhausted = true;
        }
        self.next_rank += chunk.len();
        self.buffer = chunk.into_iter();
        Ok(())
    }
}

impl<S: OrderedStore> Iterator for Iter<'_, S> {
    type Item = Result<(Member, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((member, score)) = self.buffer.next() {
                return Some(Member::decode(&member).map(|member| (member, score)));
            }
            if self.exhausted {
                return None;
            }
            if let Err(error) = self.refill() {
                self.exhausted = true;
                return Some(Err(error));
            }
        }
    }
}

impl<S: OrderedStore> FusedIterator for Iter<'_, S> {}

#[cfg(test)]
mod tests {
    use crate::{MemoryStore, SortedSetCounter};

    #[test]
    fn walks_across_chunk_boundaries() {
        let store = MemoryStore::new();
        let counter = SortedSetCounter::with_data(&store, "big", (0..300).map(|i| (i, i))).unwrap();

        let scores: Vec<f64> = counter.iter().map(|entry| entry.unwrap().1).collect();
        assert_eq!(scores.len(), 300);
        assert!(scores.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn exact_multiple_of_chunk_terminates() {
        let store = MemoryStore::new();
        let counter = SortedSetCounter::with_data(&store, "even", (0..256).map(|i| (i, -i))).unwrap();
        assert_eq!(counter.iter().count(), 256);
    }

    #[test]
    fn each_iteration_rereads_the_store() {
        let store = MemoryStore::new();
        let counter = SortedSetCounter::with_data(&store, "live", [("a", 1.0)]).unwrap();
        assert_eq!(counter.iter().count(), 1);

        counter.set_score("b", 2.0).unwrap();
        assert_eq!((&counter).into_iter().count(), 2);
    }
}
