use smallvec::smallvec;

use super::node::{Internal, Leaf, MAX_CHILDREN, MAX_LEAF_KEYS, Node};
use super::pool::{NodeId, NodePool};

/// An order-statistic B+tree set.
///
/// Internal nodes carry the size of every child subtree, which makes rank
/// lookups, rank-to-key lookups and rank slicing O(log n).
#[derive(Clone, Debug)]
pub(crate) struct RankTree<K> {
    nodes: NodePool<Node<K>>,
    root: Option<NodeId>,
    len: usize,
}

/// Outcome of inserting into a subtree.
enum Insertion<K> {
    /// The key was already present.
    Present,
    /// The key was added without splitting this subtree's root.
    Fit,
    /// The subtree root split; the parent must adopt `right`.
    Split { separator: K, right: NodeId },
}

impl<K> RankTree<K> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: NodePool::new(),
            root: None,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }
}

impl<K: Clone + Ord> RankTree<K> {
    /// Adds `key`. Returns `false` if it was already present.
    pub(crate) fn insert(&mut self, key: K) -> bool {
        let Some(root) = self.root else {
            self.root = Some(self.nodes.insert(Node::Leaf(Leaf::with_key(key))));
            self.len = 1;
            return true;
        };

        match self.insert_into(root, key) {
            Insertion::Present => return false,
            Insertion::Fit => {}
            Insertion::Split { separator, right } => {
                let sizes = smallvec![self.nodes.get(root).size(), self.nodes.get(right).size()];
                let new_root = Internal {
                    separators: smallvec![separator],
                    children: smallvec![root, right],
                    sizes,
                };
                self.root = Some(self.nodes.insert(Node::Internal(new_root)));
            }
        }

        self.len += 1;
        true
    }

    fn insert_into(&mut self, id: NodeId, key: K) -> Insertion<K> {
        let (index, child) = match self.nodes.get_mut(id) {
            Node::Leaf(leaf) => {
                let Err(position) = leaf.keys.binary_search(&key) else {
                    return Insertion::Present;
                };
                leaf.keys.insert(position, key);
                if leaf.keys.len() <= MAX_LEAF_KEYS {
                    return Insertion::Fit;
                }

                let (separator, right) = leaf.split();
                let right = self.nodes.insert(Node::Leaf(right));
                return Insertion::Split { separator, right };
            }
            Node::Internal(internal) => {
                let index = internal.route(&key);
                (index, internal.children[index])
            }
        };

        match self.insert_into(child, key) {
            Insertion::Present => Insertion::Present,
            Insertion::Fit => {
                self.nodes.get_mut(id).as_internal_mut().sizes[index] += 1;
                Insertion::Fit
            }
            Insertion::Split { separator, right } => {
                let left_size = self.nodes.get(child).size();
                let right_size = self.nodes.get(right).size();

                let internal = self.nodes.get_mut(id).as_internal_mut();
                internal.sizes[index] = left_size;
                internal.separators.insert(index, separator);
                internal.children.insert(index + 1, right);
                internal.sizes.insert(index + 1, right_size);
                if internal.children.len() <= MAX_CHILDREN {
                    return Insertion::Fit;
                }

                let (separator, right) = internal.split();
                let right = self.nodes.insert(Node::Internal(right));
                Insertion::Split { separator, right }
            }
        }
    }

    /// Removes `key`. Returns `false` if it was not present.
    pub(crate) fn remove(&mut self, key: &K) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        if !self.remove_from(root, key) {
            return false;
        }
        self.len -= 1;

        // Shrink the tree from the top once the root runs dry.
        match self.nodes.get(root) {
            Node::Internal(internal) if internal.children.len() == 1 => {
                let only_child = internal.children[0];
                self.nodes.remove(root);
                self.root = Some(only_child);
            }
            Node::Leaf(leaf) if leaf.keys.is_empty() => {
                self.nodes.remove(root);
                self.root = None;
            }
            _ => {}
        }

        true
    }

    fn remove_from(&mut self, id: NodeId, key: &K) -> bool {
        let (index, child) = match self.nodes.get_mut(id) {
            Node::Leaf(leaf) => {
                return match leaf.keys.binary_search(key) {
                    Ok(position) => {
                        leaf.keys.remove(position);
                        true
                    }
                    Err(_) => false,
                };
            }
            Node::Internal(internal) => {
                let index = internal.route(key);
                (index, internal.children[index])
            }
        };

        if !self.remove_from(child, key) {
            return false;
        }

        self.nodes.get_mut(id).as_internal_mut().sizes[index] -= 1;
        if self.nodes.get(child).is_underfull() {
            self.rebalance(id, index);
        }
        true
    }

    /// Restores minimum occupancy of `parent.children[index]` by borrowing
    /// from a sibling, or by merging with one when neither can spare a key.
    fn rebalance(&mut self, parent: NodeId, index: usize) {
        let (left, right) = {
            let internal = self.nodes.get(parent).as_internal();
            let left = index.checked_sub(1).map(|i| internal.children[i]);
            let right = internal.children.get(index + 1).copied();
            (left, right)
        };

        if let Some(left) = left
            && self.nodes.get(left).can_lend()
        {
            self.borrow_from_left(parent, index);
        } else if let Some(right) = right
            && self.nodes.get(right).can_lend()
        {
            self.borrow_from_right(parent, index);
        } else if left.is_some() {
            self.merge(parent, index - 1);
        } else if right.is_some() {
            self.merge(parent, index);
        }
    }

    fn borrow_from_left(&mut self, parent: NodeId, index: usize) {
        let (left, node, parent_separator) = {
            let internal = self.nodes.get(parent).as_internal();
            (internal.children[index - 1], internal.children[index], internal.separators[index - 1].clone())
        };

        let (moved, new_separator) = match self.nodes.pair_mut(left, node) {
            (Node::Leaf(left), Node::Leaf(node)) => {
                let key = left.keys.pop().expect("lending leaf is empty");
                node.keys.insert(0, key);
                let new_max = left.keys.last().cloned().expect("lending leaf is empty");
                (1, new_max)
            }
            (Node::Internal(left), Node::Internal(node)) => {
                let child = left.children.pop().expect("lending node has no children");
                let size = left.sizes.pop().expect("lending node has no children");
                let bound = left.separators.pop().expect("lending node has no separators");
                node.children.insert(0, child);
                node.sizes.insert(0, size);
                node.separators.insert(0, parent_separator);
                (size, bound)
            }
            _ => unreachable!("siblings at different depths"),
        };

        let internal = self.nodes.get_mut(parent).as_internal_mut();
        internal.separators[index - 1] = new_separator;
        internal.sizes[index - 1] -= moved;
        internal.sizes[index] += moved;
    }

    fn borrow_from_right(&mut self, parent: NodeId, index: usize) {
        let (node, right, parent_separator) = {
            let internal = self.nodes.get(parent).as_internal();
            (internal.children[index], internal.children[index + 1], internal.separators[index].clone())
        };

        let (moved, new_separator) = match self.nodes.pair_mut(node, right) {
            (Node::Leaf(node), Node::Leaf(right)) => {
                let key = right.keys.remove(0);
                node.keys.push(key.clone());
                (1, key)
            }
            (Node::Internal(node), Node::Internal(right)) => {
                let child = right.children.remove(0);
                let size = right.sizes.remove(0);
                let bound = right.separators.remove(0);
                node.separators.push(parent_separator);
                node.children.push(child);
                node.sizes.push(size);
                (size, bound)
            }
            _ => unreachable!("siblings at different depths"),
        };

        let internal = self.nodes.get_mut(parent).as_internal_mut();
        internal.separators[index] = new_separator;
        internal.sizes[index] += moved;
        internal.sizes[index + 1] -= moved;
    }

    /// Folds `parent.children[index + 1]` into `parent.children[index]`.
    fn merge(&mut self, parent: NodeId, index: usize) {
        let (left, right, separator) = {
            let internal = self.nodes.get_mut(parent).as_internal_mut();
            let separator = internal.separators.remove(index);
            let right = internal.children.remove(index + 1);
            let right_size = internal.sizes.remove(index + 1);
            internal.sizes[index] += right_size;
            (internal.children[index], right, separator)
        };

        let right = self.nodes.remove(right);
        match (self.nodes.get_mut(left), right) {
            (Node::Leaf(left), Node::Leaf(right)) => left.keys.extend(right.keys),
            (Node::Internal(left), Node::Internal(right)) => {
                left.separators.push(separator);
                left.separators.extend(right.separators);
                left.children.extend(right.children);
                left.sizes.extend(right.sizes);
            }
            _ => unreachable!("siblings at different depths"),
        }
    }

    /// Returns the zero-based rank of `key`, or `None` if it is absent.
    pub(crate) fn rank_of(&self, key: &K) -> Option<usize> {
        let mut current = self.root?;
        let mut rank = 0;

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    let index = internal.route(key);
                    rank += internal.sizes[..index].iter().sum::<usize>();
                    current = internal.children[index];
                }
                Node::Leaf(leaf) => return leaf.keys.binary_search(key).ok().map(|position| rank + position),
            }
        }
    }

    /// Returns the key at `rank`, or `None` if `rank` is out of bounds.
    #[cfg(test)]
    pub(crate) fn get_by_rank(&self, rank: usize) -> Option<&K> {
        if rank >= self.len {
            return None;
        }

        let mut current = self.root?;
        let mut remaining = rank;

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    let index = internal.sizes.iter().position(|&size| {
                        if remaining < size {
                            true
                        } else {
                            remaining -= size;
                            false
                        }
                    })?;
                    current = internal.children[index];
                }
                Node::Leaf(leaf) => return leaf.keys.get(remaining),
            }
        }
    }

    /// Number of leading keys for which `pred` holds.
    ///
    /// `pred` must be monotone over the key order: once it is false for some
    /// key it must be false for every greater key.
    pub(crate) fn partition_point<P>(&self, pred: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let Some(mut current) = self.root else {
            return 0;
        };
        let mut rank = 0;

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    // Every key under a child is <= its separator, so a
                    // separator satisfying `pred` vouches for the whole child.
                    let index = internal.separators.partition_point(|separator| pred(separator));
                    rank += internal.sizes[..index].iter().sum::<usize>();
                    current = internal.children[index];
                }
                Node::Leaf(leaf) => return rank + leaf.keys.partition_point(|key| pred(key)),
            }
        }
    }

    /// Keys with ranks in `start..end`, in ascending order. `end` is clamped
    /// to the length of the set.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Vec<&K> {
        let end = end.min(self.len);
        let mut out = Vec::with_capacity(end.saturating_sub(start));
        if let Some(root) = self.root
            && start < end
        {
            self.collect(root, start, end, &mut out);
        }
        out
    }

    fn collect<'a>(&'a self, id: NodeId, start: usize, end: usize, out: &mut Vec<&'a K>) {
        match self.nodes.get(id) {
            Node::Leaf(leaf) => out.extend(&leaf.keys[start..end]),
            Node::Internal(internal) => {
                let mut offset = 0;
                for (&child, &size) in internal.children.iter().zip(&internal.sizes) {
                    if offset >= end {
                        break;
                    }
                    let child_end = offset + size;
                    if child_end > start {
                        self.collect(child, start.saturating_sub(offset), (end - offset).min(size), out);
                    }
                    offset = child_end;
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &K> {
        self.slice(0, self.len).into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::super::node::{MIN_CHILDREN, MIN_LEAF_KEYS};
    use super::*;
    use proptest::prelude::*;

    impl<K: Clone + Ord + core::fmt::Debug> RankTree<K> {
        /// Checks every structural invariant, panicking with a description of
        /// the first violation found.
        fn validate(&self) {
            let Some(root) = self.root else {
                assert_eq!(self.len, 0, "empty tree with non-zero len");
                assert_eq!(self.nodes.live(), 0, "empty tree still owns nodes");
                return;
            };

            let mut leaf_depth = None;
            let (count, _, _) = self.validate_node(root, 0, true, &mut leaf_depth);
            assert_eq!(count, self.len, "len disagrees with stored keys");
        }

        /// Returns (key count, min key, max key) of the subtree.
        fn validate_node(&self, id: NodeId, depth: usize, is_root: bool, leaf_depth: &mut Option<usize>) -> (usize, K, K) {
            match self.nodes.get(id) {
                Node::Leaf(leaf) => {
                    match *leaf_depth {
                        Some(expected) => assert_eq!(depth, expected, "leaves at different depths"),
                        None => *leaf_depth = Some(depth),
                    }
                    assert!(!leaf.keys.is_empty(), "empty leaf");
                    assert!(is_root || leaf.keys.len() >= MIN_LEAF_KEYS, "underfull leaf");
                    assert!(leaf.keys.len() <= MAX_LEAF_KEYS, "overfull leaf");
                    assert!(leaf.keys.windows(2).all(|w| w[0] < w[1]), "leaf keys out of order");
                    (leaf.keys.len(), leaf.keys[0].clone(), leaf.keys[leaf.keys.len() - 1].clone())
                }
                Node::Internal(internal) => {
                    let children = internal.children.len();
                    assert_eq!(internal.sizes.len(), children, "sizes/children mismatch");
                    assert_eq!(internal.separators.len() + 1, children, "separators/children mismatch");
                    assert!(children >= if is_root { 2 } else { MIN_CHILDREN }, "underfull internal node");
                    assert!(children <= MAX_CHILDREN, "overfull internal node");

                    let mut total = 0;
                    let mut bounds: Option<(K, K)> = None;
                    let mut previous_max: Option<K> = None;
                    for (i, &child) in internal.children.iter().enumerate() {
                        let (count, min, max) = self.validate_node(child, depth + 1, false, leaf_depth);
                        assert_eq!(count, internal.sizes[i], "stale child size");
                        if let Some(separator) = internal.separators.get(i) {
                            assert!(max <= *separator, "separator below child maximum");
                        }
                        if i > 0 {
                            assert!(internal.separators[i - 1] < min, "separator not below next child");
                        }
                        if let Some(previous_max) = previous_max {
                            assert!(previous_max < min, "children overlap");
                        }
                        previous_max = Some(max.clone());
                        total += count;
                        bounds = Some(match bounds {
                            None => (min, max),
                            Some((low, _)) => (low, max),
                        });
                    }

                    let (min, max) = bounds.expect("internal node without children");
                    (total, min, max)
                }
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..1000).prop_map(Op::Insert),
            2 => (0i32..1000).prop_map(Op::Remove),
        ]
    }

    fn tree_of(keys: impl IntoIterator<Item = i32>) -> RankTree<i32> {
        let mut tree = RankTree::new();
        for key in keys {
            tree.insert(key);
        }
        tree
    }

    #[test]
    fn empty_tree_queries() {
        let tree: RankTree<i32> = RankTree::new();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.rank_of(&1), None);
        assert_eq!(tree.get_by_rank(0), None);
        assert_eq!(tree.partition_point(|_| true), 0);
        assert!(tree.slice(0, 10).is_empty());
    }

    #[test]
    fn drains_back_to_empty() {
        let mut tree = tree_of(0..500);
        tree.validate();
        for key in (0..500).rev() {
            assert!(tree.remove(&key));
            tree.validate();
        }
        assert_eq!(tree.len(), 0);
        assert!(!tree.remove(&0));
    }

    #[test]
    fn clear_resets_everything() {
        let mut tree = tree_of(0..100);
        tree.clear();
        tree.validate();
        assert!(tree.insert(7));
        assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn clones_are_independent() {
        let mut tree = tree_of(0..200);
        let snapshot = tree.clone();
        for key in 0..100 {
            tree.remove(&key);
        }
        snapshot.validate();
        assert_eq!(snapshot.len(), 200);
        assert_eq!(tree.len(), 100);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_and_match_btreeset(ops in prop::collection::vec(op_strategy(), 0..600)) {
            let mut tree = RankTree::new();
            let mut model = BTreeSet::new();

            for op in ops {
                match op {
                    Op::Insert(key) => prop_assert_eq!(tree.insert(key), model.insert(key)),
                    Op::Remove(key) => prop_assert_eq!(tree.remove(&key), model.remove(&key)),
                }
                tree.validate();
                prop_assert_eq!(tree.len(), model.len());
            }

            let expected: Vec<i32> = model.iter().copied().collect();
            let actual: Vec<i32> = tree.iter().copied().collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn rank_lookups_agree(keys in prop::collection::btree_set(-500i32..500, 0..300)) {
            let tree = tree_of(keys.iter().copied());
            let sorted: Vec<i32> = keys.iter().copied().collect();

            for (rank, key) in sorted.iter().enumerate() {
                prop_assert_eq!(tree.rank_of(key), Some(rank));
                prop_assert_eq!(tree.get_by_rank(rank), Some(key));
            }
            prop_assert_eq!(tree.get_by_rank(sorted.len()), None);
            prop_assert_eq!(tree.rank_of(&1000), None);
        }

        #[test]
        fn partition_point_counts_prefix(keys in prop::collection::btree_set(-500i32..500, 0..300), pivot in -600i32..600) {
            let mut tree = tree_of(keys.iter().copied());
            // Removals leave stale separators behind; they must not skew counts.
            for key in keys.iter().filter(|key| *key % 3 == 0) {
                tree.remove(key);
            }
            let remaining: Vec<i32> = keys.iter().copied().filter(|key| key % 3 != 0).collect();

            prop_assert_eq!(tree.partition_point(|key| *key < pivot), remaining.partition_point(|key| *key < pivot));
            prop_assert_eq!(tree.partition_point(|key| *key <= pivot), remaining.partition_point(|key| *key <= pivot));
        }

        #[test]
        fn slice_matches_vec_slice(keys in prop::collection::btree_set(0i32..2000, 0..400), start in 0usize..450, len in 0usize..450) {
            let tree = tree_of(keys.iter().copied());
            let sorted: Vec<i32> = keys.iter().copied().collect();
            let end = (start + len).min(sorted.len());
            let expected: Vec<i32> = if start < end { sorted[start..end].to_vec() } else { Vec::new() };

            let actual: Vec<i32> = tree.slice(start, start + len).into_iter().copied().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
