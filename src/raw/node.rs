use smallvec::SmallVec;

use super::pool::NodeId;

#[cfg(test)]
pub(crate) const ORDER: usize = 8;
#[cfg(not(test))]
pub(crate) const ORDER: usize = 64;

pub(crate) const MAX_CHILDREN: usize = ORDER;
pub(crate) const MIN_CHILDREN: usize = ORDER / 2;
pub(crate) const MAX_LEAF_KEYS: usize = ORDER;
pub(crate) const MIN_LEAF_KEYS: usize = ORDER / 2;

#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K> {
    Internal(Internal<K>),
    Leaf(Leaf<K>),
}

/// Routing node.
///
/// `separators[i]` is an upper bound for every key under `children[i]` and
/// lies strictly below every key under `children[i + 1]`. The last child has
/// no separator. Removals may leave a separator above its child's actual
/// maximum; routing stays correct as long as the bounds above hold.
#[derive(Clone, Debug)]
pub(crate) struct Internal<K> {
    pub(crate) separators: SmallVec<[K; MAX_CHILDREN]>,
    pub(crate) children: SmallVec<[NodeId; MAX_CHILDREN + 1]>,
    /// Number of keys stored under each child.
    pub(crate) sizes: SmallVec<[usize; MAX_CHILDREN + 1]>,
}

#[derive(Clone, Debug)]
pub(crate) struct Leaf<K> {
    pub(crate) keys: SmallVec<[K; MAX_LEAF_KEYS + 1]>,
}

impl<K> Node<K> {
    pub(crate) fn size(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.sizes.iter().sum(),
            Node::Leaf(leaf) => leaf.keys.len(),
        }
    }

    pub(crate) fn is_underfull(&self) -> bool {
        match self {
            Node::Internal(internal) => internal.children.len() < MIN_CHILDREN,
            Node::Leaf(leaf) => leaf.keys.len() < MIN_LEAF_KEYS,
        }
    }

    pub(crate) fn can_lend(&self) -> bool {
        match self {
            Node::Internal(internal) => internal.children.len() > MIN_CHILDREN,
            Node::Leaf(leaf) => leaf.keys.len() > MIN_LEAF_KEYS,
        }
    }

    pub(crate) fn as_internal(&self) -> &Internal<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn as_internal_mut(&mut self) -> &mut Internal<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }
}

impl<K: Ord> Internal<K> {
    /// Index of the child whose key range may contain `key`.
    #[inline]
    pub(crate) fn route(&self, key: &K) -> usize {
        self.separators.partition_point(|separator| separator < key)
    }

    /// Splits off the upper half. Returns the separator that moves up to the
    /// parent together with the new right sibling.
    pub(crate) fn split(&mut self) -> (K, Internal<K>) {
        let mid = self.children.len() / 2;

        let right = Internal {
            separators: self.separators.drain(mid..).collect(),
            children: self.children.drain(mid..).collect(),
            sizes: self.sizes.drain(mid..).collect(),
        };
        let median = self.separators.pop().expect("split of an internal node with fewer than two children");

        (median, right)
    }
}

impl<K: Clone> Leaf<K> {
    pub(crate) fn with_key(key: K) -> Self {
        let mut keys = SmallVec::new();
        keys.push(key);
        Self { keys }
    }

    /// Splits off the upper half. Returns the new left maximum, which becomes
    /// the separator for this leaf, together with the new right sibling.
    pub(crate) fn split(&mut self) -> (K, Leaf<K>) {
        let mid = self.keys.len() / 2;
        let right = Leaf {
            keys: self.keys.drain(mid..).collect(),
        };
        let separator = self.keys.last().cloned().expect("split of an empty leaf");

        (separator, right)
    }
}
