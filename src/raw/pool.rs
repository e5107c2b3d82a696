use core::num::NonZero;

#[cfg(test)]
type Index = u16;
#[cfg(not(test))]
type Index = u32;

/// Identifies a node inside a [`NodePool`]. One-based, so `Option<NodeId>`
/// is the same size as `NodeId`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct NodeId(NonZero<Index>);

impl NodeId {
    /// Largest slot position an id can name.
    pub(crate) const LIMIT: usize = Index::MAX as usize - 1;

    fn new(position: usize) -> Self {
        let one_based = Index::try_from(position + 1).ok().and_then(NonZero::new);
        match one_based {
            Some(id) if position <= Self::LIMIT => Self(id),
            _ => panic!("node pool overflow: slot {position} exceeds {}", Self::LIMIT),
        }
    }

    fn position(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(Clone, Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant { next: Option<NodeId> },
}

/// Slab of tree nodes. Vacated slots form a linked free list and are
/// refilled before the slab grows.
#[derive(Clone, Debug)]
pub(crate) struct NodePool<T> {
    slots: Vec<Slot<T>>,
    vacant: Option<NodeId>,
    live: usize,
}

impl<T> NodePool<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: None,
            live: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn insert(&mut self, node: T) -> NodeId {
        self.live += 1;
        match self.vacant {
            Some(id) => {
                let slot = core::mem::replace(&mut self.slots[id.position()], Slot::Occupied(node));
                let Slot::Vacant { next } = slot else {
                    unreachable!("free list points at an occupied slot");
                };
                self.vacant = next;
                id
            }
            None => {
                let id = NodeId::new(self.slots.len());
                self.slots.push(Slot::Occupied(node));
                id
            }
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> &T {
        match &self.slots[id.position()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("stale node id {id:?}"),
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut T {
        match &mut self.slots[id.position()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("stale node id {id:?}"),
        }
    }

    /// Mutable access to two different nodes at once, in argument order.
    pub(crate) fn pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut T, &mut T) {
        let (i, j) = (a.position(), b.position());
        assert_ne!(i, j, "pair_mut needs two different nodes");

        let (lo, hi) = self.slots.split_at_mut(i.max(j));
        let (low, high) = (&mut lo[i.min(j)], &mut hi[0]);
        let (first, second) = if i < j { (low, high) } else { (high, low) };
        match (first, second) {
            (Slot::Occupied(first), Slot::Occupied(second)) => (first, second),
            _ => panic!("stale node id in pair ({a:?}, {b:?})"),
        }
    }

    /// Vacates `id` and hands back its node.
    pub(crate) fn remove(&mut self, id: NodeId) -> T {
        let slot = core::mem::replace(&mut self.slots[id.position()], Slot::Vacant { next: self.vacant });
        match slot {
            Slot::Occupied(node) => {
                self.vacant = Some(id);
                self.live -= 1;
                node
            }
            Slot::Vacant { .. } => panic!("stale node id {id:?}"),
        }
    }

    #[cfg(test)]
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.vacant = None;
        self.live = 0;
    }
}
