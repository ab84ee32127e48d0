//! KD-tree node internals.
//!
//! Each node carries two distinct boxes. The *split bbox* is static: assigned
//! when the node is created by cutting its parent at the midpoint, it defines
//! the descent comparison planes and never changes. The *search bbox* starts
//! empty and grows with every element inserted through the node; it is the
//! union of actually-inserted element geometry and is the only box consulted
//! for query pruning. Search bboxes only grow, never shrink — a stale
//! oversized search bbox costs pruning efficiency, never correctness.

use crate::bbox::BoundingBox;
use crate::types::{Axis, Vec3};

use super::{IndexEntry, NearestNeighbor, QueryMode};

/// Leaf payload or two children.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind<T> {
    Leaf(Vec<IndexEntry<T>>),
    Internal {
        left: Box<IndexNode<T>>,
        right: Box<IndexNode<T>>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct IndexNode<T> {
    /// Static split box, fixed at node creation
    pub(crate) split_bbox: BoundingBox,
    /// Grow-only union of inserted element geometry
    pub(crate) search_bbox: BoundingBox,
    /// Axis the descent comparison and any future split of this node use
    pub(crate) axis: Axis,
    pub(crate) kind: NodeKind<T>,
}

impl<T: Copy> IndexNode<T> {
    pub(crate) fn leaf(split_bbox: BoundingBox, axis: Axis) -> Self {
        Self {
            split_bbox,
            search_bbox: BoundingBox::empty(),
            axis,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    /// Inserts one entry, growing search bboxes along the descent path and
    /// splitting the destination leaf when it goes over capacity.
    ///
    /// The descent comparison is against the midpoint of the *left* child's
    /// split bbox on this node's axis. This is deliberately not the cut
    /// plane used by nearest-neighbor descent; the two policies are
    /// asymmetric and queries stay correct because pruning only trusts the
    /// search bboxes.
    pub(crate) fn insert(&mut self, entry: IndexEntry<T>, max_elements: usize) {
        self.search_bbox.add_box(&entry.bbox);
        match &mut self.kind {
            NodeKind::Leaf(entries) => {
                entries.push(entry);
                if entries.len() <= max_elements {
                    return;
                }
            }
            NodeKind::Internal { left, right } => {
                let threshold = left.split_bbox.center().component(self.axis);
                if entry.representative().component(self.axis) < threshold {
                    left.insert(entry, max_elements);
                } else {
                    right.insert(entry, max_elements);
                }
                return;
            }
        }
        self.split(max_elements);
    }

    /// Turns an over-capacity leaf into an internal node.
    ///
    /// The children's static boxes are this node's split bbox cut at the
    /// midpoint on the current axis, their axis advanced cyclically. Entries
    /// are redistributed with the insertion comparison rule, and a child
    /// that is still over capacity is split again. A cut that fails to
    /// separate (every entry lands on one side) is abandoned and the
    /// oversized leaf stands; this is what bounds leaves holding duplicate
    /// positions.
    fn split(&mut self, max_elements: usize) {
        let entries = match &mut self.kind {
            NodeKind::Leaf(entries) => std::mem::take(entries),
            NodeKind::Internal { .. } => return,
        };

        let (left_bbox, right_bbox) = self.split_bbox.halves(self.axis);
        let child_axis = self.axis.next();
        let mut left = IndexNode::leaf(left_bbox, child_axis);
        let mut right = IndexNode::leaf(right_bbox, child_axis);

        let threshold = left.split_bbox.center().component(self.axis);
        for entry in entries {
            let target = if entry.representative().component(self.axis) < threshold {
                &mut left
            } else {
                &mut right
            };
            target.search_bbox.add_box(&entry.bbox);
            match &mut target.kind {
                NodeKind::Leaf(list) => list.push(entry),
                NodeKind::Internal { .. } => unreachable!("fresh children are leaves"),
            }
        }

        if left.len() == 0 || right.len() == 0 {
            // Could not separate; keep the oversized leaf.
            let survivor = if left.len() > 0 { left } else { right };
            match survivor.kind {
                NodeKind::Leaf(list) => self.kind = NodeKind::Leaf(list),
                NodeKind::Internal { .. } => unreachable!("fresh children are leaves"),
            }
            return;
        }

        if left.len() > max_elements {
            left.split(max_elements);
        }
        if right.len() > max_elements {
            right.split(max_elements);
        }
        self.kind = NodeKind::Internal {
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    /// Collects query hits, descending into a child only if that child's
    /// search bbox crosses the query. The exact per-element test runs at
    /// leaves only.
    pub(crate) fn collect(&self, query: &BoundingBox, mode: QueryMode, out: &mut Vec<T>) {
        match &self.kind {
            NodeKind::Leaf(entries) => {
                for entry in entries {
                    let hit = match mode {
                        QueryMode::Any => entry.bbox.crossed(query),
                        QueryMode::Every => query.contains_box(&entry.bbox),
                    };
                    if hit {
                        out.push(entry.item);
                    }
                }
            }
            NodeKind::Internal { left, right } => {
                if left.search_bbox.crossed(query) {
                    left.collect(query, mode, out);
                }
                if right.search_bbox.crossed(query) {
                    right.collect(query, mode, out);
                }
            }
        }
    }

    /// Nearest-neighbor descent.
    ///
    /// At an internal node the side containing the point goes first,
    /// decided against the left child's split bbox max on this node's axis;
    /// the other side is consulted only when the first came back empty.
    /// There is no distance-bound pruning.
    pub(crate) fn nearest(&self, point: Vec3) -> Option<NearestNeighbor<T>> {
        match &self.kind {
            NodeKind::Leaf(entries) => {
                let mut best: Option<NearestNeighbor<T>> = None;
                for entry in entries {
                    let distance = point.distance(entry.representative());
                    let closer = match &best {
                        Some(current) => distance < current.distance,
                        None => true,
                    };
                    if closer {
                        best = Some(NearestNeighbor {
                            item: entry.item,
                            distance,
                        });
                    }
                }
                best
            }
            NodeKind::Internal { left, right } => {
                let go_left_first =
                    point.component(self.axis) < left.split_bbox.max.component(self.axis);
                let (first, second) = if go_left_first {
                    (left, right)
                } else {
                    (right, left)
                };
                first.nearest(point).or_else(|| second.nearest(point))
            }
        }
    }

    /// Number of entries stored under this node.
    pub(crate) fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal { left, right } => left.len() + right.len(),
        }
    }

    /// Moves every entry under this node into `out`.
    pub(crate) fn drain_into(self, out: &mut Vec<IndexEntry<T>>) {
        match self.kind {
            NodeKind::Leaf(mut entries) => out.append(&mut entries),
            NodeKind::Internal { left, right } => {
                left.drain_into(out);
                right.drain_into(out);
            }
        }
    }

    /// Largest leaf size under this node. Test support for the capacity
    /// invariant.
    #[cfg(test)]
    pub(crate) fn max_leaf_len(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal { left, right } => left.max_leaf_len().max(right.max_leaf_len()),
        }
    }
}
