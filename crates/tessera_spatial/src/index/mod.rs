//! # Generic KD-tree spatial index
//!
//! The index organizes axis-aligned-box-bounded entries for range and
//! nearest-neighbor queries. It is instantiated twice by the mesh store:
//!
//! - [`TriangleIndex`] over triangle ids, built once per geometry snapshot
//!   and rebuilt wholesale whenever the geometry changes;
//! - [`VertexIndex`] over vertex handles, which additionally supports
//!   single-element incremental insertion and backs vertex deduplication.
//!
//! Entries carry their geometry bbox; the representative point of an entry
//! is its bbox center (a triangle's bbox centroid, or the position itself
//! for a vertex's degenerate box). The tree never inspects the underlying
//! geometry beyond that, which is what keeps it generic.
//!
//! ## Query contract
//!
//! `search` returns exactly the entries matching the mode's predicate,
//! independent of insertion order and leaf capacity: descent pruning uses
//! the grow-only search bboxes, and the exact test runs on every surviving
//! leaf entry. `search_nearest` descends into the containing side first
//! with no distance-bound pruning, and returns `None` only on an empty
//! tree.

mod node;

use crate::bbox::BoundingBox;
use crate::error::SpatialIndexError;
use crate::types::{Axis, TriangleId, Vec3, VertexHandle};

use node::IndexNode;

/// Index over triangle ids, one per group, rebuilt per geometry snapshot.
pub type TriangleIndex = SpatialIndex<TriangleId>;

/// Index over vertex handles, used for tolerance-based deduplication.
pub type VertexIndex = SpatialIndex<VertexHandle>;

/// Range-query matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Keep entries whose geometry bbox crosses the query box.
    Any,
    /// Keep entries whose entire geometry is contained in the query box.
    Every,
}

/// One indexed element: an opaque item plus its geometry bbox.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<T> {
    /// The indexed item, typically an id or handle
    pub item: T,
    /// Tightest box around the item's geometry
    pub bbox: BoundingBox,
}

impl<T> IndexEntry<T> {
    /// Creates an entry from an item and its geometry bbox.
    pub fn new(item: T, bbox: BoundingBox) -> Self {
        Self { item, bbox }
    }

    /// The point the tree descends and measures distances by.
    pub fn representative(&self) -> Vec3 {
        self.bbox.center()
    }
}

/// Result of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestNeighbor<T> {
    /// The matched item
    pub item: T,
    /// Distance from the query point to the item's representative point
    pub distance: f64,
}

/// A KD-tree over boxed entries.
///
/// Nodes split at the midpoint of their static bbox with the axis advancing
/// cyclically X → Y → Z; descent decisions compare an entry's representative
/// point against the midpoint of the left child's static bbox. Leaves stay
/// within `max_elements` except where a split cannot separate duplicate
/// positions.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    root: Option<IndexNode<T>>,
    max_elements: usize,
    len: usize,
}

impl<T: Copy> SpatialIndex<T> {
    /// Builds an index over `entries` in input order.
    ///
    /// # Arguments
    ///
    /// * `entries` - the elements to index; may be empty
    /// * `max_elements` - leaf capacity before a split (clamped to ≥ 1)
    /// * `root_bbox` - static box of the root node; should cover every
    ///   entry's representative point, or incremental insertions will fall
    ///   back to a rebuild
    pub fn create(
        entries: Vec<IndexEntry<T>>,
        max_elements: usize,
        root_bbox: BoundingBox,
    ) -> Self {
        let max_elements = max_elements.max(1);
        let mut root = IndexNode::leaf(root_bbox, Axis::X);
        let len = entries.len();
        for entry in entries {
            root.insert(entry, max_elements);
        }
        Self {
            root: Some(root),
            max_elements,
            len,
        }
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Static box of the root node.
    pub fn root_bbox(&self) -> BoundingBox {
        self.root
            .as_ref()
            .map(|r| r.split_bbox)
            .unwrap_or_else(BoundingBox::empty)
    }

    /// Range query.
    ///
    /// Returns the (possibly empty) list of items matching `mode` against
    /// `query`; never errors, including on an empty index or an empty query
    /// box.
    pub fn search(&self, query: &BoundingBox, mode: QueryMode) -> Vec<T> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect(query, mode, &mut out);
        }
        out
    }

    /// Nearest entry to `point` by representative-point distance.
    ///
    /// Ties keep the first entry found. Returns `None` only when the index
    /// is empty.
    pub fn search_nearest(&self, point: Vec3) -> Option<NearestNeighbor<T>> {
        self.root.as_ref().and_then(|root| root.nearest(point))
    }

    /// Incremental single insertion.
    ///
    /// Follows the build-time descent rule, growing search bboxes along the
    /// path and splitting the destination leaf when it goes over capacity.
    /// An entry whose representative point falls outside the root's static
    /// bbox triggers a full rebuild over the complete entry set plus the
    /// newcomer, with the root box grown to cover it.
    ///
    /// # Errors
    ///
    /// `SpatialIndexError::NodeNotFound` if the index has no root to insert
    /// into. Defensive; unreachable on an index produced by [`create`].
    ///
    /// [`create`]: SpatialIndex::create
    pub fn add(&mut self, entry: IndexEntry<T>) -> Result<(), SpatialIndexError> {
        let root = self.root.as_mut().ok_or(SpatialIndexError::NodeNotFound)?;
        if !root.split_bbox.contains_point(entry.representative()) {
            self.rebuild_with(entry);
            return Ok(());
        }
        root.insert(entry, self.max_elements);
        self.len += 1;
        Ok(())
    }

    /// Discards the tree and rebuilds from every held entry plus `entry`.
    fn rebuild_with(&mut self, entry: IndexEntry<T>) {
        let mut entries = Vec::with_capacity(self.len + 1);
        let mut root_bbox = BoundingBox::empty();
        if let Some(root) = self.root.take() {
            root_bbox = root.split_bbox;
            root.drain_into(&mut entries);
        }
        root_bbox.add_box(&entry.bbox);
        entries.push(entry);
        *self = Self::create(entries, self.max_elements, root_bbox);
    }

    #[cfg(test)]
    pub(crate) fn max_leaf_len(&self) -> usize {
        self.root.as_ref().map(|r| r.max_leaf_len()).unwrap_or(0)
    }
}
