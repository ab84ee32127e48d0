//! # Motion-Law Interface
//!
//! This module defines the capability interface a group motion class must
//! satisfy. The distributed store invokes laws polymorphically per group:
//! once per simulation step to displace the group's vertices, and whenever
//! the group's spatial index needs rebuilding.
//!
//! ## Contract
//!
//! A law is a pure function of the group's own geometry and the step
//! parameters. It receives the vertex slice mutably and nothing else — a
//! slice cannot grow or shrink, so "moves vertices only, never adds or
//! removes elements" is enforced by the signature rather than by
//! convention.

use crate::error::MotionError;
use tessera_spatial::arena::{Vertex, VertexArena};
use tessera_spatial::element::Triangle;
use tessera_spatial::index::{IndexEntry, TriangleIndex};
use tessera_spatial::BoundingBox;

/// Step parameters handed to every motion law.
///
/// Validated by the store before any law runs: `next_step` must exceed
/// `current_step` and `delta_t` must be positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Step the geometry currently sits at
    pub current_step: u64,
    /// Step being advanced to
    pub next_step: u64,
    /// Physical time covered by the advance
    pub delta_t: f64,
}

/// Capability interface for a group motion class.
///
/// Implementations are registered in a [`MotionRegistry`](crate::registry::MotionRegistry)
/// under their class name and resolved once per group at store construction.
pub trait MotionLaw: Send + Sync + std::fmt::Debug {
    /// Stable class name this law is registered under.
    fn class_name(&self) -> &str;

    /// Displaces the group's vertices in place for one step advance.
    fn move_vertices(&self, vertices: &mut [Vertex], params: &StepParams)
        -> Result<(), MotionError>;

    /// Builds the group's triangle index over the current geometry.
    ///
    /// The default covers every group class in the system today: refresh
    /// each triangle's cached geometry, take the union bbox as the root,
    /// and insert in list order. A class may override to shape the tree
    /// differently (for example a different leaf capacity for very dense
    /// groups).
    fn build_group_tree(
        &self,
        triangles: &mut [Triangle],
        arena: &VertexArena,
        leaf_capacity: usize,
    ) -> TriangleIndex {
        let mut root_bbox = BoundingBox::empty();
        let mut entries = Vec::with_capacity(triangles.len());
        for triangle in triangles.iter_mut() {
            triangle.refresh_cache(arena);
            let bbox = triangle.bbox(arena);
            root_bbox.add_box(&bbox);
            entries.push(IndexEntry::new(triangle.id, bbox));
        }
        TriangleIndex::create(entries, leaf_capacity, root_bbox)
    }
}
