//! Per-group vertex storage.
//!
//! Triangles never own their corner coordinates; they hold handles into the
//! group's arena so adjacent triangles can share a vertex. The arena is
//! append-only between deduplication passes — erase-outbounded and the
//! dedup batch pass rebuild it wholesale rather than punching holes.

use crate::bbox::BoundingBox;
use crate::types::{Vec3, VertexHandle};
use serde::{Deserialize, Serialize};

/// A single mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Position in world coordinates
    pub position: Vec3,
}

impl Vertex {
    /// Creates a vertex at `position`.
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }
}

/// Append-only vertex storage for one group.
///
/// Handles issued by [`push`](VertexArena::push) stay valid until the arena
/// is rebuilt; the rebuild remaps every triangle's handles in the same pass.
#[derive(Debug, Clone, Default)]
pub struct VertexArena {
    vertices: Vec<Vertex>,
}

impl VertexArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a vertex and returns its handle.
    pub fn push(&mut self, position: Vec3) -> VertexHandle {
        let handle = VertexHandle(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(position));
        handle
    }

    /// Position of the vertex behind `handle`.
    pub fn position(&self, handle: VertexHandle) -> Vec3 {
        self.vertices[handle.index()].position
    }

    /// Number of stored vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the arena holds no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Mutable view over every vertex, the surface handed to motion laws.
    ///
    /// A slice cannot grow or shrink, which is exactly the motion contract:
    /// laws move vertices, they never add or remove elements.
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// Read-only view over every vertex.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Tightest box covering every stored vertex.
    pub fn bbox(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for v in &self.vertices {
            bbox.add_point(v.position);
        }
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_issues_sequential_handles() {
        let mut arena = VertexArena::new();
        let a = arena.push(Vec3::new(1.0, 0.0, 0.0));
        let b = arena.push(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(a, VertexHandle(0));
        assert_eq!(b, VertexHandle(1));
        assert_eq!(arena.position(b), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn bbox_covers_all_vertices() {
        let mut arena = VertexArena::new();
        arena.push(Vec3::new(-1.0, 0.0, 2.0));
        arena.push(Vec3::new(3.0, -2.0, 0.0));
        let bbox = arena.bbox();
        assert_eq!(bbox.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(3.0, 0.0, 2.0));
    }

    #[test]
    fn empty_arena_has_empty_bbox() {
        assert!(VertexArena::new().bbox().is_empty());
    }
}
