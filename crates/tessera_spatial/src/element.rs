//! Triangle element model.
//!
//! A triangle stores three arena handles, its wire-stable id, an optional
//! user tag, and a cached normal/area pair. The cache is only valid for the
//! geometry it was computed from; every path that mutates vertex positions
//! (motion laws, migration receive) refreshes it before the index is
//! rebuilt.

use crate::arena::VertexArena;
use crate::bbox::BoundingBox;
use crate::types::{TriangleId, Vec3, VertexHandle};

/// One surface triangle.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// Globally unique, migration-stable identifier
    pub id: TriangleId,
    /// Corner handles into the owning group's arena
    pub vertices: [VertexHandle; 3],
    /// Optional application tag carried through migration when the wire
    /// format is configured for it
    pub tag: Option<i32>,
    /// Cached unit normal (zero vector for degenerate triangles)
    pub normal: Vec3,
    /// Cached surface area
    pub area: f64,
}

impl Triangle {
    /// Creates a triangle and computes its cached normal/area from `arena`.
    pub fn new(
        id: TriangleId,
        vertices: [VertexHandle; 3],
        tag: Option<i32>,
        arena: &VertexArena,
    ) -> Self {
        let mut triangle = Self {
            id,
            vertices,
            tag,
            normal: Vec3::zero(),
            area: 0.0,
        };
        triangle.refresh_cache(arena);
        triangle
    }

    /// Recomputes the cached normal and area from current vertex positions.
    pub fn refresh_cache(&mut self, arena: &VertexArena) {
        let [p0, p1, p2] = self.positions(arena);
        let cross = p1.sub(p0).cross(p2.sub(p0));
        let len = cross.length();
        self.area = len * 0.5;
        self.normal = if len > 0.0 {
            cross.scale(1.0 / len)
        } else {
            Vec3::zero()
        };
    }

    /// Current corner positions.
    pub fn positions(&self, arena: &VertexArena) -> [Vec3; 3] {
        [
            arena.position(self.vertices[0]),
            arena.position(self.vertices[1]),
            arena.position(self.vertices[2]),
        ]
    }

    /// Tightest box covering the three corners.
    pub fn bbox(&self, arena: &VertexArena) -> BoundingBox {
        BoundingBox::from_points(&self.positions(arena))
    }

    /// Corner coordinates flattened in wire order: v0.xyz, v1.xyz, v2.xyz.
    pub fn coords(&self, arena: &VertexArena) -> [f64; 9] {
        let [p0, p1, p2] = self.positions(arena);
        [p0.x, p0.y, p0.z, p1.x, p1.y, p1.z, p2.x, p2.y, p2.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_right_triangle() -> (VertexArena, Triangle) {
        let mut arena = VertexArena::new();
        let a = arena.push(Vec3::zero());
        let b = arena.push(Vec3::new(1.0, 0.0, 0.0));
        let c = arena.push(Vec3::new(0.0, 1.0, 0.0));
        let triangle = Triangle::new(TriangleId(7), [a, b, c], None, &arena);
        (arena, triangle)
    }

    #[test]
    fn cached_normal_and_area() {
        let (_, triangle) = unit_right_triangle();
        assert!((triangle.area - 0.5).abs() < 1e-12);
        assert!((triangle.normal.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn refresh_cache_tracks_moved_vertices() {
        let (mut arena, mut triangle) = unit_right_triangle();
        for v in arena.vertices_mut() {
            v.position = v.position.scale(2.0);
        }
        triangle.refresh_cache(&arena);
        assert!((triangle.area - 2.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_triangle_has_zero_normal() {
        let mut arena = VertexArena::new();
        let a = arena.push(Vec3::zero());
        let triangle = Triangle::new(TriangleId(0), [a, a, a], None, &arena);
        assert_eq!(triangle.area, 0.0);
        assert_eq!(triangle.normal, Vec3::zero());
    }

    #[test]
    fn bbox_and_wire_coords_agree() {
        let (arena, triangle) = unit_right_triangle();
        let bbox = triangle.bbox(&arena);
        assert_eq!(bbox.min, Vec3::zero());
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 0.0));
        let coords = triangle.coords(&arena);
        assert_eq!(&coords[3..6], &[1.0, 0.0, 0.0]);
    }
}
