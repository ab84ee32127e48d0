//! Tolerance-based vertex deduplication.
//!
//! Triangles arriving from load or migration are reconstructed with fresh
//! arena entries and no sharing; this pass rebuilds the arena so corners
//! closer than the group tolerance collapse onto one shared vertex. The
//! dedup question is a nearest-neighbor query against a [`VertexIndex`]
//! grown incrementally as unique vertices are admitted, so the cost stays
//! proportional to the batch.
//!
//! A missed merge leaves an extra vertex copy behind, which is harmless;
//! the wire format ships raw per-triangle coordinates either way.

use crate::arena::VertexArena;
use crate::bbox::BoundingBox;
use crate::element::Triangle;
use crate::error::SpatialIndexError;
use crate::index::{IndexEntry, VertexIndex};
use crate::types::VertexHandle;
use tracing::trace;

/// Rebuilds `arena` with vertices deduplicated under `tolerance`, remapping
/// every triangle's handles onto the new arena.
///
/// Returns the compacted arena; the caller swaps it in for the old one.
/// Dead vertices (unreferenced by any triangle) do not survive the rebuild,
/// which is how erase-outbounded reclaims the storage of departed
/// triangles.
///
/// # Errors
///
/// Propagates [`SpatialIndexError`] from the incremental vertex index;
/// unreachable in practice, and fatal if it ever surfaces.
pub fn deduplicate_batch(
    arena: &VertexArena,
    triangles: &mut [Triangle],
    tolerance: f64,
    leaf_capacity: usize,
) -> Result<VertexArena, SpatialIndexError> {
    let mut used_bbox = BoundingBox::empty();
    for triangle in triangles.iter() {
        for position in triangle.positions(arena) {
            used_bbox.add_point(position);
        }
    }

    let mut compact = VertexArena::new();
    let mut index = VertexIndex::create(Vec::new(), leaf_capacity, used_bbox);
    let mut merged = 0usize;

    for triangle in triangles.iter_mut() {
        let mut handles = [VertexHandle(0); 3];
        for (corner, old_handle) in triangle.vertices.into_iter().enumerate() {
            let position = arena.position(old_handle);
            let reuse = index
                .search_nearest(position)
                .filter(|hit| hit.distance <= tolerance)
                .map(|hit| hit.item);
            handles[corner] = match reuse {
                Some(handle) => {
                    merged += 1;
                    handle
                }
                None => {
                    let handle = compact.push(position);
                    index.add(IndexEntry::new(
                        handle,
                        BoundingBox::new(position, position),
                    ))?;
                    handle
                }
            };
        }
        triangle.vertices = handles;
        triangle.refresh_cache(&compact);
    }

    trace!(
        merged,
        unique = compact.len(),
        "vertex batch deduplicated"
    );
    Ok(compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TriangleId, Vec3};

    #[test]
    fn adjacent_triangles_share_the_common_edge() {
        // Two triangles forming a quad; the diagonal's endpoints arrive as
        // independent copies, as after a wire receive.
        let mut arena = VertexArena::new();
        let quad = [
            Vec3::zero(),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let a = [
            arena.push(quad[0]),
            arena.push(quad[1]),
            arena.push(quad[2]),
        ];
        let b = [
            arena.push(quad[0]),
            arena.push(quad[2]),
            arena.push(quad[3]),
        ];
        let mut triangles = vec![
            Triangle::new(TriangleId(0), a, None, &arena),
            Triangle::new(TriangleId(1), b, None, &arena),
        ];

        let compact = deduplicate_batch(&arena, &mut triangles, 1e-9, 8)
            .expect("dedup over a well-formed batch");

        assert_eq!(arena.len(), 6);
        assert_eq!(compact.len(), 4);
        assert_eq!(triangles[0].vertices[0], triangles[1].vertices[0]);
        assert_eq!(triangles[0].vertices[2], triangles[1].vertices[1]);
        // Geometry survives the remap.
        assert!((triangles[0].area - 0.5).abs() < 1e-12);
        assert!((triangles[1].area - 0.5).abs() < 1e-12);
    }

    #[test]
    fn nearby_vertices_merge_under_tolerance() {
        let mut arena = VertexArena::new();
        let a = [
            arena.push(Vec3::zero()),
            arena.push(Vec3::new(1.0, 0.0, 0.0)),
            arena.push(Vec3::new(0.0, 1.0, 0.0)),
        ];
        let b = [
            arena.push(Vec3::new(1e-7, 0.0, 0.0)),
            arena.push(Vec3::new(2.0, 0.0, 0.0)),
            arena.push(Vec3::new(2.0, 1.0, 0.0)),
        ];
        let mut triangles = vec![
            Triangle::new(TriangleId(0), a, None, &arena),
            Triangle::new(TriangleId(1), b, None, &arena),
        ];

        let strict = deduplicate_batch(&arena, &mut triangles.clone(), 1e-9, 8)
            .expect("strict dedup");
        assert_eq!(strict.len(), 6);

        let loose = deduplicate_batch(&arena, &mut triangles, 1e-6, 8)
            .expect("loose dedup");
        assert_eq!(loose.len(), 5);
        assert_eq!(triangles[1].vertices[0], triangles[0].vertices[0]);
    }

    #[test]
    fn dead_vertices_are_reclaimed() {
        let mut arena = VertexArena::new();
        arena.push(Vec3::new(100.0, 100.0, 100.0));
        let a = [
            arena.push(Vec3::zero()),
            arena.push(Vec3::new(1.0, 0.0, 0.0)),
            arena.push(Vec3::new(0.0, 1.0, 0.0)),
        ];
        let mut triangles = vec![Triangle::new(TriangleId(0), a, None, &arena)];
        let compact = deduplicate_batch(&arena, &mut triangles, 1e-9, 8)
            .expect("dedup");
        assert_eq!(compact.len(), 3);
    }
}
