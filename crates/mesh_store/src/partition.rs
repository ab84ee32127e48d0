//! Worker partition descriptors.
//!
//! Each worker owns one axis-aligned voxel block of the global domain plus
//! a guard band of extra cells around it. The guard band is where neighbor
//! geometry becomes visible before it crosses the interior boundary, and
//! its bbox is the predicate every migration decision is evaluated
//! against. Two workers are neighbors exactly when their guard bboxes
//! cross; the neighbor set is computed once at startup and fixed for the
//! run.

use serde::{Deserialize, Serialize};
use tessera_spatial::{BoundingBox, Vec3, WorkerRank};

/// One worker's spatial responsibility descriptor.
///
/// Serializable because descriptors travel the startup all-to-all exchange
/// as JSON control messages; only the bulk migration body uses the binary
/// layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Rank of the owning worker
    pub rank: WorkerRank,
    /// Minimum corner of the interior region
    pub base: Vec3,
    /// Interior extent in voxels per axis
    pub cells: [u32; 3],
    /// Guard band width in voxels
    pub guard_cells: u32,
    /// Voxel edge length
    pub pitch: f64,
}

impl Partition {
    /// Creates a descriptor from local configuration.
    pub fn new(rank: WorkerRank, base: Vec3, cells: [u32; 3], guard_cells: u32, pitch: f64) -> Self {
        Self {
            rank,
            base,
            cells,
            guard_cells,
            pitch,
        }
    }

    /// Minimum corner of the interior region.
    pub fn interior_min(&self) -> Vec3 {
        self.base
    }

    /// Maximum corner of the interior region.
    pub fn interior_max(&self) -> Vec3 {
        Vec3::new(
            self.base.x + f64::from(self.cells[0]) * self.pitch,
            self.base.y + f64::from(self.cells[1]) * self.pitch,
            self.base.z + f64::from(self.cells[2]) * self.pitch,
        )
    }

    /// Minimum corner including guard cells.
    pub fn guard_min(&self) -> Vec3 {
        let margin = f64::from(self.guard_cells) * self.pitch;
        let min = self.interior_min();
        Vec3::new(min.x - margin, min.y - margin, min.z - margin)
    }

    /// Maximum corner including guard cells.
    pub fn guard_max(&self) -> Vec3 {
        let margin = f64::from(self.guard_cells) * self.pitch;
        let max = self.interior_max();
        Vec3::new(max.x + margin, max.y + margin, max.z + margin)
    }

    /// Interior bbox, guard cells excluded.
    pub fn interior_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.interior_min(), self.interior_max())
    }

    /// Guard-cell-inclusive bbox; the box all migration predicates use.
    pub fn guard_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.guard_min(), self.guard_max())
    }

    /// Whether `other` is a neighbor: a different rank whose guard bbox
    /// crosses this one's guard bbox.
    pub fn is_neighbor_of(&self, other: &Partition) -> bool {
        self.rank != other.rank && self.guard_bbox().crossed(&other.guard_bbox())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_partition(rank: usize, ix: f64, iy: f64) -> Partition {
        Partition::new(
            WorkerRank(rank),
            Vec3::new(ix * 4.0, iy * 4.0, 0.0),
            [4, 4, 4],
            1,
            1.0,
        )
    }

    #[test]
    fn derived_boxes() {
        let p = grid_partition(0, 0.0, 0.0);
        assert_eq!(p.interior_min(), Vec3::zero());
        assert_eq!(p.interior_max(), Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(p.guard_min(), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(p.guard_max(), Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn adjacent_blocks_are_neighbors() {
        let a = grid_partition(0, 0.0, 0.0);
        let b = grid_partition(1, 1.0, 0.0);
        assert!(a.is_neighbor_of(&b));
        assert!(b.is_neighbor_of(&a));
    }

    #[test]
    fn distant_blocks_are_not_neighbors() {
        let a = grid_partition(0, 0.0, 0.0);
        let far = grid_partition(1, 3.0, 0.0);
        assert!(!a.is_neighbor_of(&far));
    }

    #[test]
    fn a_partition_is_not_its_own_neighbor() {
        let a = grid_partition(0, 0.0, 0.0);
        assert!(!a.is_neighbor_of(&a));
    }

    #[test]
    fn diagonal_blocks_touch_through_guard_bands() {
        let a = grid_partition(0, 0.0, 0.0);
        let d = grid_partition(3, 1.0, 1.0);
        // Guard boxes [−1,5] and [3,9] overlap on both axes.
        assert!(a.is_neighbor_of(&d));
    }

    #[test]
    fn descriptor_survives_json_exchange() {
        let p = grid_partition(2, 1.0, 0.0);
        let encoded = serde_json::to_vec(&p).expect("serialize partition");
        let decoded: Partition = serde_json::from_slice(&encoded).expect("parse partition");
        assert_eq!(decoded, p);
    }
}
