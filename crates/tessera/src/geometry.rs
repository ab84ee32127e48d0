//! Demo geometry generation.
//!
//! File codecs are external collaborators; the driver stands one in with a
//! procedural triangulated sheet so a cluster can run out of the box. The
//! sheet spans the domain interior with shared-corner quads split into two
//! triangles each, which gives the vertex deduplication pass real work on
//! every worker.

use mesh_store::{ConfigError, GeometrySource, GroupSpec, RawGroupGeometry};
use tessera_spatial::{BoundingBox, Vec3};

/// Procedural sheet source handed to the coordinator.
#[derive(Debug, Clone)]
pub struct SheetSource {
    domain: BoundingBox,
    resolution: u32,
}

impl SheetSource {
    /// Creates a source generating a `resolution × resolution` quad sheet
    /// across `domain`.
    pub fn new(domain: BoundingBox, resolution: u32) -> Self {
        Self {
            domain,
            resolution: resolution.max(1),
        }
    }

    fn sheet_height(&self, spec: &GroupSpec) -> f64 {
        // Stack group sheets at distinct heights inside the domain.
        let span = self.domain.size().z;
        let slot = f64::from(spec.id.0 % 8 + 1) / 9.0;
        self.domain.min.z + span * slot
    }
}

impl GeometrySource for SheetSource {
    fn load(&self, spec: &GroupSpec) -> Result<RawGroupGeometry, ConfigError> {
        let n = self.resolution;
        let z = self.sheet_height(spec);
        let size = self.domain.size();
        let dx = size.x / f64::from(n);
        let dy = size.y / f64::from(n);

        let mut positions = Vec::with_capacity(((n + 1) * (n + 1)) as usize);
        for iy in 0..=n {
            for ix in 0..=n {
                positions.push(Vec3::new(
                    self.domain.min.x + f64::from(ix) * dx,
                    self.domain.min.y + f64::from(iy) * dy,
                    z,
                ));
            }
        }

        let mut corners = Vec::with_capacity((n * n * 2) as usize);
        for iy in 0..n {
            for ix in 0..n {
                let v00 = iy * (n + 1) + ix;
                let v10 = v00 + 1;
                let v01 = v00 + (n + 1);
                let v11 = v01 + 1;
                corners.push([v00, v10, v11]);
                corners.push([v00, v11, v01]);
            }
        }

        Ok(RawGroupGeometry {
            positions,
            corners,
            tags: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_spatial::GroupId;

    fn spec() -> GroupSpec {
        GroupSpec {
            id: GroupId(0),
            parent: None,
            name: "sheet".to_string(),
            movable: true,
            tolerance: 1e-9,
        }
    }

    #[test]
    fn sheet_covers_the_domain_footprint() {
        let domain = BoundingBox::new(Vec3::zero(), Vec3::new(8.0, 8.0, 8.0));
        let source = SheetSource::new(domain, 4);
        let raw = source.load(&spec()).expect("sheet generation");
        raw.validate("sheet").expect("consistent sheet");
        assert_eq!(raw.positions.len(), 25);
        assert_eq!(raw.corners.len(), 32);

        let mut bbox = BoundingBox::empty();
        for p in &raw.positions {
            bbox.add_point(*p);
        }
        assert_eq!(bbox.min.x, 0.0);
        assert_eq!(bbox.max.x, 8.0);
        assert_eq!(bbox.max.y, 8.0);
    }

    #[test]
    fn quads_share_their_corner_vertices() {
        let domain = BoundingBox::new(Vec3::zero(), Vec3::new(4.0, 4.0, 4.0));
        let source = SheetSource::new(domain, 2);
        let raw = source.load(&spec()).expect("sheet generation");
        // 9 grid vertices for 8 triangles; corners are shared, not copied.
        assert_eq!(raw.positions.len(), 9);
        assert_eq!(raw.corners.len(), 8);
    }
}
