//! Geometry-source seam.
//!
//! File codecs (STL/OBJ/VTK) are external collaborators; the store only
//! sees their output as flat position and corner arrays through this
//! trait. The source is consulted on the coordinator during initial
//! distribution and never afterwards — non-coordinator workers receive
//! their geometry over the wire.

use crate::error::ConfigError;
use crate::group::GroupSpec;
use tessera_spatial::Vec3;

/// Flat triangle soup for one group, as a codec delivers it.
#[derive(Debug, Clone, Default)]
pub struct RawGroupGeometry {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Per-triangle corner indices into `positions`
    pub corners: Vec<[u32; 3]>,
    /// Optional per-triangle user tags, parallel to `corners`
    pub tags: Option<Vec<i32>>,
}

impl RawGroupGeometry {
    /// Checks internal consistency: corner indices in range and, when tags
    /// are present, one tag per triangle.
    pub fn validate(&self, group: &str) -> Result<(), ConfigError> {
        let vertex_count = self.positions.len() as u32;
        for (i, corners) in self.corners.iter().enumerate() {
            for &corner in corners {
                if corner >= vertex_count {
                    return Err(ConfigError::GeometryLoad {
                        group: group.to_string(),
                        reason: format!(
                            "triangle {i} references vertex {corner} of {vertex_count}"
                        ),
                    });
                }
            }
        }
        if let Some(tags) = &self.tags {
            if tags.len() != self.corners.len() {
                return Err(ConfigError::GeometryLoad {
                    group: group.to_string(),
                    reason: format!(
                        "{} tags for {} triangles",
                        tags.len(),
                        self.corners.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Supplies the coordinator with the full global geometry of each group.
pub trait GeometrySource: Send + Sync {
    /// Loads the complete geometry of `spec`'s group.
    fn load(&self, spec: &GroupSpec) -> Result<RawGroupGeometry, ConfigError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_corner_is_rejected() {
        let raw = RawGroupGeometry {
            positions: vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)],
            corners: vec![[0, 1, 2]],
            tags: None,
        };
        assert!(matches!(
            raw.validate("hull"),
            Err(ConfigError::GeometryLoad { .. })
        ));
    }

    #[test]
    fn tag_count_must_match_triangle_count() {
        let raw = RawGroupGeometry {
            positions: vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            corners: vec![[0, 1, 2]],
            tags: Some(vec![1, 2]),
        };
        assert!(raw.validate("hull").is_err());
    }
}
