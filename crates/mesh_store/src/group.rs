//! Group hierarchy and per-group runtime state.
//!
//! The group hierarchy is established once at load time and must be
//! identical on every worker before any distributed exchange: migration
//! headers refer to groups positionally by id, never by name, so the
//! ordered group list is part of the protocol.

use crate::error::ConfigError;
use crate::geometry::RawGroupGeometry;
use crate::messaging::wire::TriangleRecord;
use motion_system::MotionLaw;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_spatial::{
    BoundingBox, GroupId, Triangle, TriangleId, TriangleIndex, Vec3, VertexArena,
};

/// Static description of one group, identical cluster-wide.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupSpec {
    /// Wire-stable group identifier
    pub id: GroupId,
    /// Optional parent group in the hierarchy
    pub parent: Option<GroupId>,
    /// Human-readable name; unique, never transmitted
    pub name: String,
    /// Whether the group's geometry moves per step
    pub movable: bool,
    /// Vertex deduplication tolerance
    pub tolerance: f64,
}

/// One group's configuration as handed to the store: the spec plus the
/// motion class resolving it to behavior.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Cluster-wide static description
    pub spec: GroupSpec,
    /// Motion class name, resolved through the registry
    pub motion_class: String,
    /// Motion class parameters
    pub motion_params: serde_json::Value,
}

/// Validates the ordered group list: unique names, unique ids, resolvable
/// parents.
pub fn validate_hierarchy(configs: &[GroupConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for config in configs {
        if !names.insert(config.spec.name.as_str()) {
            return Err(ConfigError::DuplicateGroupName(config.spec.name.clone()));
        }
        if !ids.insert(config.spec.id) {
            return Err(ConfigError::DuplicateGroupId(config.spec.id));
        }
    }
    for config in configs {
        if let Some(parent) = config.spec.parent {
            if !ids.contains(&parent) {
                return Err(ConfigError::GroupNotFound(format!(
                    "parent {parent} of group '{}'",
                    config.spec.name
                )));
            }
        }
    }
    Ok(())
}

/// Runtime state of one group on the local worker.
///
/// The triangle list and index are exclusively owned by this worker; the
/// spec is read-mostly and never mutated after load.
pub struct GroupState {
    /// Cluster-wide static description
    pub spec: GroupSpec,
    /// Local vertex storage
    pub arena: VertexArena,
    /// Local triangle subset
    pub triangles: Vec<Triangle>,
    /// Spatial index over the local subset, rebuilt per geometry snapshot
    pub index: TriangleIndex,
    law: Arc<dyn MotionLaw>,
    held: HashSet<TriangleId>,
}

impl GroupState {
    /// Creates an empty group with its resolved motion law.
    pub fn new(spec: GroupSpec, law: Arc<dyn MotionLaw>) -> Self {
        Self {
            spec,
            arena: VertexArena::new(),
            triangles: Vec::new(),
            index: TriangleIndex::create(Vec::new(), 1, BoundingBox::empty()),
            law,
            held: HashSet::new(),
        }
    }

    /// The group's resolved motion law.
    pub fn law(&self) -> &Arc<dyn MotionLaw> {
        &self.law
    }

    /// Number of local triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the group holds no local triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Whether a triangle id is held locally.
    pub fn contains(&self, id: TriangleId) -> bool {
        self.held.contains(&id)
    }

    /// Ingests a codec payload on the coordinator, assigning globally
    /// unique ids from `next_id`.
    pub fn load_raw(
        &mut self,
        raw: &RawGroupGeometry,
        next_id: &mut i32,
    ) -> Result<(), ConfigError> {
        raw.validate(&self.spec.name)?;
        let offset = self.arena.len() as u32;
        for position in &raw.positions {
            self.arena.push(*position);
        }
        for (i, corners) in raw.corners.iter().enumerate() {
            let handles = [
                tessera_spatial::VertexHandle(offset + corners[0]),
                tessera_spatial::VertexHandle(offset + corners[1]),
                tessera_spatial::VertexHandle(offset + corners[2]),
            ];
            let tag = raw.tags.as_ref().map(|tags| tags[i]);
            let id = TriangleId(*next_id);
            *next_id += 1;
            self.triangles
                .push(Triangle::new(id, handles, tag, &self.arena));
            self.held.insert(id);
        }
        Ok(())
    }

    /// Appends a triangle received over the wire, creating fresh arena
    /// entries without deduplication.
    ///
    /// Returns `false` when the id is already held locally — the copy is
    /// skipped so two neighbors delivering the same triangle in one round
    /// cannot break id uniqueness.
    pub fn append_remote(&mut self, record: &TriangleRecord) -> bool {
        if self.held.contains(&record.id) {
            return false;
        }
        let c = &record.coords;
        let handles = [
            self.arena.push(Vec3::new(c[0], c[1], c[2])),
            self.arena.push(Vec3::new(c[3], c[4], c[5])),
            self.arena.push(Vec3::new(c[6], c[7], c[8])),
        ];
        self.triangles
            .push(Triangle::new(record.id, handles, record.tag, &self.arena));
        self.held.insert(record.id);
        true
    }

    /// Rebuilds the spatial index over the current geometry through the
    /// group's motion class.
    pub fn rebuild_index(&mut self, leaf_capacity: usize) {
        self.index = self
            .law
            .build_group_tree(&mut self.triangles, &self.arena, leaf_capacity);
    }

    /// Deduplicates and compacts the arena under the group tolerance.
    pub fn dedup(&mut self, leaf_capacity: usize) -> Result<(), tessera_spatial::SpatialIndexError> {
        self.arena = tessera_spatial::deduplicate_batch(
            &self.arena,
            &mut self.triangles,
            self.spec.tolerance,
            leaf_capacity,
        )?;
        Ok(())
    }

    /// Keeps exactly the triangles in `keep`; returns how many were erased.
    pub fn retain(&mut self, keep: &HashSet<TriangleId>) -> usize {
        let before = self.triangles.len();
        self.triangles.retain(|t| keep.contains(&t.id));
        self.held = self.triangles.iter().map(|t| t.id).collect();
        before - self.triangles.len()
    }

    /// Map from id to triangle for wire-record assembly.
    pub fn by_id(&self) -> HashMap<TriangleId, &Triangle> {
        self.triangles.iter().map(|t| (t.id, t)).collect()
    }
}

impl std::fmt::Debug for GroupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupState")
            .field("spec", &self.spec)
            .field("triangles", &self.triangles.len())
            .field("vertices", &self.arena.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_system::StaticLaw;

    fn spec(id: i32, name: &str) -> GroupSpec {
        GroupSpec {
            id: GroupId(id),
            parent: None,
            name: name.to_string(),
            movable: true,
            tolerance: 1e-9,
        }
    }

    fn config(id: i32, name: &str) -> GroupConfig {
        GroupConfig {
            spec: spec(id, name),
            motion_class: "static".to_string(),
            motion_params: serde_json::Value::Null,
        }
    }

    #[test]
    fn duplicate_names_abort_load() {
        let configs = vec![config(0, "hull"), config(1, "hull")];
        assert!(matches!(
            validate_hierarchy(&configs),
            Err(ConfigError::DuplicateGroupName(name)) if name == "hull"
        ));
    }

    #[test]
    fn duplicate_ids_abort_load() {
        let configs = vec![config(3, "hull"), config(3, "wing")];
        assert!(matches!(
            validate_hierarchy(&configs),
            Err(ConfigError::DuplicateGroupId(GroupId(3)))
        ));
    }

    #[test]
    fn unresolved_parent_aborts_load() {
        let mut child = config(1, "flap");
        child.spec.parent = Some(GroupId(9));
        assert!(matches!(
            validate_hierarchy(&[config(0, "wing"), child]),
            Err(ConfigError::GroupNotFound(_))
        ));
    }

    #[test]
    fn parented_hierarchy_validates() {
        let mut child = config(1, "flap");
        child.spec.parent = Some(GroupId(0));
        assert!(validate_hierarchy(&[config(0, "wing"), child]).is_ok());
    }

    #[test]
    fn load_raw_assigns_sequential_global_ids() {
        let mut group = GroupState::new(spec(0, "hull"), Arc::new(StaticLaw));
        let raw = RawGroupGeometry {
            positions: vec![
                Vec3::zero(),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            corners: vec![[0, 1, 2], [1, 3, 2]],
            tags: Some(vec![10, 20]),
        };
        let mut next_id = 5;
        group.load_raw(&raw, &mut next_id).expect("load");
        assert_eq!(next_id, 7);
        assert_eq!(group.len(), 2);
        assert!(group.contains(TriangleId(5)));
        assert!(group.contains(TriangleId(6)));
        assert_eq!(group.triangles[1].tag, Some(20));
    }

    #[test]
    fn append_remote_skips_held_ids() {
        let mut group = GroupState::new(spec(0, "hull"), Arc::new(StaticLaw));
        let record = TriangleRecord {
            id: TriangleId(1),
            coords: [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            tag: None,
        };
        assert!(group.append_remote(&record));
        assert!(!group.append_remote(&record));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn retain_drops_everything_not_kept() {
        let mut group = GroupState::new(spec(0, "hull"), Arc::new(StaticLaw));
        for id in 0..4 {
            let offset = id as f64;
            group.append_remote(&TriangleRecord {
                id: TriangleId(id),
                coords: [
                    offset, 0.0, 0.0, offset + 1.0, 0.0, 0.0, offset, 1.0, 0.0,
                ],
                tag: None,
            });
        }
        let keep: HashSet<TriangleId> = [TriangleId(1), TriangleId(3)].into_iter().collect();
        assert_eq!(group.retain(&keep), 2);
        assert_eq!(group.len(), 2);
        assert!(group.contains(TriangleId(3)));
        assert!(!group.contains(TriangleId(0)));
    }
}
