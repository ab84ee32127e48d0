//! # Distributed triangle store
//!
//! One store instance lives on each worker. It owns, per named group, the
//! local triangle subset, its vertex arena, and its spatial index, and it
//! drives the two distributed flows: initial distribution from the
//! coordinator and the per-step move/migrate cycle against the fixed
//! neighbor set.
//!
//! ## Step phase machine
//!
//! ```text
//! PLACED ──move_step──▶ MOVED ──migrate──▶ MIGRATED ──erase──▶ PLACED
//! ```
//!
//! `move_step` validates its parameters before touching anything, snapshots
//! the per-neighbor exclusion sets from pre-motion geometry, applies each
//! movable group's motion law, and rebuilds the affected indices.
//! `migrate` exchanges boundary-crossing triangles with every neighbor —
//! all sends issued before any receive — then rebuilds and runs
//! erase-outbounded, returning the store to `PLACED`.
//!
//! ## Ownership
//!
//! There is no transactional hand-off of a triangle between workers. Both
//! sides evaluate the same containment predicate over the same guard
//! boxes; the receiver appends, and the sender drops its copy only through
//! its own erase-outbounded pass. Transient duplication within a round is
//! expected and resolved by erase.

mod distribution;
mod migration;

use crate::context::WorkerContext;
use crate::error::{ConfigError, StoreError, TransportError};
use crate::group::{validate_hierarchy, GroupConfig, GroupState};
use crate::messaging::transport::Transport;
use crate::messaging::wire::{self, GroupBatch, MigrationPayload, TriangleRecord, WireFormat};
use crate::partition::Partition;
use bytes::Bytes;
use motion_system::MotionRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_spatial::{BoundingBox, GroupId, QueryMode, TriangleId, WorkerRank};
use tracing::{debug, info};

/// Where the store sits in the per-step cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// Geometry is settled and consistent with every index
    Placed,
    /// Motion has been applied; boundary triangles not yet exchanged
    Moved,
    /// Neighbor exchange finished; erase-outbounded still pending
    Migrated,
}

impl std::fmt::Display for StepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepPhase::Placed => "PLACED",
            StepPhase::Moved => "MOVED",
            StepPhase::Migrated => "MIGRATED",
        };
        write!(f, "{name}")
    }
}

/// Per-step migration counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Triangles packed and sent to neighbors
    pub sent: u64,
    /// Triangles received and appended
    pub received: u64,
    /// Received triangles skipped because their id was already held
    pub skipped: u64,
    /// Triangles dropped by erase-outbounded
    pub erased: u64,
}

/// Per-neighbor, per-group sets of triangle ids withheld from one
/// migration round.
///
/// Snapshotted by `move_step` from pre-motion geometry: a triangle already
/// known to straddle a neighbor boundary must not be treated as newly
/// arrived by the following `migrate`.
#[derive(Debug, Default)]
pub struct ExclusionSet {
    entries: HashMap<(WorkerRank, GroupId), HashSet<TriangleId>>,
}

impl ExclusionSet {
    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Records the snapshot for one neighbor and group.
    pub fn insert(&mut self, neighbor: WorkerRank, group: GroupId, ids: HashSet<TriangleId>) {
        self.entries.insert((neighbor, group), ids);
    }

    /// Whether `id` is withheld from `neighbor` for `group` this round.
    pub fn contains(&self, neighbor: WorkerRank, group: GroupId, id: TriangleId) -> bool {
        self.entries
            .get(&(neighbor, group))
            .is_some_and(|ids| ids.contains(&id))
    }
}

/// Store-level knobs, identical cluster-wide.
#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
    /// KD-tree leaf capacity
    pub leaf_capacity: usize,
    /// Negotiated wire format
    pub wire_format: WireFormat,
    /// Rank of the worker that performs the initial distribution
    pub coordinator: WorkerRank,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            leaf_capacity: 8,
            wire_format: WireFormat::default(),
            coordinator: WorkerRank(0),
        }
    }
}

/// The per-worker distributed store.
pub struct DistributedStore {
    pub(crate) ctx: WorkerContext,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) partition: Partition,
    pub(crate) world: Vec<Partition>,
    pub(crate) neighbors: Vec<Partition>,
    pub(crate) groups: Vec<GroupState>,
    pub(crate) settings: StoreSettings,
    pub(crate) phase: StepPhase,
    pub(crate) current_step: u64,
    pub(crate) exclusions: ExclusionSet,
}

impl DistributedStore {
    /// Creates a store from the local worker's configuration.
    ///
    /// Validates the group hierarchy and resolves each group's motion
    /// class through `registry`; both must already be identical on every
    /// worker, since message headers refer to groups positionally.
    pub fn new(
        ctx: WorkerContext,
        transport: Arc<dyn Transport>,
        partition: Partition,
        groups: Vec<GroupConfig>,
        registry: &MotionRegistry,
        settings: StoreSettings,
    ) -> Result<Self, StoreError> {
        validate_hierarchy(&groups)?;
        let mut states = Vec::with_capacity(groups.len());
        for config in groups {
            let law = registry
                .create(&config.motion_class, &config.motion_params)
                .map_err(ConfigError::Motion)?;
            states.push(GroupState::new(config.spec, law));
        }
        Ok(Self {
            ctx,
            transport,
            partition,
            world: Vec::new(),
            neighbors: Vec::new(),
            groups: states,
            settings,
            phase: StepPhase::Placed,
            current_step: 0,
            exclusions: ExclusionSet::default(),
        })
    }

    /// Exchanges partition descriptors with every worker and fixes the
    /// neighbor set for the run.
    ///
    /// One all-to-all collective; each worker then filters the received
    /// world set to the partitions whose guard bbox crosses its own.
    pub async fn exchange_partitions(&mut self) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(&self.partition)
            .map_err(|e| TransportError::Collective(format!("partition encode: {e}")))?;
        let gathered = self.transport.all_gather(Bytes::from(encoded)).await?;

        let mut world = Vec::with_capacity(gathered.len());
        for (rank, frame) in gathered.iter().enumerate() {
            let descriptor: Partition = serde_json::from_slice(frame).map_err(|e| {
                TransportError::Protocol(format!(
                    "partition descriptor from worker {rank}: {e}"
                ))
            })?;
            if descriptor.rank.0 != rank {
                return Err(TransportError::Protocol(format!(
                    "descriptor from worker {rank} claims rank {}",
                    descriptor.rank
                ))
                .into());
            }
            world.push(descriptor);
        }

        self.neighbors = world
            .iter()
            .filter(|p| self.partition.is_neighbor_of(p))
            .cloned()
            .collect();
        self.world = world;
        info!(
            rank = %self.ctx.rank,
            neighbors = self.neighbors.len(),
            "partition exchange complete"
        );
        Ok(())
    }

    /// Drops every local triangle whose geometry no longer crosses the
    /// local guard-cell bbox; returns how many were erased.
    ///
    /// Idempotent while the geometry stands still: the surviving set is
    /// exactly the triangles crossing the guard bbox, so a second pass
    /// finds nothing to drop.
    pub fn erase_outbounded(&mut self) -> Result<usize, StoreError> {
        let guard_bbox = self.partition.guard_bbox();
        let leaf_capacity = self.settings.leaf_capacity;
        let mut erased = 0usize;
        for group in &mut self.groups {
            let keep: HashSet<TriangleId> = group
                .index
                .search(&guard_bbox, QueryMode::Any)
                .into_iter()
                .collect();
            if keep.len() == group.len() {
                continue;
            }
            erased += group.retain(&keep);
            group.dedup(leaf_capacity)?;
            group.rebuild_index(leaf_capacity);
        }
        if erased > 0 {
            debug!(rank = %self.ctx.rank, erased, "erase-outbounded dropped departed triangles");
        }
        Ok(erased)
    }

    /// Packs every group's triangles crossing `target` into a payload in
    /// the shared group order, zero-count groups included.
    pub(crate) fn collect_outbound(
        &self,
        target: &BoundingBox,
        movable_only: bool,
        exclude_for: Option<WorkerRank>,
    ) -> MigrationPayload {
        let mut batches = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let mut records = Vec::new();
            if !movable_only || group.spec.movable {
                let hits = group.index.search(target, QueryMode::Any);
                if !hits.is_empty() {
                    let by_id = group.by_id();
                    for id in hits {
                        if let Some(neighbor) = exclude_for {
                            if self.exclusions.contains(neighbor, group.spec.id, id) {
                                continue;
                            }
                        }
                        if let Some(triangle) = by_id.get(&id) {
                            records.push(TriangleRecord {
                                id,
                                coords: triangle.coords(&group.arena),
                                tag: triangle.tag,
                            });
                        }
                    }
                }
            }
            batches.push(GroupBatch {
                group_id: group.spec.id,
                records,
            });
        }
        MigrationPayload { groups: batches }
    }

    /// Receives one complete per-destination message from `from`: header
    /// first, then the id and coordinate arrays sized from the header
    /// totals, then the tag array when the format carries one.
    pub(crate) async fn recv_payload(
        &self,
        from: WorkerRank,
    ) -> Result<MigrationPayload, StoreError> {
        let expected: Vec<GroupId> = self.groups.iter().map(|g| g.spec.id).collect();
        let header = self.transport.recv(from).await?;
        let counts = wire::decode_header(&header, &expected)?;
        let total: usize = counts.iter().sum();
        let ids = wire::decode_ids(&self.transport.recv(from).await?, total)?;
        let coords = wire::decode_coords(&self.transport.recv(from).await?, total)?;
        let tags = if self.settings.wire_format.user_tags {
            Some(wire::decode_tags(&self.transport.recv(from).await?, total)?)
        } else {
            None
        };
        Ok(wire::assemble(&expected, &counts, ids, coords, tags))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The local worker's identity.
    pub fn context(&self) -> WorkerContext {
        self.ctx
    }

    /// The local partition descriptor.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// The fixed neighbor set; empty before the partition exchange.
    pub fn neighbors(&self) -> &[Partition] {
        &self.neighbors
    }

    /// Every worker's partition; empty before the partition exchange.
    pub fn world(&self) -> &[Partition] {
        &self.world
    }

    /// The ordered group list.
    pub fn groups(&self) -> &[GroupState] {
        &self.groups
    }

    /// Looks a group up by name.
    pub fn group(&self, name: &str) -> Result<&GroupState, ConfigError> {
        self.groups
            .iter()
            .find(|g| g.spec.name == name)
            .ok_or_else(|| ConfigError::GroupNotFound(name.to_string()))
    }

    /// Current phase in the step cycle.
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// Step the geometry currently sits at.
    pub fn current_step(&self) -> u64 {
        self.current_step
    }
}

impl std::fmt::Debug for DistributedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedStore")
            .field("rank", &self.ctx.rank)
            .field("phase", &self.phase)
            .field("step", &self.current_step)
            .field("groups", &self.groups.len())
            .field("neighbors", &self.neighbors.len())
            .finish()
    }
}
