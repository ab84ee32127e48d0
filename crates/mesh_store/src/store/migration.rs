//! Per-step move and migrate.
//!
//! The two halves of the step cycle. `move_step` is purely local:
//! validate, snapshot exclusions, displace, rebuild. `migrate` is the only
//! distributed part of a step and follows a strict order — every outbound
//! send to every neighbor is issued before blocking on any receive, which
//! is what keeps a pair of workers from deadlocking on each other; each
//! neighbor's header must be fully received before its variable-length
//! arrays, because the array sizes come from the header; and the final
//! wait on outstanding sends is the point until which outbound buffers
//! must stay valid.

use crate::error::{StoreError, ValidationError};
use crate::store::{DistributedStore, StepPhase, StepStats};
use motion_system::StepParams;
use std::collections::HashSet;
use std::sync::Arc;
use tessera_spatial::{QueryMode, TriangleId};
use tracing::{debug, info};

impl DistributedStore {
    /// Advances the geometry one step.
    ///
    /// 1. Fail-fast validation, before any mutation: step order, time
    ///    delta, phase.
    /// 2. Exclusion snapshot: for every movable group and every neighbor,
    ///    the ids currently crossing that neighbor's guard bbox — taken
    ///    before geometry changes, so triangles already straddling a
    ///    boundary are not treated as newly arrived by the next
    ///    [`migrate`](DistributedStore::migrate).
    /// 3. Each movable group's motion law displaces its vertices in place.
    /// 4. Each movable group's index is rebuilt from scratch; geometry
    ///    change invalidates every bbox-derived structure and there is no
    ///    incremental repair.
    pub fn move_step(&mut self, params: &StepParams) -> Result<(), StoreError> {
        if params.next_step <= params.current_step {
            return Err(ValidationError::InvalidStepOrder {
                current: params.current_step,
                next: params.next_step,
            }
            .into());
        }
        if params.delta_t <= 0.0 {
            return Err(ValidationError::InvalidTimeDelta {
                delta_t: params.delta_t,
            }
            .into());
        }
        if self.phase != StepPhase::Placed {
            return Err(ValidationError::Phase {
                expected: StepPhase::Placed,
                actual: self.phase,
            }
            .into());
        }

        self.exclusions.clear();
        for group in &self.groups {
            if !group.spec.movable {
                continue;
            }
            for neighbor in &self.neighbors {
                let ids: HashSet<TriangleId> = group
                    .index
                    .search(&neighbor.guard_bbox(), QueryMode::Any)
                    .into_iter()
                    .collect();
                self.exclusions.insert(neighbor.rank, group.spec.id, ids);
            }
        }

        let leaf_capacity = self.settings.leaf_capacity;
        for group in &mut self.groups {
            if !group.spec.movable {
                continue;
            }
            let law = Arc::clone(group.law());
            law.move_vertices(group.arena.vertices_mut(), params)?;
            group.rebuild_index(leaf_capacity);
        }

        self.current_step = params.next_step;
        self.phase = StepPhase::Moved;
        debug!(rank = %self.ctx.rank, step = self.current_step, "geometry moved");
        Ok(())
    }

    /// Exchanges boundary-crossing triangles with every neighbor and
    /// settles the local set.
    ///
    /// Returns the step's migration counters. On success the store is back
    /// in `PLACED` with its local set equal to exactly the triangles
    /// crossing the local guard bbox.
    pub async fn migrate(&mut self) -> Result<StepStats, StoreError> {
        if self.phase != StepPhase::Moved {
            return Err(ValidationError::Phase {
                expected: StepPhase::Moved,
                actual: self.phase,
            }
            .into());
        }

        let mut stats = StepStats::default();
        let neighbors = self.neighbors.clone();

        // Every send to every neighbor goes out before any receive.
        for neighbor in &neighbors {
            let payload =
                self.collect_outbound(&neighbor.guard_bbox(), true, Some(neighbor.rank));
            stats.sent += payload.total() as u64;
            for frame in payload.encode(self.settings.wire_format) {
                self.transport.send(neighbor.rank, frame)?;
            }
        }

        // Header before body per neighbor; pairs interleave freely.
        for neighbor in &neighbors {
            let payload = self.recv_payload(neighbor.rank).await?;
            let (appended, skipped) = self.ingest(neighbor.rank, payload);
            stats.received += appended;
            stats.skipped += skipped;
        }

        self.transport.wait_outstanding().await?;
        self.phase = StepPhase::Migrated;

        let leaf_capacity = self.settings.leaf_capacity;
        for group in &mut self.groups {
            if !group.spec.movable {
                continue;
            }
            group.dedup(leaf_capacity)?;
            group.rebuild_index(leaf_capacity);
        }
        stats.erased = self.erase_outbounded()? as u64;
        self.phase = StepPhase::Placed;

        info!(
            rank = %self.ctx.rank,
            step = self.current_step,
            sent = stats.sent,
            received = stats.received,
            skipped = stats.skipped,
            erased = stats.erased,
            "migration round complete"
        );
        Ok(stats)
    }
}
