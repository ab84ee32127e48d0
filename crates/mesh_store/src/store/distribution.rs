//! Initial geometry distribution.
//!
//! The coordinator is the only worker that ever talks to the
//! geometry-source collaborator. It loads every group in full, assigns
//! globally unique triangle ids, builds one index per group over the
//! complete set, and sends each other worker exactly the triangles
//! crossing that worker's guard bbox. It then re-derives its own
//! authoritative local set with the same query against its own guard bbox
//! — the first erase-outbounded pass — so every worker ends up holding
//! precisely the geometry its guard region can see.

use crate::error::{ConfigError, StoreError, TransportError};
use crate::geometry::GeometrySource;
use crate::store::{DistributedStore, StepPhase};
use tessera_spatial::WorkerRank;
use tracing::{debug, info};

impl DistributedStore {
    /// Runs the initial distribution.
    ///
    /// On the coordinator, `source` must be present; every other worker
    /// passes `None` and performs one blocking receive of its subset.
    /// Requires a completed partition exchange.
    pub async fn distribute(
        &mut self,
        source: Option<&dyn GeometrySource>,
    ) -> Result<(), StoreError> {
        if self.world.len() != self.ctx.world_size {
            return Err(TransportError::Protocol(
                "partition exchange must complete before distribution".to_string(),
            )
            .into());
        }
        if self.ctx.is_coordinator(self.settings.coordinator) {
            let source = source.ok_or(ConfigError::MissingGeometry)?;
            self.distribute_as_coordinator(source).await
        } else {
            self.receive_initial_subset().await
        }
    }

    async fn distribute_as_coordinator(
        &mut self,
        source: &dyn GeometrySource,
    ) -> Result<(), StoreError> {
        let leaf_capacity = self.settings.leaf_capacity;

        // Load the complete geometry and index it group by group.
        let mut next_id: i32 = 0;
        for group in &mut self.groups {
            let raw = source.load(&group.spec)?;
            group.load_raw(&raw, &mut next_id)?;
            group.dedup(leaf_capacity)?;
            group.rebuild_index(leaf_capacity);
            debug!(
                group = %group.spec.name,
                triangles = group.len(),
                "group loaded on coordinator"
            );
        }

        // Point-to-point subsets for everyone else, all groups per message.
        for descriptor in self.world.clone() {
            if descriptor.rank == self.ctx.rank {
                continue;
            }
            let payload = self.collect_outbound(&descriptor.guard_bbox(), false, None);
            debug!(
                to = %descriptor.rank,
                triangles = payload.total(),
                "initial subset packed"
            );
            for frame in payload.encode(self.settings.wire_format) {
                self.transport.send(descriptor.rank, frame)?;
            }
        }
        self.transport.wait_outstanding().await?;

        // Re-derive the coordinator's own local set from the same predicate.
        let erased = self.erase_outbounded()?;
        self.phase = StepPhase::Placed;
        info!(
            rank = %self.ctx.rank,
            total = next_id,
            retained = self.groups.iter().map(|g| g.len()).sum::<usize>(),
            erased,
            "initial distribution complete"
        );
        Ok(())
    }

    async fn receive_initial_subset(&mut self) -> Result<(), StoreError> {
        let coordinator = self.settings.coordinator;
        let payload = self.recv_payload(coordinator).await?;
        self.ingest(coordinator, payload);

        let leaf_capacity = self.settings.leaf_capacity;
        for group in &mut self.groups {
            group.dedup(leaf_capacity)?;
            group.rebuild_index(leaf_capacity);
        }
        self.phase = StepPhase::Placed;
        info!(
            rank = %self.ctx.rank,
            received = self.groups.iter().map(|g| g.len()).sum::<usize>(),
            "initial subset received"
        );
        Ok(())
    }

    /// Appends a decoded payload to the group lists; returns
    /// (appended, skipped-as-duplicate).
    pub(crate) fn ingest(
        &mut self,
        from: WorkerRank,
        payload: crate::messaging::wire::MigrationPayload,
    ) -> (u64, u64) {
        let mut appended = 0u64;
        let mut skipped = 0u64;
        for (position, batch) in payload.groups.into_iter().enumerate() {
            let group = &mut self.groups[position];
            for record in &batch.records {
                if group.append_remote(record) {
                    appended += 1;
                } else {
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            debug!(
                rank = %self.ctx.rank,
                %from,
                skipped,
                "duplicate ids skipped during ingest"
            );
        }
        (appended, skipped)
    }
}
