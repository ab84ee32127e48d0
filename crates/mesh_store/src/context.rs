//! Worker identity context.
//!
//! The context is an explicit value threaded through construction and used
//! as a tracing span field, so every log line carries the rank without any
//! process-wide mutable state.

use tessera_spatial::WorkerRank;

/// Identity of the local worker within the fixed cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    /// Rank of this worker
    pub rank: WorkerRank,
    /// Total number of workers in the cluster
    pub world_size: usize,
}

impl WorkerContext {
    /// Creates a context for `rank` in a cluster of `world_size` workers.
    pub fn new(rank: WorkerRank, world_size: usize) -> Self {
        Self { rank, world_size }
    }

    /// Whether this worker is the designated coordinator.
    pub fn is_coordinator(&self, coordinator: WorkerRank) -> bool {
        self.rank == coordinator
    }

    /// Span that stamps the rank onto everything logged inside it.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("worker", rank = %self.rank)
    }
}
