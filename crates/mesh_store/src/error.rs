//! Error types and handling for the distributed store.
//!
//! The taxonomy separates pre-mutation validation failures (recoverable by
//! the caller fixing its inputs) from transport failures, which are always
//! fatal: partial delivery leaves workers permanently inconsistent, so the
//! run aborts rather than retrying.

use crate::store::StepPhase;
use motion_system::{MotionError, RegistryError};
use tessera_spatial::{GroupId, SpatialIndexError, WorkerRank};
use thiserror::Error;

/// Step-parameter and phase-machine violations.
///
/// Always raised before any mutation, so a failed call leaves the store
/// exactly as it was.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// `next_step` does not advance past `current_step`
    #[error("Invalid step order: next step {next} must exceed current step {current}")]
    InvalidStepOrder {
        /// Step the caller claims the geometry sits at
        current: u64,
        /// Step the caller asked to advance to
        next: u64,
    },

    /// Non-positive time delta
    #[error("Invalid time delta: {delta_t} must be positive")]
    InvalidTimeDelta {
        /// The rejected delta
        delta_t: f64,
    },

    /// Operation called out of the `Placed → Moved → Migrated` order
    #[error("Invalid phase: operation requires {expected}, store is {actual}")]
    Phase {
        /// Phase the operation requires
        expected: StepPhase,
        /// Phase the store is actually in
        actual: StepPhase,
    },
}

/// Group-hierarchy and load-time configuration failures. Abort the load.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two groups share a name
    #[error("Duplicate group name: {0}")]
    DuplicateGroupName(String),

    /// Two groups share an id
    #[error("Duplicate group id: {0}")]
    DuplicateGroupId(GroupId),

    /// A referenced group does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// The geometry source produced an inconsistent group payload
    #[error("Geometry load failed for group '{group}': {reason}")]
    GeometryLoad {
        /// Name of the group being loaded
        group: String,
        /// What was inconsistent
        reason: String,
    },

    /// The coordinator was started without a geometry source
    #[error("No geometry source available on the coordinator")]
    MissingGeometry,

    /// Motion class resolution failed
    #[error(transparent)]
    Motion(#[from] RegistryError),
}

/// Collective or point-to-point messaging failures. Fatal; the migration
/// protocol has no partial-failure recovery path.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel to a peer closed underneath us
    #[error("Channel to worker {0} closed")]
    ChannelClosed(WorkerRank),

    /// A frame failed positional validation
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The startup all-to-all exchange failed
    #[error("Collective exchange failed: {0}")]
    Collective(String),
}

/// Top-level error surface of the distributed store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Pre-mutation validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Fatal messaging failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Defensive spatial-index failure; treated as fatal
    #[error("Spatial index error: {0}")]
    Index(#[from] SpatialIndexError),

    /// Load-time configuration failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Motion-law execution failure
    #[error("Motion error: {0}")]
    Motion(#[from] MotionError),
}
