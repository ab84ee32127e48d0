//! # Tessera Mesh Store
//!
//! The distributed half of the Tessera mesh partitioner. Each worker in
//! the fixed cluster owns one [`DistributedStore`]: the local triangle
//! subset of every named group, the spatial indices over those subsets,
//! and the protocol state for keeping the subsets consistent as geometry
//! moves across partition boundaries.
//!
//! ## Protocol surface
//!
//! - [`Partition`] descriptors exchanged once at startup over an
//!   all-to-all collective; neighbor sets are fixed for the run.
//! - Initial distribution: the coordinator loads the full geometry and
//!   sends each worker the subset crossing its guard region.
//! - Per step: [`DistributedStore::move_step`] applies motion locally,
//!   then [`DistributedStore::migrate`] exchanges boundary-crossing
//!   triangles with every neighbor and erase-outbounded settles the local
//!   sets.
//!
//! ## Failure model
//!
//! Transport failures are fatal. Both validation and the phase machine
//! fail before mutating anything, so a rejected call leaves the store
//! untouched; but once frames are in flight there is no partial-failure
//! recovery — the run aborts rather than retrying.

pub mod context;
pub mod error;
pub mod geometry;
pub mod group;
pub mod messaging;
pub mod partition;
pub mod store;

// Include tests
mod tests;

pub use context::WorkerContext;
pub use error::{ConfigError, StoreError, TransportError, ValidationError};
pub use geometry::{GeometrySource, RawGroupGeometry};
pub use group::{GroupConfig, GroupSpec, GroupState};
pub use messaging::transport::{LocalCluster, LocalTransport, Transport};
pub use messaging::wire::{GroupBatch, MigrationPayload, TriangleRecord, WireFormat};
pub use partition::Partition;
pub use store::{DistributedStore, ExclusionSet, StepPhase, StepStats, StoreSettings};
