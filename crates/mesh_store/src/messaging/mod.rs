//! Messaging substrate: the positional wire codec and the transport
//! abstraction the migration protocol runs over.

pub mod transport;
pub mod wire;

pub use transport::{LocalCluster, Transport};
pub use wire::{GroupBatch, MigrationPayload, TriangleRecord, WireFormat};
