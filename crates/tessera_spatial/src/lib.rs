//! # Tessera Spatial Core
//!
//! Geometry primitives and the KD-tree spatial index for the Tessera mesh
//! partitioner. This crate is pure local computation: no I/O, no messaging,
//! no knowledge of workers — those live in `mesh_store`, which instantiates
//! the index twice (triangles and vertices) per group.
//!
//! ## Components
//!
//! - [`types`] - vectors, axes, and the wire-stable identifier wrappers
//! - [`bbox`] - axis-aligned box algebra with an explicit empty state
//! - [`arena`] / [`element`] - shared-vertex triangle model
//! - [`index`] - the generic KD-tree with range and nearest-neighbor queries
//! - [`dedup`] - tolerance-based vertex deduplication over the vertex index
//!
//! ## Determinism
//!
//! Every predicate in this crate is plain `f64` arithmetic with no
//! platform-dependent fast paths. Workers across the cluster evaluate the
//! same containment tests over the same guard boxes and must agree exactly;
//! migration correctness rests on that agreement.

pub mod arena;
pub mod bbox;
pub mod dedup;
pub mod element;
pub mod error;
pub mod index;
pub mod types;

pub use arena::{Vertex, VertexArena};
pub use bbox::BoundingBox;
pub use dedup::deduplicate_batch;
pub use element::Triangle;
pub use error::SpatialIndexError;
pub use index::{
    IndexEntry, NearestNeighbor, QueryMode, SpatialIndex, TriangleIndex, VertexIndex,
};
pub use types::{Axis, GroupId, TriangleId, Vec3, VertexHandle, WorkerRank};
