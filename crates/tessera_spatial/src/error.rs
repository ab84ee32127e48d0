//! Error types for the spatial core.

use thiserror::Error;

/// Errors raised by the spatial index.
///
/// The index never fails on queries — searches over empty or degenerate
/// trees return empty results. The only failure mode is structural and
/// defensive.
#[derive(Debug, Error)]
pub enum SpatialIndexError {
    /// Incremental insertion could not reach a leaf. Unreachable on a
    /// well-formed tree; treated as fatal by every caller.
    #[error("No index leaf reachable for insertion")]
    NodeNotFound,
}
