//! Error types for the motion system.

use thiserror::Error;

/// Errors raised while resolving a motion class from the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No factory is registered under the requested class name.
    #[error("Unknown motion class: {0}")]
    UnknownClass(String),

    /// The factory rejected the group's motion parameters.
    #[error("Invalid parameters for motion class '{class}': {reason}")]
    InvalidParams {
        /// Class name whose factory rejected the parameters
        class: String,
        /// Human-readable rejection reason
        reason: String,
    },
}

/// Errors raised while a motion law executes.
#[derive(Debug, Error)]
pub enum MotionError {
    /// The law could not be applied to the group's geometry.
    #[error("Motion execution error: {0}")]
    Execution(String),
}
