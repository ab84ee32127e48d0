//! # Tessera Motion System
//!
//! Group-class polymorphism for the Tessera mesh partitioner. Each named
//! group carries a motion class that governs how its geometry evolves per
//! simulation step; the distributed store invokes the class through the
//! [`MotionLaw`] capability interface and resolves classes by name through
//! an explicitly owned [`MotionRegistry`].
//!
//! There is no dynamic loading here: classes are compiled-in variants
//! registered as factories, keeping the worker binary self-contained and
//! identical across the cluster.

pub mod builtin;
pub mod error;
pub mod law;
pub mod registry;

pub use builtin::{OscillateLaw, StaticLaw, TranslateLaw};
pub use error::{MotionError, RegistryError};
pub use law::{MotionLaw, StepParams};
pub use registry::{MotionFactory, MotionRegistry};
