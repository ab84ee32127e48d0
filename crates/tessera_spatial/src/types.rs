//! # Core Type Definitions
//!
//! This module contains the fundamental types used throughout the spatial
//! core. These types provide the building blocks for mesh representation,
//! worker identification, and spatial indexing.
//!
//! ## Key Types
//!
//! - [`Vec3`] - 3D position/direction with double precision
//! - [`Axis`] - coordinate axis selector with the cyclic advance used by the
//!   KD-tree split policy
//! - [`TriangleId`] / [`GroupId`] - wire-stable 32-bit identifiers
//! - [`WorkerRank`] - identity of one worker process in the cluster
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent ID confusion (TriangleId vs GroupId)
//! - **Wire Stability**: Identifiers that cross worker boundaries are `i32`,
//!   matching the migration wire layout
//! - **Precision**: Double-precision coordinates, fixed cluster-wide at build
//!   time

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a triangle.
///
/// Triangle ids are assigned once at load time by the coordinator, are
/// globally unique across all groups, and stay stable across migration and
/// index rebuilds. They are transmitted as signed 32-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriangleId(pub i32);

impl std::fmt::Display for TriangleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a named group within the hierarchy.
///
/// Group ids are established once during load and are identical on every
/// worker; migration headers refer to groups positionally by this id, never
/// by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub i32);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rank of one worker process within the fixed cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerRank(pub usize);

impl std::fmt::Display for WorkerRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle into a group's [`VertexArena`](crate::arena::VertexArena).
///
/// Triangles reference their corners by handle so that adjacent triangles can
/// share vertex storage; the handle is only meaningful together with the
/// arena that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexHandle(pub u32);

impl VertexHandle {
    /// Index form used for arena slot access.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// A coordinate axis, in the fixed X → Y → Z split order of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Advances cyclically: X → Y → Z → X.
    ///
    /// This is the axis progression applied every time a KD-tree node splits.
    pub fn next(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }
}

/// Represents a 3D position or direction.
///
/// Uses double-precision floating point; the coordinate width is fixed
/// cluster-wide at build time and every worker must agree on it, since raw
/// coordinates cross the wire during migration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector with the specified coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (0, 0, 0).
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Returns the component along `axis`.
    pub fn component(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Calculates the Euclidean distance to another vector.
    pub fn distance(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Component-wise sum.
    pub fn add(&self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Component-wise difference.
    pub fn sub(&self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Uniform scale.
    pub fn scale(&self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Cross product with another vector.
    pub fn cross(&self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Vector length.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_cycles_x_y_z() {
        assert_eq!(Axis::X.next(), Axis::Y);
        assert_eq!(Axis::Y.next(), Axis::Z);
        assert_eq!(Axis::Z.next(), Axis::X);
    }

    #[test]
    fn vec3_component_selection() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.component(Axis::X), 1.0);
        assert_eq!(v.component(Axis::Y), 2.0);
        assert_eq!(v.component(Axis::Z), 3.0);
    }

    #[test]
    fn vec3_cross_is_orthogonal() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(b);
        assert_eq!(c, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn vec3_distance() {
        let a = Vec3::new(0.0, 3.0, 0.0);
        let b = Vec3::new(4.0, 0.0, 0.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
    }
}
