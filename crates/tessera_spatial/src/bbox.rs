//! Axis-aligned bounding box algebra.
//!
//! The box carries an explicit empty state (min > max on every axis) that
//! never intersects, contains, or is contained by anything. All predicates
//! are inclusive at the faces: a point sitting exactly on a boundary plane is
//! inside, and two boxes touching at a face are crossed. Every worker in the
//! cluster evaluates these predicates with identical arithmetic; migration
//! correctness depends on that.

use crate::types::{Axis, Vec3};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a box in the empty state.
    ///
    /// The empty box has `min = +INF` and `max = -INF`, so any point added
    /// afterwards snaps both corners onto it and the box stays degenerate
    /// until at least one point has been added.
    pub fn empty() -> Self {
        Self {
            min: Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Creates a box from explicit corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates the tightest box covering all of `points`.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.add_point(*p);
        }
        bbox
    }

    /// Whether this box is in the empty state.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extends the box to cover `point`.
    pub fn add_point(&mut self, point: Vec3) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Extends the box to cover `other` entirely.
    pub fn add_box(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.add_point(other.min);
        self.add_point(other.max);
    }

    /// Whether `point` lies inside the box, boundary included.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Interval-overlap test against `other` on each axis.
    ///
    /// Returns `false` if either box is empty. Face contact counts as
    /// crossing.
    pub fn crossed(&self, other: &BoundingBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// Whether `other` lies entirely inside this box.
    ///
    /// Returns `false` if either box is empty. For axis-aligned queries this
    /// is equivalent to every geometry vertex of the boxed element lying
    /// inside the query, which is what the `Every` search mode relies on.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
            && other.min.z >= self.min.z
            && other.max.z <= self.max.z
    }

    /// Geometric center of the box.
    ///
    /// This is the representative point of an indexed element: the centroid
    /// of a triangle's bbox, or the position itself for a degenerate vertex
    /// box.
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> Vec3 {
        self.max.sub(self.min)
    }

    /// Splits the box into two halves at the midpoint on `axis`.
    ///
    /// Returns `(left, right)` where `left` keeps the min side. Used by the
    /// index when a leaf splits; both halves share the cut plane.
    pub fn halves(&self, axis: Axis) -> (BoundingBox, BoundingBox) {
        let mid = self.center().component(axis);
        let mut left = *self;
        let mut right = *self;
        match axis {
            Axis::X => {
                left.max.x = mid;
                right.min.x = mid;
            }
            Axis::Y => {
                left.max.y = mid;
                right.min.y = mid;
            }
            Axis::Z => {
                left.max.z = mid;
                right.min.z = mid;
            }
        }
        (left, right)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}
