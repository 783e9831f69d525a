//! Spatial relations between boxes, used when comparing predictions against
//! ground truth.
//!
//! [`boxes_overlap`] is an **axis-aligned approximation**: each box is
//! treated as `center ± size / 2` along the canonical x/y/z axes and its
//! orientation is ignored.  A rotated box therefore overlaps whatever its
//! unrotated footprint overlaps.  It is not an oriented-box intersection test.
//!
//! [`box_distance`] measures center to center, not surface to surface.
//!
//! Both are pure and symmetric in their arguments.  Both assume the two boxes
//! are expressed in the same frame.
//!
//! # Example
//!
//! ```rust
//! use lvt_geometry::bbox::{BoundingBox3D, BoxSize};
//! use lvt_geometry::pose::{Quaternion, Vec3};
//! use lvt_geometry::spatial::{box_distance, boxes_overlap};
//!
//! let cube = |x: f64| {
//!     BoundingBox3D::ground_truth(Vec3::new(x, x, x), BoxSize::new(2.0, 2.0, 2.0), Quaternion::identity(), "car")
//!         .unwrap()
//! };
//!
//! assert!(boxes_overlap(&cube(0.0), &cube(1.0)));
//! assert!(!boxes_overlap(&cube(0.0), &cube(3.0)));
//! assert!((box_distance(&cube(0.0), &cube(1.0)) - 3f64.sqrt()).abs() < 1e-12);
//! ```

use crate::bbox::BoundingBox3D;
use crate::point_cloud::PointCloud;
use crate::pose::Vec3;

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from its two opposite corners.
    ///
    /// The corners are normalised so that `min ≤ max` per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// The axis-aligned footprint of `b`, ignoring its orientation.
    pub fn from_box(b: &BoundingBox3D) -> Self {
        let half = b.size().half_extents();
        Self::new(b.origin().sub(half), b.origin().add(half))
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// True when `other` overlaps (intersects or touches) this box.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Axis-aligned overlap of two boxes; touching faces count as overlapping.
pub fn boxes_overlap(a: &BoundingBox3D, b: &BoundingBox3D) -> bool {
    Aabb::from_box(a).overlaps(&Aabb::from_box(b))
}

/// Euclidean distance between the two box centers.
pub fn box_distance(a: &BoundingBox3D, b: &BoundingBox3D) -> f64 {
    a.origin().sub(b.origin()).norm()
}

/// Number of points of `cloud` inside the axis-aligned footprint of `b`.
pub fn points_in_box(cloud: &PointCloud, b: &BoundingBox3D) -> usize {
    let aabb = Aabb::from_box(b);
    cloud.iter().filter(|p| aabb.contains_point(*p)).count()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
