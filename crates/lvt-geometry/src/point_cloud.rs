//! Bulk rigid transform of lidar point sets.
//!
//! A [`PointCloud`] keeps its points as the columns of a `3 × N` matrix so
//! that moving a whole sweep from the sensor frame into the vehicle frame is
//! one matrix product plus a broadcast translation, instead of `N` separate
//! quaternion rotations.
//!
//! Only xyz survives the transform.  Per-point side channels (intensity, ring
//! index, timestamps) are not carried; callers that need them keep them in a
//! parallel buffer indexed like the cloud.
//!
//! # Example
//!
//! ```rust
//! use lvt_geometry::point_cloud::{PointCloud, transform_point_cloud};
//! use lvt_geometry::pose::{Pose, Quaternion, Vec3};
//!
//! let lidar_to_vehicle = Pose::new(Vec3::new(0.0, 0.0, 1.8), Quaternion::identity()).unwrap();
//! let sweep = PointCloud::from_points(&[[1.0, 0.0, 0.0], [0.0, 2.0, -1.8]]);
//!
//! let in_vehicle = transform_point_cloud(&sweep, &lidar_to_vehicle);
//! assert_eq!(in_vehicle.to_vec(), vec![[1.0, 0.0, 1.8], [0.0, 2.0, 0.0]]);
//! ```

use nalgebra::{Matrix3xX, Vector3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::pose::{Pose, Vec3};

/// An ordered set of 3-D points, one per matrix column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<[f64; 3]>", into = "Vec<[f64; 3]>")]
pub struct PointCloud {
    points: Matrix3xX<f64>,
}

impl PointCloud {
    pub fn new(points: Matrix3xX<f64>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::new(Matrix3xX::zeros(0))
    }

    /// Build a cloud from row-style `[x, y, z]` points, keeping their order.
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        Self::new(Matrix3xX::from_iterator(
            points.len(),
            points.iter().flatten().copied(),
        ))
    }

    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_matrix(&self) -> &Matrix3xX<f64> {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<Vec3> {
        (index < self.len()).then(|| {
            let c = self.points.column(index);
            Vec3::new(c[0], c[1], c[2])
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points
            .column_iter()
            .map(|c| Vec3::new(c[0], c[1], c[2]))
    }

    pub fn to_vec(&self) -> Vec<[f64; 3]> {
        self.iter().map(Vec3::to_array).collect()
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<[f64; 3]>> for PointCloud {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::from_points(&points)
    }
}

impl From<PointCloud> for Vec<[f64; 3]> {
    fn from(cloud: PointCloud) -> Self {
        cloud.to_vec()
    }
}

/// Re-express every point of `cloud` through `pose`:
/// `p' = rotate(p, pose.rotation) + pose.translation`.
///
/// Point count and order are preserved; an empty cloud yields an empty cloud.
pub fn transform_point_cloud(cloud: &PointCloud, pose: &Pose) -> PointCloud {
    trace!(points = cloud.len(), "transforming point cloud");
    let rotation = pose.rotation().to_rotation_matrix();
    let t = pose.translation();
    let translation = Vector3::new(t.x, t.y, t.z);

    let mut out = rotation * &cloud.points;
    for mut column in out.column_iter_mut() {
        column += &translation;
    }
    PointCloud::new(out)
}

/// One sensor's sweep for one frame, expressed in the vehicle frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudFrame {
    pub sensor: String,
    pub frame_num: u64,
    pub points: PointCloud,
}

impl PointCloudFrame {
    /// Move a sensor-local sweep into the vehicle frame using the sensor's
    /// extrinsic calibration.
    pub fn from_sensor(
        sensor: impl Into<String>,
        frame_num: u64,
        local: &PointCloud,
        extrinsic: &Pose,
    ) -> Self {
        Self {
            sensor: sensor.into(),
            frame_num,
            points: transform_point_cloud(local, extrinsic),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
