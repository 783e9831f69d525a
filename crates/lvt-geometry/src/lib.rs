//! `lvt-geometry` – the geometric normalization core.
//!
//! Reconciles the coordinate conventions of heterogeneous driving datasets
//! into one canonical representation anchored in the ego vehicle frame.
//! Everything here is a pure function over immutable values: no I/O, no
//! shared state, safe to call from any number of threads.
//!
//! # Modules
//!
//! - [`pose`] – [`Quaternion`][pose::Quaternion] and [`Pose`][pose::Pose]:
//!   canonical scalar-first unit quaternions, matrix decomposition,
//!   composition and inversion of rigid transforms.
//! - [`point_cloud`] – [`transform_point_cloud`][point_cloud::transform_point_cloud]:
//!   batched sensor → vehicle transform of whole lidar sweeps.
//! - [`bbox`] – [`BoundingBox3D`][bbox::BoundingBox3D] and
//!   [`transform_box_to_frame`][bbox::transform_box_to_frame].
//! - [`spatial`] – axis-aligned overlap and center distance between boxes.
//! - [`calibration`] – [`CalibrationTable`][calibration::CalibrationTable]:
//!   immutable per-sensor extrinsics.
//! - [`camera`] – pinhole intrinsics and camera calibration records.

pub mod bbox;
pub mod calibration;
pub mod camera;
pub mod point_cloud;
pub mod pose;
pub mod spatial;

pub use bbox::{BoundingBox3D, BoxSize, transform_box_to_frame};
pub use calibration::CalibrationTable;
pub use point_cloud::{PointCloud, PointCloudFrame, transform_point_cloud};
pub use pose::{
    Pose, Quaternion, Vec3, compose, invert, normalize_quaternion, pose_from_flat,
    pose_from_matrix,
};
pub use spatial::{box_distance, boxes_overlap, points_in_box};
