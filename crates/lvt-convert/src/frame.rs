//! The canonical, vehicle-anchored output of one captured timestamp.

use std::collections::BTreeMap;

use lvt_geometry::{BoundingBox3D, PointCloudFrame, Pose};
use serde::{Deserialize, Serialize};

use crate::error::Failure;

/// One converted frame.
///
/// Box lists keep source order.  Empty lists and empty sweeps are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_num: u64,
    /// Ego (vehicle) pose in the world frame at this timestamp.
    pub ego_pose: Pose,
    pub ground_truth: Vec<BoundingBox3D>,
    pub predicted: Vec<BoundingBox3D>,
    /// Per-sensor sweeps, already in the vehicle frame.
    pub point_clouds: BTreeMap<String, PointCloudFrame>,
}

impl Frame {
    /// Total number of lidar points across all sensors.
    pub fn point_count(&self) -> usize {
        self.point_clouds.values().map(|pc| pc.points.len()).sum()
    }
}

/// A converted frame plus whatever was skipped while building it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledFrame {
    pub frame: Frame,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
}
