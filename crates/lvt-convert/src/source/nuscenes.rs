//! nuScenes conventions.
//!
//! Sample annotations live in the world frame with scalar-first quaternions
//! and `width, length, height` sizes.  Ego poses are given per lidar sweep.

use lvt_types::{QuaternionOrder, SizeOrder};
use serde::{Deserialize, Serialize};

use super::{AnnotationRecord, OrientationRecord, PoseRecord};

/// The lidar channel every sample is keyed on.
pub const LIDAR_CHANNEL: &str = "LIDAR_TOP";

pub const CAMERA_CHANNELS: [&str; 6] = [
    "CAM_FRONT",
    "CAM_FRONT_RIGHT",
    "CAM_BACK_RIGHT",
    "CAM_BACK",
    "CAM_BACK_LEFT",
    "CAM_FRONT_LEFT",
];

/// An `ego_pose` or `calibrated_sensor` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEntry {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl From<&PoseEntry> for PoseRecord {
    fn from(entry: &PoseEntry) -> Self {
        PoseRecord::Components {
            translation: entry.translation,
            rotation: entry.rotation,
            order: QuaternionOrder::ScalarFirst,
        }
    }
}

/// A `sample_annotation` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAnnotation {
    pub translation: [f64; 3],
    pub size: [f64; 3],
    pub rotation: [f64; 4],
    pub category_name: String,
}

impl From<&SampleAnnotation> for AnnotationRecord {
    fn from(ann: &SampleAnnotation) -> Self {
        AnnotationRecord {
            center: ann.translation,
            size: ann.size,
            size_order: SizeOrder::WidthLengthHeight,
            orientation: OrientationRecord::Quaternion {
                rotation: ann.rotation,
                order: QuaternionOrder::ScalarFirst,
            },
            label: ann.category_name.clone(),
            confidence: None,
        }
    }
}
