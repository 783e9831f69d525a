//! Waymo Open Dataset conventions.
//!
//! Laser labels carry an integer object type, a center, `width, length,
//! height` and a heading angle about +Z.  Sensors are addressed by small
//! integer enums.
//!
//! Laser labels are already vehicle-relative, so frames built from them are
//! assembled with [`TargetFrame::Source`](lvt_types::TargetFrame::Source).

use lvt_types::SizeOrder;
use serde::{Deserialize, Serialize};

use super::{AnnotationRecord, OrientationRecord};

/// Object type name, or `"Unknown"` for ids outside the labelled set.
pub fn label_name(type_id: u32) -> &'static str {
    match type_id {
        1 => "Vehicle",
        2 => "Pedestrian",
        3 => "Sign",
        4 => "Cyclist",
        _ => "Unknown",
    }
}

pub fn lidar_name(id: u32) -> &'static str {
    match id {
        1 => "TOP",
        2 => "FRONT",
        3 => "SIDE_LEFT",
        4 => "SIDE_RIGHT",
        5 => "REAR",
        _ => "UNKNOWN",
    }
}

pub fn camera_name(id: u32) -> &'static str {
    match id {
        1 => "FRONT",
        2 => "FRONT_LEFT",
        3 => "FRONT_RIGHT",
        4 => "SIDE_LEFT",
        5 => "SIDE_RIGHT",
        _ => "UNKNOWN",
    }
}

/// One laser label, as stored in a Waymo frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserLabel {
    pub center: [f64; 3],
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub heading: f64,
    #[serde(rename = "type")]
    pub type_id: u32,
}

impl From<&LaserLabel> for AnnotationRecord {
    fn from(label: &LaserLabel) -> Self {
        AnnotationRecord {
            center: label.center,
            size: [label.width, label.length, label.height],
            size_order: SizeOrder::WidthLengthHeight,
            orientation: OrientationRecord::Heading {
                heading: label.heading,
            },
            label: label_name(label.type_id).to_string(),
            confidence: None,
        }
    }
}
