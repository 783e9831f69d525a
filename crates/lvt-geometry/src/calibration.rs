//! Per-sensor extrinsic calibration.
//!
//! Maps a sensor name to the rigid transform from that sensor's local frame
//! into the vehicle frame.  The table is assembled once, conventionally from
//! the first frame of a recording, and is immutable afterwards; share it
//! behind an `Arc` and pass it to every frame-level operation.
//!
//! # Example
//!
//! ```rust
//! use lvt_geometry::calibration::CalibrationTable;
//! use lvt_geometry::pose::{Pose, Quaternion, Vec3};
//!
//! let table = CalibrationTable::builder()
//!     .insert("TOP", Pose::new(Vec3::new(1.4, 0.0, 2.1), Quaternion::identity()).unwrap())
//!     .build();
//!
//! let ego = Pose::new(Vec3::new(100.0, 0.0, 0.0), Quaternion::identity()).unwrap();
//! let top_in_world = table.sensor_to_world("TOP", &ego).unwrap();
//! assert!((top_in_world.translation().x - 101.4).abs() < 1e-12);
//! assert!(table.get("REAR").is_none());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pose::{Pose, compose};

/// Immutable sensor → extrinsic lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable {
    extrinsics: BTreeMap<String, Pose>,
}

impl CalibrationTable {
    pub fn builder() -> CalibrationTableBuilder {
        CalibrationTableBuilder::default()
    }

    /// The sensor-to-vehicle transform for `sensor`.
    pub fn get(&self, sensor: &str) -> Option<&Pose> {
        self.extrinsics.get(sensor)
    }

    /// Sensor names in sorted order.
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.extrinsics.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extrinsics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extrinsics.is_empty()
    }

    /// Sensor-to-world transform at a timestamp whose ego pose is `ego`.
    pub fn sensor_to_world(&self, sensor: &str, ego: &Pose) -> Option<Pose> {
        self.get(sensor).map(|extrinsic| compose(ego, extrinsic))
    }
}

/// Accumulates extrinsics before the table is frozen.
#[derive(Debug, Default)]
pub struct CalibrationTableBuilder {
    extrinsics: BTreeMap<String, Pose>,
}

impl CalibrationTableBuilder {
    /// Register or replace the extrinsic for `sensor`.
    pub fn insert(mut self, sensor: impl Into<String>, extrinsic: Pose) -> Self {
        let sensor = sensor.into();
        if self.extrinsics.insert(sensor.clone(), extrinsic).is_some() {
            debug!(%sensor, "replacing extrinsic calibration");
        }
        self
    }

    pub fn build(self) -> CalibrationTable {
        CalibrationTable {
            extrinsics: self.extrinsics,
        }
    }
}

impl FromIterator<(String, Pose)> for CalibrationTable {
    fn from_iter<I: IntoIterator<Item = (String, Pose)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::builder(), |b, (sensor, pose)| b.insert(sensor, pose))
            .build()
    }
}
