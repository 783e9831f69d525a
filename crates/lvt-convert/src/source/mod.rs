//! Raw per-frame records, as handed over by dataset readers.
//!
//! These types are the boundary: every source convention (flattened 4×4
//! matrices, scalar-last quaternions, heading angles, width-first box sizes,
//! parallel annotation arrays) is accepted here and converted into the
//! canonical geometry types exactly once.
//!
//! # Example
//!
//! ```rust
//! use lvt_convert::source::RawFrame;
//!
//! let raw: RawFrame = serde_json::from_str(r#"{
//!     "frame_num": 0,
//!     "ego_pose": { "translation": [1.0, 0.0, 0.0], "rotation": [1.0, 0.0, 0.0, 0.0] },
//!     "ground_truth": [
//!         { "center": [2.0, 0.0, 0.0], "size": [1.9, 4.5, 1.6], "size_order": "width_length_height",
//!           "orientation": { "heading": 0.0 }, "label": "Vehicle" }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(raw.frame_num, 0);
//! assert!(raw.point_clouds.is_empty());
//! ```

pub mod nuscenes;
pub mod waymo;

use std::collections::BTreeMap;

use lvt_geometry::camera::{CameraCalibration, CameraIntrinsics};
use lvt_geometry::{BoundingBox3D, BoxSize, PointCloud, Pose, Quaternion, Vec3, normalize_quaternion};
use lvt_types::{BoxCategory, GROUND_TRUTH_CONFIDENCE, GeometryError, QuaternionOrder, SizeOrder};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Poses
// ────────────────────────────────────────────────────────────────────────────

/// A pose as a source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoseRecord {
    /// Row-major flattened 4×4 homogeneous transform.
    Matrix { transform: Vec<f64> },
    /// Separate translation and quaternion.
    Components {
        translation: [f64; 3],
        rotation: [f64; 4],
        #[serde(default)]
        order: QuaternionOrder,
    },
}

impl PoseRecord {
    pub fn to_pose(&self) -> Result<Pose, GeometryError> {
        match self {
            PoseRecord::Matrix { transform } => Pose::from_flat(transform),
            PoseRecord::Components {
                translation,
                rotation,
                order,
            } => Pose::from_parts(*translation, *rotation, *order),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Annotations
// ────────────────────────────────────────────────────────────────────────────

/// A box orientation as a source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrientationRecord {
    Quaternion {
        rotation: [f64; 4],
        #[serde(default)]
        order: QuaternionOrder,
    },
    /// Yaw about +Z, in radians.
    Heading { heading: f64 },
}

impl OrientationRecord {
    pub fn to_quaternion(&self) -> Result<Quaternion, GeometryError> {
        match self {
            OrientationRecord::Quaternion { rotation, order } => {
                normalize_quaternion(*rotation, *order)
            }
            OrientationRecord::Heading { heading } => Quaternion::from_yaw(*heading),
        }
    }
}

/// One annotated object as a source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub center: [f64; 3],
    pub size: [f64; 3],
    #[serde(default)]
    pub size_order: SizeOrder,
    pub orientation: OrientationRecord,
    pub label: String,
    /// Ignored for ground truth.  Predictions without one get
    /// [`GROUND_TRUTH_CONFIDENCE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AnnotationRecord {
    /// Build the canonical box, still in the source frame.
    pub fn to_box(&self, category: BoxCategory) -> Result<BoundingBox3D, GeometryError> {
        let confidence = match category {
            BoxCategory::GroundTruth => GROUND_TRUTH_CONFIDENCE,
            BoxCategory::Predicted => self.confidence.unwrap_or(GROUND_TRUTH_CONFIDENCE),
        };
        BoundingBox3D::new(
            Vec3::from(self.center),
            BoxSize::from(self.size_order.to_canonical(self.size)),
            self.orientation.to_quaternion()?,
            self.label.clone(),
            confidence,
        )
    }
}

/// Annotations delivered as index-aligned parallel arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationColumns {
    pub origins: Vec<[f64; 3]>,
    pub sizes: Vec<[f64; 3]>,
    pub rotations: Vec<[f64; 4]>,
    pub labels: Vec<String>,
    pub confidences: Vec<f64>,
    #[serde(default)]
    pub size_order: SizeOrder,
    #[serde(default)]
    pub rotation_order: QuaternionOrder,
}

impl AnnotationColumns {
    /// Collapse the columns into one record per annotation.
    ///
    /// Fails with [`GeometryError::DimensionMismatch`] naming the first
    /// column whose length differs from `origins`.
    pub fn into_records(self) -> Result<Vec<AnnotationRecord>, GeometryError> {
        let expected = self.origins.len();
        for (field, found) in [
            ("sizes", self.sizes.len()),
            ("rotations", self.rotations.len()),
            ("labels", self.labels.len()),
            ("confidences", self.confidences.len()),
        ] {
            if found != expected {
                return Err(GeometryError::DimensionMismatch {
                    field: field.to_string(),
                    expected,
                    found,
                });
            }
        }

        let (size_order, order) = (self.size_order, self.rotation_order);
        Ok(self
            .origins
            .into_iter()
            .zip(self.sizes)
            .zip(self.rotations)
            .zip(self.labels)
            .zip(self.confidences)
            .map(|((((center, size), rotation), label), confidence)| AnnotationRecord {
                center,
                size,
                size_order,
                orientation: OrientationRecord::Quaternion { rotation, order },
                label,
                confidence: Some(confidence),
            })
            .collect())
    }
}

/// Either encoding of a frame's annotation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Annotations {
    Records(Vec<AnnotationRecord>),
    Columns(AnnotationColumns),
}

impl Default for Annotations {
    fn default() -> Self {
        Annotations::Records(Vec::new())
    }
}

impl Annotations {
    pub fn into_records(self) -> Result<Vec<AnnotationRecord>, GeometryError> {
        match self {
            Annotations::Records(records) => Ok(records),
            Annotations::Columns(columns) => columns.into_records(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensors
// ────────────────────────────────────────────────────────────────────────────

/// Camera calibration as a source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    /// Camera → vehicle transform.
    pub extrinsic: PoseRecord,
    /// `[f_u, f_v, c_u, c_v, ...]`
    pub intrinsics: Vec<f64>,
}

impl CameraRecord {
    pub fn to_calibration(&self, name: &str) -> Result<CameraCalibration, GeometryError> {
        Ok(CameraCalibration {
            name: name.to_string(),
            extrinsic: self.extrinsic.to_pose()?,
            intrinsics: CameraIntrinsics::from_packed(&self.intrinsics)?,
        })
    }
}

/// Everything a reader extracted for one captured timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub frame_num: u64,
    /// Vehicle → world transform.
    pub ego_pose: PoseRecord,
    #[serde(default)]
    pub ground_truth: Annotations,
    #[serde(default)]
    pub predicted: Annotations,
    /// Lidar → vehicle extrinsics.  Only read from the first frame.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub calibrations: BTreeMap<String, PoseRecord>,
    /// Only read from the first frame.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cameras: BTreeMap<String, CameraRecord>,
    /// Sensor-local sweeps keyed by lidar name.
    #[serde(default)]
    pub point_clouds: BTreeMap<String, PointCloud>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn record(confidence: Option<f64>) -> AnnotationRecord {
        AnnotationRecord {
            center: [1.0, 2.0, 3.0],
            size: [1.9, 4.5, 1.6],
            size_order: SizeOrder::WidthLengthHeight,
            orientation: OrientationRecord::Heading { heading: FRAC_PI_2 },
            label: "Vehicle".to_string(),
            confidence,
        }
    }

    #[test]
    fn matrix_pose_record_decomposes() {
        let rec: PoseRecord = serde_json::from_str(
            r#"{"transform":[1,0,0,5, 0,1,0,6, 0,0,1,7, 0,0,0,1]}"#,
        )
        .unwrap();
        let pose = rec.to_pose().unwrap();
        assert_eq!(pose.translation(), Vec3::new(5.0, 6.0, 7.0));
        assert_eq!(pose.rotation(), Quaternion::identity());
    }

    #[test]
    fn component_pose_record_honours_order() {
        let rec: PoseRecord = serde_json::from_str(
            r#"{"translation":[0,0,0],"rotation":[0,0,0,1],"order":"scalar_last"}"#,
        )
        .unwrap();
        assert_eq!(rec.to_pose().unwrap().rotation(), Quaternion::identity());
    }

    #[test]
    fn short_matrix_is_invalid_transform() {
        let rec = PoseRecord::Matrix {
            transform: vec![1.0; 9],
        };
        assert!(matches!(rec.to_pose(), Err(GeometryError::InvalidTransform(_))));
    }

    #[test]
    fn ground_truth_record_gets_canonical_size_and_sentinel_confidence() {
        let b = record(Some(12.0)).to_box(BoxCategory::GroundTruth).unwrap();
        assert_eq!(b.size(), BoxSize::new(4.5, 1.9, 1.6));
        assert_eq!(b.confidence(), 100.0);
        assert!((b.orientation().z - (FRAC_PI_2 / 2.0).sin()).abs() < 1e-12);
    }

    #[test]
    fn predicted_record_keeps_its_confidence() {
        assert_eq!(record(Some(12.0)).to_box(BoxCategory::Predicted).unwrap().confidence(), 12.0);
        assert_eq!(record(None).to_box(BoxCategory::Predicted).unwrap().confidence(), 100.0);
    }

    #[test]
    fn columns_collapse_in_order_without_dropping_the_last() {
        let cols = AnnotationColumns {
            origins: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            sizes: vec![[1.0, 1.0, 1.0]; 3],
            rotations: vec![[1.0, 0.0, 0.0, 0.0]; 3],
            labels: vec!["a".into(), "b".into(), "c".into()],
            confidences: vec![100.0; 3],
            size_order: SizeOrder::LengthWidthHeight,
            rotation_order: QuaternionOrder::ScalarFirst,
        };
        let records = Annotations::Columns(cols).into_records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].label, "c");
        assert_eq!(records[2].center, [2.0, 0.0, 0.0]);
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let cols = AnnotationColumns {
            origins: vec![[0.0, 0.0, 0.0]; 2],
            sizes: vec![[1.0, 1.0, 1.0]; 2],
            rotations: vec![[1.0, 0.0, 0.0, 0.0]; 2],
            labels: vec!["a".into()],
            confidences: vec![100.0; 2],
            size_order: SizeOrder::default(),
            rotation_order: QuaternionOrder::default(),
        };
        assert_eq!(
            cols.into_records(),
            Err(GeometryError::DimensionMismatch {
                field: "labels".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn raw_frame_parses_columns_and_point_clouds() {
        let raw: RawFrame = serde_json::from_str(
            r#"{
                "frame_num": 3,
                "ego_pose": {"translation":[0,0,0],"rotation":[1,0,0,0]},
                "predicted": {
                    "origins": [[1,2,3]], "sizes": [[4,2,1.5]], "rotations": [[1,0,0,0]],
                    "labels": ["car"], "confidences": [55.0]
                },
                "calibrations": {"TOP": {"translation":[0,0,2],"rotation":[1,0,0,0]}},
                "point_clouds": {"TOP": [[1,0,0],[0,1,0]]}
            }"#,
        )
        .unwrap();
        assert!(matches!(raw.predicted, Annotations::Columns(_)));
        assert!(matches!(&raw.ground_truth, Annotations::Records(r) if r.is_empty()));
        assert_eq!(raw.point_clouds["TOP"].len(), 2);
        assert!(raw.calibrations.contains_key("TOP"));
    }

    #[test]
    fn camera_record_builds_calibration() {
        let rec = CameraRecord {
            extrinsic: PoseRecord::Components {
                translation: [1.5, 0.0, 2.0],
                rotation: [1.0, 0.0, 0.0, 0.0],
                order: QuaternionOrder::ScalarFirst,
            },
            intrinsics: vec![1000.0, 1000.0, 960.0, 640.0],
        };
        let cal = rec.to_calibration("FRONT").unwrap();
        assert_eq!(cal.name, "FRONT");
        assert_eq!(cal.intrinsics.cx, 960.0);
    }
}
