//! [`FrameAssembler`] – turns one [`RawFrame`] into one canonical [`Frame`].
//!
//! Per frame the assembler:
//! 1. decomposes the ego pose (a failure here rejects the whole frame),
//! 2. converts every ground-truth and predicted annotation into a
//!    [`BoundingBox3D`] and moves it into its configured [`TargetFrame`],
//! 3. moves every lidar sweep into the vehicle frame with the shared
//!    [`CalibrationTable`].
//!
//! Annotations and sensors fail independently.  Under
//! [`FailurePolicy::BestEffort`] a failing item is skipped, logged and
//! recorded in [`AssembledFrame::failures`]; its siblings are untouched.
//! Under [`FailurePolicy::FailFast`] the first failure is returned.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lvt_convert::assembler::{AssemblerConfig, FrameAssembler};
//! use lvt_convert::source::RawFrame;
//! use lvt_geometry::CalibrationTable;
//!
//! let raw: RawFrame = serde_json::from_str(r#"{
//!     "frame_num": 0,
//!     "ego_pose": { "translation": [1.0, 0.0, 0.0], "rotation": [1.0, 0.0, 0.0, 0.0] },
//!     "ground_truth": [
//!         { "center": [2.0, 0.0, 0.0], "size": [4.0, 2.0, 1.5],
//!           "orientation": { "rotation": [1.0, 0.0, 0.0, 0.0] }, "label": "car" }
//!     ]
//! }"#).unwrap();
//!
//! let assembler = FrameAssembler::new(AssemblerConfig::default(), Arc::new(CalibrationTable::default()));
//! let out = assembler.assemble(raw).unwrap();
//! assert!((out.frame.ground_truth[0].origin().x - 1.0).abs() < 1e-12);
//! assert!(out.failures.is_empty());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use lvt_geometry::{BoundingBox3D, CalibrationTable, PointCloudFrame, Pose};
use lvt_types::{BoxCategory, FailurePolicy, TargetFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConvertError, Failure};
use crate::frame::{AssembledFrame, Frame};
use crate::source::{Annotations, RawFrame};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Where each box category ends up and how failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssemblerConfig {
    #[serde(default)]
    pub ground_truth_frame: TargetFrame,
    #[serde(default)]
    pub predicted_frame: TargetFrame,
    #[serde(default)]
    pub policy: FailurePolicy,
}

impl AssemblerConfig {
    pub fn target_frame(&self, category: BoxCategory) -> TargetFrame {
        match category {
            BoxCategory::GroundTruth => self.ground_truth_frame,
            BoxCategory::Predicted => self.predicted_frame,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Calibration
// ────────────────────────────────────────────────────────────────────────────

/// Build the lidar calibration table from a frame's `calibrations`.
///
/// Any malformed extrinsic is an error regardless of policy.
pub fn calibration_from_frame(raw: &RawFrame) -> Result<CalibrationTable, ConvertError> {
    raw.calibrations
        .iter()
        .map(|(sensor, record)| {
            record
                .to_pose()
                .map(|pose| (sensor.clone(), pose))
                .map_err(|source| ConvertError::Calibration {
                    sensor: sensor.clone(),
                    source,
                })
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// FrameAssembler
// ────────────────────────────────────────────────────────────────────────────

/// Stateless per-frame converter; cheap to share across worker threads.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    config: AssemblerConfig,
    calibration: Arc<CalibrationTable>,
}

impl FrameAssembler {
    pub fn new(config: AssemblerConfig, calibration: Arc<CalibrationTable>) -> Self {
        Self {
            config,
            calibration,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// Convert one raw frame.
    ///
    /// An empty frame (no annotations, no sweeps, or empty sweeps) yields
    /// empty outputs.
    pub fn assemble(&self, raw: RawFrame) -> Result<AssembledFrame, ConvertError> {
        let frame_num = raw.frame_num;
        let ego_pose = raw
            .ego_pose
            .to_pose()
            .map_err(|source| ConvertError::EgoPose { frame_num, source })?;

        let mut failures = Vec::new();
        let ground_truth = self.convert_boxes(
            frame_num,
            BoxCategory::GroundTruth,
            raw.ground_truth,
            &ego_pose,
            &mut failures,
        )?;
        let predicted = self.convert_boxes(
            frame_num,
            BoxCategory::Predicted,
            raw.predicted,
            &ego_pose,
            &mut failures,
        )?;

        let mut point_clouds = BTreeMap::new();
        for (sensor, local) in &raw.point_clouds {
            match self.calibration.get(sensor) {
                Some(extrinsic) => {
                    let sweep = PointCloudFrame::from_sensor(sensor.as_str(), frame_num, local, extrinsic);
                    point_clouds.insert(sensor.clone(), sweep);
                }
                None => self.tolerate(
                    ConvertError::MissingCalibration {
                        frame_num,
                        sensor: sensor.clone(),
                    },
                    &mut failures,
                )?,
            }
        }

        let frame = Frame {
            frame_num,
            ego_pose,
            ground_truth,
            predicted,
            point_clouds,
        };
        debug!(
            frame_num,
            ground_truth = frame.ground_truth.len(),
            predicted = frame.predicted.len(),
            points = frame.point_count(),
            skipped = failures.len(),
            "frame assembled"
        );
        Ok(AssembledFrame { frame, failures })
    }

    fn convert_boxes(
        &self,
        frame_num: u64,
        category: BoxCategory,
        annotations: Annotations,
        ego_pose: &Pose,
        failures: &mut Vec<Failure>,
    ) -> Result<Vec<BoundingBox3D>, ConvertError> {
        let records = match annotations.into_records() {
            Ok(records) => records,
            Err(source) => {
                self.tolerate(
                    ConvertError::AnnotationColumns {
                        frame_num,
                        category,
                        source,
                    },
                    failures,
                )?;
                return Ok(Vec::new());
            }
        };

        let target = self.config.target_frame(category);
        let mut boxes = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match record.to_box(category) {
                Ok(b) => boxes.push(match target {
                    TargetFrame::Vehicle => b.to_frame(ego_pose),
                    TargetFrame::Source => b,
                }),
                Err(source) => self.tolerate(
                    ConvertError::Annotation {
                        frame_num,
                        category,
                        index,
                        source,
                    },
                    failures,
                )?,
            }
        }
        Ok(boxes)
    }

    /// Apply the failure policy to an item-level error.
    fn tolerate(&self, err: ConvertError, failures: &mut Vec<Failure>) -> Result<(), ConvertError> {
        match self.config.policy {
            FailurePolicy::FailFast => Err(err),
            FailurePolicy::BestEffort => {
                warn!(error = %err, "skipping invalid item");
                failures.push(Failure::from(&err));
                Ok(())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
