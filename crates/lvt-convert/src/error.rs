//! Errors raised while assembling and converting frames.

use lvt_types::{BoxCategory, GeometryError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong between a raw source record and a written
/// frame.  Variants that concern a single frame carry its number so a run
/// can report exactly where validation failed.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("frame {frame_num}: ego pose rejected: {source}")]
    EgoPose {
        frame_num: u64,
        source: GeometryError,
    },

    #[error("frame {frame_num}: {category} annotation #{index} rejected: {source}")]
    Annotation {
        frame_num: u64,
        category: BoxCategory,
        index: usize,
        source: GeometryError,
    },

    #[error("frame {frame_num}: {category} annotation columns rejected: {source}")]
    AnnotationColumns {
        frame_num: u64,
        category: BoxCategory,
        source: GeometryError,
    },

    #[error("frame {frame_num}: sensor '{sensor}' has no extrinsic calibration")]
    MissingCalibration { frame_num: u64, sensor: String },

    #[error("calibration for sensor '{sensor}' rejected: {source}")]
    Calibration {
        sensor: String,
        source: GeometryError,
    },

    #[error("frame {frame_num} is out of order: previous frame was {previous}")]
    FrameOrder { frame_num: u64, previous: u64 },

    #[error("recording starts at frame {frame_num}, expected frame 0")]
    StartFrame { frame_num: u64 },

    #[error("input line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ConvertError {
    /// The frame this error concerns, when known.
    pub fn frame_num(&self) -> Option<u64> {
        match self {
            ConvertError::EgoPose { frame_num, .. }
            | ConvertError::Annotation { frame_num, .. }
            | ConvertError::AnnotationColumns { frame_num, .. }
            | ConvertError::MissingCalibration { frame_num, .. }
            | ConvertError::FrameOrder { frame_num, .. }
            | ConvertError::StartFrame { frame_num } => Some(*frame_num),
            _ => None,
        }
    }
}

/// What a recorded [`Failure`] refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureTarget {
    Annotation { category: BoxCategory, index: usize },
    AnnotationColumns { category: BoxCategory },
    Sensor { sensor: String },
    Frame,
}

/// A validation failure that a best-effort run skipped over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub frame_num: Option<u64>,
    pub target: FailureTarget,
    pub message: String,
}

impl From<&ConvertError> for Failure {
    fn from(err: &ConvertError) -> Self {
        let target = match err {
            ConvertError::Annotation { category, index, .. } => FailureTarget::Annotation {
                category: *category,
                index: *index,
            },
            ConvertError::AnnotationColumns { category, .. } => {
                FailureTarget::AnnotationColumns { category: *category }
            }
            ConvertError::MissingCalibration { sensor, .. } => FailureTarget::Sensor {
                sensor: sensor.clone(),
            },
            _ => FailureTarget::Frame,
        };
        Self {
            frame_num: err.frame_num(),
            target,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_error_names_frame_category_and_index() {
        let err = ConvertError::Annotation {
            frame_num: 7,
            category: BoxCategory::Predicted,
            index: 3,
            source: GeometryError::InvalidQuaternion("norm 0e0 below 1e-9".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("frame 7"));
        assert!(msg.contains("predicted annotation #3"));
        assert_eq!(err.frame_num(), Some(7));
    }

    #[test]
    fn failure_from_missing_calibration_targets_sensor() {
        let err = ConvertError::MissingCalibration {
            frame_num: 2,
            sensor: "REAR".to_string(),
        };
        let failure = Failure::from(&err);
        assert_eq!(failure.frame_num, Some(2));
        assert_eq!(
            failure.target,
            FailureTarget::Sensor {
                sensor: "REAR".to_string()
            }
        );
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let failure = Failure {
            frame_num: Some(1),
            target: FailureTarget::Annotation {
                category: BoxCategory::GroundTruth,
                index: 0,
            },
            message: "bad".to_string(),
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains(r#""kind":"annotation""#));
        assert!(json.contains(r#""category":"ground_truth""#));
    }
}
