//! `lvt-types` – shared vocabulary for the LVT conversion stack.
//!
//! Holds the conventions that every other crate agrees on: which quaternion
//! ordering a source uses, how it orders box dimensions, which frame a box
//! category should end up in, how a run reacts to bad input, and the error
//! type raised by the geometry core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Confidence recorded for every ground-truth annotation.
pub const GROUND_TRUTH_CONFIDENCE: f64 = 100.0;

/// Component ordering of a quaternion as delivered by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuaternionOrder {
    /// `(w, x, y, z)`; the canonical ordering.
    #[default]
    ScalarFirst,
    /// `(x, y, z, w)`, as produced by most rotation-matrix decompositions.
    ScalarLast,
}

/// Ordering of the three box dimensions as delivered by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeOrder {
    /// `(length, width, height)`; the canonical ordering.
    #[default]
    LengthWidthHeight,
    /// `(width, length, height)`
    WidthLengthHeight,
}

impl SizeOrder {
    /// Reorder `size` into canonical `(length, width, height)`.
    pub fn to_canonical(self, size: [f64; 3]) -> [f64; 3] {
        match self {
            SizeOrder::LengthWidthHeight => size,
            SizeOrder::WidthLengthHeight => [size[1], size[0], size[2]],
        }
    }
}

/// Frame a box category is expressed in after conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFrame {
    /// Re-expressed relative to the ego vehicle at the frame's timestamp.
    #[default]
    Vehicle,
    /// Left in whatever frame the source delivered it in.
    Source,
}

/// The two annotation streams carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxCategory {
    GroundTruth,
    Predicted,
}

impl std::fmt::Display for BoxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxCategory::GroundTruth => write!(f, "ground_truth"),
            BoxCategory::Predicted => write!(f, "predicted"),
        }
    }
}

/// How a conversion run reacts to a record that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failure.
    FailFast,
    /// Skip the offending annotation, sensor, or frame and keep going.
    #[default]
    BestEffort,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(FailurePolicy::FailFast),
            "best_effort" => Ok(FailurePolicy::BestEffort),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

/// Errors raised by the geometry core on malformed numeric input.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeometryError {
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    #[error("Invalid quaternion: {0}")]
    InvalidQuaternion(String),

    #[error("Dimension mismatch: expected {expected} entries in `{field}`, found {found}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid box: {0}")]
    InvalidBox(String),
}
