//! Pinhole camera calibration.
//!
//! Sources ship intrinsics either as a full 3×3 matrix or packed as
//! `[f_u, f_v, c_u, c_v, k1, k2, p1, p2, k3]`.  Only the linear pinhole part
//! is kept; distortion coefficients are dropped.

use lvt_types::GeometryError;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::pose::{Pose, Vec3};

/// Focal lengths and principal point, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Unpack `[f_u, f_v, c_u, c_v, ...]`; trailing distortion terms are
    /// ignored.
    pub fn from_packed(values: &[f64]) -> Result<Self, GeometryError> {
        match values {
            [fx, fy, cx, cy, ..] if [fx, fy, cx, cy].iter().all(|v| v.is_finite()) => {
                Ok(Self::new(*fx, *fy, *cx, *cy))
            }
            [_, _, _, _, ..] => Err(GeometryError::InvalidTransform(
                "intrinsics contain non-finite values".to_string(),
            )),
            _ => Err(GeometryError::DimensionMismatch {
                field: "intrinsics".to_string(),
                expected: 4,
                found: values.len(),
            }),
        }
    }

    /// `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Pixel coordinates of a camera-frame point, or `None` behind the image
    /// plane.
    pub fn project(&self, p: Vec3) -> Option<[f64; 2]> {
        (p.z > 0.0).then(|| [self.fx * p.x / p.z + self.cx, self.fy * p.y / p.z + self.cy])
    }
}

/// Extrinsic (camera → vehicle) and intrinsic calibration of one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub name: String,
    pub extrinsic: Pose,
    pub intrinsics: CameraIntrinsics,
}

impl CameraCalibration {
    /// Project a vehicle-frame point into this camera's image.
    pub fn project_vehicle_point(&self, p: Vec3) -> Option<[f64; 2]> {
        self.intrinsics.project(self.extrinsic.inverse().apply_point(p))
    }
}
