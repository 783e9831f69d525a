//! 3-D bounding boxes and their frame conversion.
//!
//! A [`BoundingBox3D`] does not record which frame it lives in; that is
//! provenance tracked by whoever holds it.  Converting into another frame
//! produces a new box and leaves the original untouched.
//!
//! # Example
//!
//! ```rust
//! use lvt_geometry::bbox::{BoundingBox3D, BoxSize};
//! use lvt_geometry::pose::{Pose, Quaternion, Vec3};
//!
//! let ego = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()).unwrap();
//! let car = BoundingBox3D::ground_truth(
//!     Vec3::new(2.0, 0.0, 0.0),
//!     BoxSize::new(4.5, 1.9, 1.6),
//!     Quaternion::identity(),
//!     "vehicle.car",
//! )
//! .unwrap();
//!
//! let in_vehicle = car.to_frame(&ego);
//! assert!((in_vehicle.origin().x - 1.0).abs() < 1e-12);
//! assert_eq!(in_vehicle.size(), car.size());
//! ```

use lvt_types::{GROUND_TRUTH_CONFIDENCE, GeometryError, QuaternionOrder};
use serde::{Deserialize, Serialize};

use crate::pose::{Pose, Quaternion, Vec3, normalize_quaternion};

/// Box extents in canonical `(length, width, height)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct BoxSize {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.length, self.width, self.height]
    }

    /// Half of each extent, as a vector along the canonical axes.
    pub fn half_extents(self) -> Vec3 {
        Vec3::new(self.length * 0.5, self.width * 0.5, self.height * 0.5)
    }

    fn validate(self) -> Result<(), GeometryError> {
        if self.to_array().iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(GeometryError::InvalidBox(format!(
                "size {:?} must be finite and non-negative",
                self.to_array()
            )));
        }
        Ok(())
    }
}

impl From<[f64; 3]> for BoxSize {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<BoxSize> for [f64; 3] {
    fn from(s: BoxSize) -> Self {
        s.to_array()
    }
}

/// One annotated object.  Only built through [`BoundingBox3D::new`], so the
/// size is non-negative and the orientation is a canonical unit quaternion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoxRepr", into = "BoxRepr")]
pub struct BoundingBox3D {
    origin: Vec3,
    size: BoxSize,
    orientation: Quaternion,
    label: String,
    confidence: f64,
}

impl BoundingBox3D {
    /// Validate and build a box.  `orientation` is normalized on the way in.
    pub fn new(
        origin: Vec3,
        size: BoxSize,
        orientation: Quaternion,
        label: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, GeometryError> {
        if !origin.is_finite() {
            return Err(GeometryError::InvalidBox(format!(
                "non-finite origin {:?}",
                origin.to_array()
            )));
        }
        size.validate()?;
        if !(0.0..=100.0).contains(&confidence) {
            return Err(GeometryError::InvalidBox(format!(
                "confidence {confidence} outside [0, 100]"
            )));
        }
        let orientation = normalize_quaternion(orientation.to_array(), QuaternionOrder::ScalarFirst)?;
        Ok(Self {
            origin,
            size,
            orientation,
            label: label.into(),
            confidence,
        })
    }

    /// A box with the fixed ground-truth confidence.
    pub fn ground_truth(
        origin: Vec3,
        size: BoxSize,
        orientation: Quaternion,
        label: impl Into<String>,
    ) -> Result<Self, GeometryError> {
        Self::new(origin, size, orientation, label, GROUND_TRUTH_CONFIDENCE)
    }

    /// Box center.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn size(&self) -> BoxSize {
        self.size
    }

    /// Unit quaternion, canonical form.
    pub fn orientation(&self) -> Quaternion {
        self.orientation
    }

    /// Category name, e.g. `"vehicle.car"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Detection confidence in `[0, 100]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Re-express this box in the frame whose pose, relative to the box's
    /// current frame, is `frame_pose`.  Size, label and confidence carry over.
    pub fn to_frame(&self, frame_pose: &Pose) -> Self {
        let (origin, orientation) = box_to_frame(self.origin, self.orientation, frame_pose);
        Self {
            origin,
            orientation,
            ..self.clone()
        }
    }
}

/// Wire form of a [`BoundingBox3D`]; deserialization re-validates.
#[derive(Serialize, Deserialize)]
struct BoxRepr {
    origin: [f64; 3],
    size: [f64; 3],
    rotation: [f64; 4],
    label: String,
    confidence: f64,
}

impl TryFrom<BoxRepr> for BoundingBox3D {
    type Error = GeometryError;

    fn try_from(r: BoxRepr) -> Result<Self, Self::Error> {
        BoundingBox3D::new(
            r.origin.into(),
            r.size.into(),
            r.rotation.into(),
            r.label,
            r.confidence,
        )
    }
}

impl From<BoundingBox3D> for BoxRepr {
    fn from(b: BoundingBox3D) -> Self {
        Self {
            origin: b.origin.to_array(),
            size: b.size.to_array(),
            rotation: b.orientation.to_array(),
            label: b.label,
            confidence: b.confidence,
        }
    }
}

fn box_to_frame(center: Vec3, orientation: Quaternion, frame_pose: &Pose) -> (Vec3, Quaternion) {
    let center = frame_pose.inverse().apply_point(center);
    let orientation = frame_pose
        .rotation()
        .conjugate()
        .mul(orientation)
        .renormalized();
    (center, orientation)
}

/// Convert a box center and orientation into the frame described by
/// `frame_pose`:
///
/// - `center' = apply_point(invert(frame_pose), center)`
/// - `orientation' = conjugate(frame_pose.rotation) * orientation`
///
/// `size` is frame-invariant; it is only validated.  Fails on a non-finite
/// center, a negative or non-finite size, or a degenerate orientation.
pub fn transform_box_to_frame(
    center: Vec3,
    size: BoxSize,
    orientation: Quaternion,
    frame_pose: &Pose,
) -> Result<(Vec3, Quaternion), GeometryError> {
    if !center.is_finite() {
        return Err(GeometryError::InvalidBox(format!(
            "non-finite center {:?}",
            center.to_array()
        )));
    }
    size.validate()?;
    let orientation = normalize_quaternion(orientation.to_array(), QuaternionOrder::ScalarFirst)?;
    Ok(box_to_frame(center, orientation, frame_pose))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::invert;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::FRAC_PI_2;

    fn unit_box(origin: Vec3) -> BoundingBox3D {
        BoundingBox3D::ground_truth(origin, BoxSize::new(2.0, 2.0, 2.0), Quaternion::identity(), "car").unwrap()
    }

    #[test]
    fn ego_translation_shifts_center() {
        let ego = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()).unwrap();
        let (center, orientation) = transform_box_to_frame(
            Vec3::new(2.0, 0.0, 0.0),
            BoxSize::new(1.0, 1.0, 1.0),
            Quaternion::identity(),
            &ego,
        )
        .unwrap();
        assert!((center.x - 1.0).abs() < 1e-12);
        assert!(center.y.abs() < 1e-12 && center.z.abs() < 1e-12);
        assert_eq!(orientation, Quaternion::identity());
    }

    #[test]
    fn ego_yaw_rotates_center_and_heading() {
        // Ego at origin facing +Y; a box 3 m along world +Y sits 3 m ahead (+X).
        let ego = Pose::new(Vec3::zero(), Quaternion::from_yaw(FRAC_PI_2).unwrap()).unwrap();
        let heading = Quaternion::from_yaw(FRAC_PI_2).unwrap();
        let b = BoundingBox3D::ground_truth(Vec3::new(0.0, 3.0, 0.0), BoxSize::new(4.0, 2.0, 1.5), heading, "car").unwrap();

        let out = b.to_frame(&ego);
        assert!((out.origin().x - 3.0).abs() < 1e-12);
        assert!(out.origin().y.abs() < 1e-12);
        let o = out.orientation();
        assert!((o.w - 1.0).abs() < 1e-12 && o.z.abs() < 1e-12);
    }

    #[test]
    fn to_frame_then_inverse_recovers_box() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let pose = Pose::from_parts(
                [rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0), rng.gen_range(-2.0..2.0)],
                [
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                ],
                QuaternionOrder::ScalarFirst,
            )
            .unwrap();
            let b = BoundingBox3D::new(
                Vec3::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0), 0.5),
                BoxSize::new(4.0, 1.8, 1.5),
                Quaternion::from_yaw(rng.gen_range(-3.0..3.0)).unwrap(),
                "car",
                rng.gen_range(0.0..100.0),
            )
            .unwrap();

            let back = b.to_frame(&pose).to_frame(&invert(&pose));
            assert!(back.origin().sub(b.origin()).norm() < 1e-6);
            for (x, y) in back.orientation().to_array().iter().zip(b.orientation().to_array()) {
                assert!((x - y).abs() < 1e-6);
            }
            assert_eq!(back.size(), b.size());
            assert_eq!(back.confidence(), b.confidence());
        }
    }

    #[test]
    fn to_frame_preserves_label_and_confidence() {
        let b = BoundingBox3D::new(Vec3::new(1.0, 2.0, 3.0), BoxSize::new(1.0, 1.0, 1.0), Quaternion::identity(), "pedestrian", 42.5).unwrap();
        let out = b.to_frame(&Pose::new(Vec3::new(5.0, 0.0, 0.0), Quaternion::from_yaw(1.0).unwrap()).unwrap());
        assert_eq!(out.label(), "pedestrian");
        assert_eq!(out.confidence(), 42.5);
        // original untouched
        assert_eq!(b.origin(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn ground_truth_uses_sentinel_confidence() {
        assert_eq!(unit_box(Vec3::zero()).confidence(), 100.0);
    }

    #[test]
    fn rejects_negative_size_and_bad_confidence() {
        let neg = BoundingBox3D::new(Vec3::zero(), BoxSize::new(-1.0, 1.0, 1.0), Quaternion::identity(), "car", 50.0);
        assert!(matches!(neg, Err(GeometryError::InvalidBox(_))));

        let conf = BoundingBox3D::new(Vec3::zero(), BoxSize::new(1.0, 1.0, 1.0), Quaternion::identity(), "car", 101.0);
        assert!(matches!(conf, Err(GeometryError::InvalidBox(_))));

        let nan = BoundingBox3D::new(Vec3::zero(), BoxSize::new(1.0, 1.0, 1.0), Quaternion::identity(), "car", f64::NAN);
        assert!(nan.is_err());
    }

    #[test]
    fn transform_rejects_degenerate_orientation() {
        let res = transform_box_to_frame(
            Vec3::zero(),
            BoxSize::new(1.0, 1.0, 1.0),
            Quaternion::new(0.0, 0.0, 0.0, 0.0),
            &Pose::identity(),
        );
        assert!(matches!(res, Err(GeometryError::InvalidQuaternion(_))));
    }

    #[test]
    fn transform_rejects_nan_center() {
        let res = transform_box_to_frame(
            Vec3::new(f64::NAN, 0.0, 0.0),
            BoxSize::new(1.0, 1.0, 1.0),
            Quaternion::identity(),
            &Pose::identity(),
        );
        assert!(matches!(res, Err(GeometryError::InvalidBox(_))));
    }

    #[test]
    fn deserialized_box_is_revalidated_and_canonical() {
        let json = r#"{"origin":[0,0,0],"size":[1,1,1],"rotation":[-2,0,0,0],"label":"x","confidence":1}"#;
        let b: BoundingBox3D = serde_json::from_str(json).unwrap();
        assert_eq!(b.orientation(), Quaternion::identity());
        assert_eq!(b.label(), "x");
    }

    #[test]
    fn zero_sized_box_is_valid() {
        assert!(BoundingBox3D::ground_truth(Vec3::zero(), BoxSize::new(0.0, 0.0, 0.0), Quaternion::identity(), "point").is_ok());
    }

    #[test]
    fn box_json_roundtrip_validates() {
        let b = unit_box(Vec3::new(1.0, 2.0, 3.0));
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains(r#""size":[2.0,2.0,2.0]"#));
        let back: BoundingBox3D = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);

        let bad = r#"{"origin":[0,0,0],"size":[-1,1,1],"rotation":[1,0,0,0],"label":"x","confidence":1}"#;
        assert!(serde_json::from_str::<BoundingBox3D>(bad).is_err());
    }
}
