//! Canonical rigid-body poses.
//!
//! Every rotation in the stack is a [`Quaternion`] stored scalar-first
//! `(w, x, y, z)`, unit length, with `w ≥ 0`.  Sources that deliver other
//! orderings go through [`normalize_quaternion`] once, at the boundary, and
//! nothing downstream ever sees a second convention.
//!
//! A [`Pose`] pairs such a rotation with a translation.  It maps a point
//! expressed in its child frame into its parent frame: rotate, then
//! translate.
//!
//! # Example
//!
//! ```rust
//! use lvt_geometry::pose::{Pose, Quaternion, Vec3, compose, invert};
//!
//! // ego is 1 m forward of the world origin, same orientation.
//! let ego = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()).unwrap();
//! // lidar sits 2 m above the ego origin.
//! let lidar = Pose::new(Vec3::new(0.0, 0.0, 2.0), Quaternion::identity()).unwrap();
//!
//! let lidar_in_world = compose(&ego, &lidar);
//! let p = lidar_in_world.apply_point(Vec3::zero());
//! assert!((p.x - 1.0).abs() < 1e-12 && (p.z - 2.0).abs() < 1e-12);
//!
//! let back = invert(&lidar_in_world).apply_point(p);
//! assert!(back.norm() < 1e-12);
//! ```

use lvt_types::{GeometryError, QuaternionOrder};
use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Quaternions with a norm below this cannot be normalized.
pub const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Allowed deviation of a rotation block from orthonormality.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-4;

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector or point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

/// A quaternion in scalar-first `(w, x, y, z)` layout.
///
/// [`Quaternion::new`] stores components verbatim; values that must satisfy
/// the unit-norm invariant come out of [`normalize_quaternion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `radians` about `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vec3, radians: f64) -> Result<Self, GeometryError> {
        let n = axis.norm();
        if !n.is_finite() || n < MIN_QUATERNION_NORM || !radians.is_finite() {
            return Err(GeometryError::InvalidQuaternion(format!(
                "cannot build a rotation from axis {:?} and angle {radians}",
                axis.to_array()
            )));
        }
        let (s, c) = (radians * 0.5).sin_cos();
        normalize_quaternion(
            [c, s * axis.x / n, s * axis.y / n, s * axis.z / n],
            QuaternionOrder::ScalarFirst,
        )
    }

    /// Rotation of `radians` about +Z, the usual encoding of a box heading.
    pub fn from_yaw(radians: f64) -> Result<Self, GeometryError> {
        Self::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), radians)
    }

    /// Hamilton product: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Components in canonical `(w, x, y, z)` order.
    pub fn to_array(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Equivalent 3×3 rotation matrix.  Assumes a unit quaternion.
    pub fn to_rotation_matrix(self) -> Matrix3<f64> {
        let Self { w, x, y, z } = self;
        Matrix3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        )
    }

    /// Rescale to unit length and flip into the `w ≥ 0` hemisphere.
    ///
    /// Only for values already known to be close to unit length, e.g. the
    /// product of two unit quaternions.
    pub(crate) fn renormalized(self) -> Self {
        let n = self.norm();
        let q = if (n - 1.0).abs() > 4.0 * f64::EPSILON {
            Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
        } else {
            self
        };
        q.canonical_sign()
    }

    /// `q` and `-q` encode the same rotation; keep the one with `w > 0`, or
    /// for `w == 0` the one whose first non-zero vector component is positive.
    fn canonical_sign(self) -> Self {
        let leading = if self.w != 0.0 {
            self.w
        } else {
            [self.x, self.y, self.z]
                .into_iter()
                .find(|c| *c != 0.0)
                .unwrap_or(0.0)
        };
        let s = if leading < 0.0 { -1.0 } else { 1.0 };
        // `+ 0.0` folds -0.0 into 0.0 so equal rotations compare equal.
        Self::new(
            s * self.w + 0.0,
            s * self.x + 0.0,
            s * self.y + 0.0,
            s * self.z + 0.0,
        )
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from(q: [f64; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }
}

impl From<Quaternion> for [f64; 4] {
    fn from(q: Quaternion) -> Self {
        q.to_array()
    }
}

/// Convert a quaternion delivered in `order` into the canonical unit,
/// scalar-first, `w ≥ 0` form.
///
/// Fails with [`GeometryError::InvalidQuaternion`] when a component is NaN or
/// infinite, or when the norm is below [`MIN_QUATERNION_NORM`].  Idempotent.
pub fn normalize_quaternion(
    components: [f64; 4],
    order: QuaternionOrder,
) -> Result<Quaternion, GeometryError> {
    if components.iter().any(|c| !c.is_finite()) {
        return Err(GeometryError::InvalidQuaternion(format!(
            "non-finite component in {components:?}"
        )));
    }
    let q = match order {
        QuaternionOrder::ScalarFirst => Quaternion::from(components),
        QuaternionOrder::ScalarLast => Quaternion::new(
            components[3],
            components[0],
            components[1],
            components[2],
        ),
    };
    let n = q.norm();
    if n < MIN_QUATERNION_NORM {
        return Err(GeometryError::InvalidQuaternion(format!(
            "norm {n:e} below {MIN_QUATERNION_NORM:e}"
        )));
    }
    // Finite components whose squares overflow: bring the largest to 1 first.
    let q = if n.is_infinite() {
        let scale = q.to_array().iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        Quaternion::new(q.w / scale, q.x / scale, q.y / scale, q.z / scale)
    } else {
        q
    };
    Ok(q.renormalized())
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body transform: rotation followed by translation.
///
/// Represents the pose of a child frame relative to a parent frame; to
/// express a child-frame point in the parent frame, rotate it by `rotation`
/// then add `translation`.  Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRepr", into = "PoseRepr")]
pub struct Pose {
    translation: Vec3,
    rotation: Quaternion,
}

impl Pose {
    /// Build a pose, normalizing `rotation` and rejecting non-finite input.
    pub fn new(translation: Vec3, rotation: Quaternion) -> Result<Self, GeometryError> {
        if !translation.is_finite() {
            return Err(GeometryError::InvalidTransform(format!(
                "non-finite translation {:?}",
                translation.to_array()
            )));
        }
        let rotation = normalize_quaternion(rotation.to_array(), QuaternionOrder::ScalarFirst)?;
        Ok(Self {
            translation,
            rotation,
        })
    }

    /// Build a pose from raw arrays, with the rotation in `order`.
    pub fn from_parts(
        translation: [f64; 3],
        rotation: [f64; 4],
        order: QuaternionOrder,
    ) -> Result<Self, GeometryError> {
        let rotation = normalize_quaternion(rotation, order)?;
        Self::new(Vec3::from(translation), rotation)
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zero(),
            rotation: Quaternion::identity(),
        }
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    /// Decompose a 4×4 homogeneous rigid transform.
    ///
    /// Translation comes from the first three rows of the last column; the
    /// upper-left 3×3 block must be a proper rotation within
    /// [`ORTHONORMAL_TOLERANCE`].
    pub fn from_matrix(m: &Matrix4<f64>) -> Result<Self, GeometryError> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::InvalidTransform(
                "matrix contains non-finite entries".to_string(),
            ));
        }
        let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let det = r.determinant();
        if (det - 1.0).abs() > ORTHONORMAL_TOLERANCE {
            return Err(GeometryError::InvalidTransform(format!(
                "rotation block determinant {det} is not 1"
            )));
        }
        let deviation = (r * r.transpose() - Matrix3::identity()).abs().max();
        if deviation > ORTHONORMAL_TOLERANCE {
            return Err(GeometryError::InvalidTransform(format!(
                "rotation block deviates from orthonormal by {deviation:e}"
            )));
        }

        // nalgebra stores quaternion coordinates as (i, j, k, w).
        let uq = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
        let c = uq.quaternion().coords;
        let rotation = normalize_quaternion([c[0], c[1], c[2], c[3]], QuaternionOrder::ScalarLast)?;

        Ok(Self {
            translation: Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]),
            rotation,
        })
    }

    /// Decompose a row-major flattened 4×4 transform (16 values).
    pub fn from_flat(values: &[f64]) -> Result<Self, GeometryError> {
        if values.len() != 16 {
            return Err(GeometryError::InvalidTransform(format!(
                "expected 16 values for a 4x4 matrix, got {}",
                values.len()
            )));
        }
        Self::from_matrix(&Matrix4::from_row_slice(values))
    }

    /// Homogeneous 4×4 form of this pose.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation.to_rotation_matrix());
        m[(0, 3)] = self.translation.x;
        m[(1, 3)] = self.translation.y;
        m[(2, 3)] = self.translation.z;
        m
    }

    /// Express a child-frame point in the parent frame.
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p).add(self.translation)
    }

    /// The transform equivalent to applying `other` first, then `self`.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            translation: self.translation.add(self.rotation.rotate(other.translation)),
            rotation: self.rotation.mul(other.rotation).renormalized(),
        }
    }

    /// The transform undoing `self`.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.conjugate().renormalized();
        Self {
            translation: rotation.rotate(self.translation.neg()),
            rotation,
        }
    }
}

/// Wire form of a [`Pose`]; deserialization re-validates the invariants.
#[derive(Serialize, Deserialize)]
struct PoseRepr {
    translation: [f64; 3],
    rotation: [f64; 4],
}

impl TryFrom<PoseRepr> for Pose {
    type Error = GeometryError;

    fn try_from(repr: PoseRepr) -> Result<Self, Self::Error> {
        Pose::from_parts(repr.translation, repr.rotation, QuaternionOrder::ScalarFirst)
    }
}

impl From<Pose> for PoseRepr {
    fn from(pose: Pose) -> Self {
        Self {
            translation: pose.translation.to_array(),
            rotation: pose.rotation.to_array(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// See [`Pose::from_matrix`].
pub fn pose_from_matrix(m: &Matrix4<f64>) -> Result<Pose, GeometryError> {
    Pose::from_matrix(m)
}

/// See [`Pose::from_flat`].
pub fn pose_from_flat(values: &[f64]) -> Result<Pose, GeometryError> {
    Pose::from_flat(values)
}

/// `apply_point(compose(a, b), p) == apply_point(a, apply_point(b, p))`.
pub fn compose(a: &Pose, b: &Pose) -> Pose {
    a.compose(b)
}

pub fn invert(pose: &Pose) -> Pose {
    pose.inverse()
}

pub fn apply_point(pose: &Pose, p: Vec3) -> Vec3 {
    pose.apply_point(p)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    fn assert_vec_close(a: Vec3, b: Vec3, tol: f64) {
        assert!(
            a.sub(b).norm() < tol,
            "expected {:?}, got {:?}",
            b.to_array(),
            a.to_array()
        );
    }

    fn assert_quat_close(a: Quaternion, b: Quaternion, tol: f64) {
        let d = a.to_array().iter().zip(b.to_array()).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max);
        assert!(d < tol, "expected {:?}, got {:?}", b.to_array(), a.to_array());
    }

    fn random_pose(rng: &mut StdRng) -> Pose {
        let q = [
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        ];
        let t = [
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-5.0..5.0),
        ];
        Pose::from_parts(t, q, QuaternionOrder::ScalarFirst).unwrap()
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_close(r, Vec3::new(0.0, 1.0, 0.0), 1e-12);
    }

    #[test]
    fn from_yaw_matches_explicit_quaternion() {
        let q = Quaternion::from_yaw(FRAC_PI_2).unwrap();
        assert_quat_close(q, Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2), 1e-12);
    }

    #[test]
    fn from_axis_angle_rejects_zero_axis() {
        assert!(matches!(
            Quaternion::from_axis_angle(Vec3::zero(), 1.0),
            Err(GeometryError::InvalidQuaternion(_))
        ));
    }

    #[test]
    fn rotation_matrix_agrees_with_rotate() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 2.0, 3.0), 0.7).unwrap();
        let v = Vec3::new(0.3, -1.2, 4.0);
        let m = q.to_rotation_matrix() * nalgebra::Vector3::new(v.x, v.y, v.z);
        assert_vec_close(q.rotate(v), Vec3::new(m.x, m.y, m.z), 1e-12);
    }

    // ── normalize_quaternion ────────────────────────────────────────────────

    #[test]
    fn normalize_reorders_scalar_last() {
        let q = normalize_quaternion([0.0, 0.0, 0.0, 2.0], QuaternionOrder::ScalarLast).unwrap();
        assert_eq!(q, Quaternion::identity());

        let q = normalize_quaternion([0.0, 0.0, 1.0, 1.0], QuaternionOrder::ScalarLast).unwrap();
        assert_quat_close(q, Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2), 1e-12);
    }

    #[test]
    fn normalize_flips_to_non_negative_w() {
        let q = normalize_quaternion([-0.5, 0.5, -0.5, 0.5], QuaternionOrder::ScalarFirst).unwrap();
        assert!(q.w >= 0.0);
        assert_quat_close(q, Quaternion::new(0.5, -0.5, 0.5, -0.5), 1e-12);
    }

    #[test]
    fn normalize_zero_w_picks_unique_sign() {
        let a = normalize_quaternion([0.0, -1.0, 0.0, 0.0], QuaternionOrder::ScalarFirst).unwrap();
        let b = normalize_quaternion([0.0, 1.0, 0.0, 0.0], QuaternionOrder::ScalarFirst).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_rejects_degenerate_input() {
        assert!(matches!(
            normalize_quaternion([0.0, 0.0, 0.0, 1e-12], QuaternionOrder::ScalarFirst),
            Err(GeometryError::InvalidQuaternion(_))
        ));
        assert!(matches!(
            normalize_quaternion([f64::NAN, 0.0, 0.0, 1.0], QuaternionOrder::ScalarFirst),
            Err(GeometryError::InvalidQuaternion(_))
        ));
        assert!(matches!(
            normalize_quaternion([1.0, f64::INFINITY, 0.0, 0.0], QuaternionOrder::ScalarLast),
            Err(GeometryError::InvalidQuaternion(_))
        ));
    }

    #[test]
    fn normalize_handles_huge_finite_components() {
        let q = normalize_quaternion([1e200, 0.0, 0.0, 0.0], QuaternionOrder::ScalarFirst).unwrap();
        assert_eq!(q, Quaternion::identity());

        let q = normalize_quaternion([0.0, 0.0, -1e160, 1e160], QuaternionOrder::ScalarFirst).unwrap();
        assert!((q.norm() - 1.0).abs() < 1e-12);
        assert!((q.y - FRAC_1_SQRT_2).abs() < 1e-12 && (q.z + FRAC_1_SQRT_2).abs() < 1e-12);

        let pose = Pose::from_parts([0.0; 3], [0.0, 0.0, 1e160, 1e160], QuaternionOrder::ScalarFirst).unwrap();
        assert!((pose.rotation().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let raw = [
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            ];
            let once = normalize_quaternion(raw, QuaternionOrder::ScalarLast).unwrap();
            let twice = normalize_quaternion(once.to_array(), QuaternionOrder::ScalarFirst).unwrap();
            assert!((once.norm() - 1.0).abs() < 1e-6);
            assert_quat_close(twice, once, 1e-14);
        }
    }

    // ── Pose::from_matrix ───────────────────────────────────────────────────

    #[test]
    fn identity_matrix_gives_identity_pose() {
        let pose = pose_from_matrix(&Matrix4::identity()).unwrap();
        assert_eq!(pose.translation(), Vec3::zero());
        assert_eq!(pose.rotation(), Quaternion::identity());
    }

    #[test]
    fn from_flat_reads_row_major_translation() {
        let m = [
            0.0, -1.0, 0.0, 1.5, //
            1.0, 0.0, 0.0, -2.0, //
            0.0, 0.0, 1.0, 0.25, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let pose = pose_from_flat(&m).unwrap();
        assert_vec_close(pose.translation(), Vec3::new(1.5, -2.0, 0.25), 1e-12);
        assert_quat_close(pose.rotation(), Quaternion::from_yaw(FRAC_PI_2).unwrap(), 1e-9);
    }

    #[test]
    fn from_flat_rejects_wrong_length() {
        assert!(matches!(
            pose_from_flat(&[1.0; 12]),
            Err(GeometryError::InvalidTransform(_))
        ));
    }

    #[test]
    fn from_matrix_rejects_scaled_and_reflected_blocks() {
        let scaled = Matrix4::new_scaling(2.0);
        assert!(matches!(pose_from_matrix(&scaled), Err(GeometryError::InvalidTransform(_))));

        let mut reflected = Matrix4::identity();
        reflected[(2, 2)] = -1.0;
        assert!(matches!(pose_from_matrix(&reflected), Err(GeometryError::InvalidTransform(_))));

        let mut sheared = Matrix4::identity();
        sheared[(0, 1)] = 0.01;
        assert!(matches!(pose_from_matrix(&sheared), Err(GeometryError::InvalidTransform(_))));
    }

    #[test]
    fn from_matrix_rejects_nan() {
        let mut m = Matrix4::identity();
        m[(1, 3)] = f64::NAN;
        assert!(matches!(pose_from_matrix(&m), Err(GeometryError::InvalidTransform(_))));
    }

    #[test]
    fn matrix_roundtrip_preserves_pose() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let pose = random_pose(&mut rng);
            let back = pose_from_matrix(&pose.to_matrix()).unwrap();
            assert_vec_close(back.translation(), pose.translation(), 1e-9);
            assert_quat_close(back.rotation(), pose.rotation(), 1e-9);
        }
    }

    // ── Pose algebra ────────────────────────────────────────────────────────

    #[test]
    fn pose_new_rejects_non_finite_translation() {
        assert!(matches!(
            Pose::new(Vec3::new(f64::INFINITY, 0.0, 0.0), Quaternion::identity()),
            Err(GeometryError::InvalidTransform(_))
        ));
    }

    #[test]
    fn compose_matches_sequential_application() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let a = random_pose(&mut rng);
            let b = random_pose(&mut rng);
            let p = Vec3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), 1.0);
            let lhs = apply_point(&compose(&a, &b), p);
            let rhs = a.apply_point(b.apply_point(p));
            assert_vec_close(lhs, rhs, 1e-9);
        }
    }

    #[test]
    fn compose_translations_add_without_rotation() {
        let a = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()).unwrap();
        let b = Pose::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity()).unwrap();
        assert_vec_close(compose(&a, &b).translation(), Vec3::new(3.0, 0.0, 0.0), 1e-12);
    }

    #[test]
    fn compose_respects_rotation_of_parent() {
        // base rotated 90° about Z; child 1 m along base +X → world +Y.
        let base = Pose::new(Vec3::zero(), Quaternion::from_yaw(FRAC_PI_2).unwrap()).unwrap();
        let child = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()).unwrap();
        assert_vec_close(compose(&base, &child).translation(), Vec3::new(0.0, 1.0, 0.0), 1e-12);
    }

    #[test]
    fn invert_undoes_pose() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let pose = random_pose(&mut rng);
            let round = compose(&pose, &invert(&pose));
            assert_vec_close(round.translation(), Vec3::zero(), 1e-9);
            assert_quat_close(round.rotation(), Quaternion::identity(), 1e-9);
        }
    }

    #[test]
    fn invert_matches_formula() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::from_yaw(0.4).unwrap()).unwrap();
        let inv = invert(&pose);
        assert_quat_close(inv.rotation(), pose.rotation().conjugate(), 1e-15);
        let expected = pose.rotation().conjugate().rotate(pose.translation().neg());
        assert_vec_close(inv.translation(), expected, 1e-12);
    }

    #[test]
    fn pose_serializes_as_arrays() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity()).unwrap();
        let json = serde_json::to_string(&pose).unwrap();
        assert_eq!(json, r#"{"translation":[1.0,2.0,3.0],"rotation":[1.0,0.0,0.0,0.0]}"#);
    }

    #[test]
    fn pose_deserialization_normalizes_and_validates() {
        let pose: Pose = serde_json::from_str(r#"{"translation":[0,0,0],"rotation":[-2,0,0,0]}"#).unwrap();
        assert_eq!(pose.rotation(), Quaternion::identity());

        let bad = serde_json::from_str::<Pose>(r#"{"translation":[0,0,0],"rotation":[0,0,0,0]}"#);
        assert!(bad.is_err());
    }
}
