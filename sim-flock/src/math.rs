use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

pub const EPSILON: f32 = 1.0e-6;

/// Plain 3D vector used for positions, directions and forces. `y` is the
/// vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn normalize_or_zero(self) -> Self {
        self.normalize_or(Self::ZERO)
    }

    /// Unit vector in the direction of `self`, or `fallback` when `self` is
    /// too short to carry a direction.
    pub fn normalize_or(self, fallback: Self) -> Self {
        let len_sq = self.length_squared();
        if len_sq <= EPSILON * EPSILON {
            return fallback;
        }
        self * (1.0 / len_sq.sqrt())
    }

    /// Clamp the magnitude to `max_length`, keeping direction.
    pub fn truncate_length(self, max_length: f32) -> Self {
        if max_length <= 0.0 {
            return Self::ZERO;
        }

        let len_sq = self.length_squared();
        if len_sq <= max_length * max_length {
            return self;
        }

        self * (max_length / len_sq.sqrt())
    }

    /// Component of `self` along `unit_basis`, which must be unit length.
    pub fn parallel_component(self, unit_basis: Self) -> Self {
        unit_basis * self.dot(unit_basis)
    }

    /// Component of `self` orthogonal to `unit_basis`, which must be unit length.
    pub fn perpendicular_component(self, unit_basis: Self) -> Self {
        self - self.parallel_component(unit_basis)
    }

    pub fn horizontal(self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Move `accumulator` toward `target` by `rate`, clamped to `[0, 1]`.
/// Frame-rate independent smoothing when `rate` is scaled by elapsed time.
pub fn blend_into_accumulator(rate: f32, target: Vec3, accumulator: &mut Vec3) {
    *accumulator = accumulator.lerp(target, rate.clamp(0.0, 1.0));
}

/// View-cone half angle in degrees to the cosine compared against in the
/// neighborhood test.
pub fn angle_to_cosine(degrees: f32) -> f32 {
    degrees.to_radians().cos()
}

pub fn cosine_to_angle(cosine: f32) -> f32 {
    cosine.clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::{angle_to_cosine, blend_into_accumulator, cosine_to_angle, Vec3};

    #[test]
    fn truncated_vector_has_expected_upper_bound() {
        let v = Vec3::new(0.0, 0.0, 10.0).truncate_length(2.0);
        assert!((v.length() - 2.0).abs() < 1.0e-5);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0).truncate_length(2.0), Vec3::X);
    }

    #[test]
    fn normalize_keeps_fallback_for_tiny_vectors() {
        assert_eq!(Vec3::new(1.0e-9, 0.0, 0.0).normalize_or(Vec3::Y), Vec3::Y);
        let n = Vec3::new(3.0, 4.0, 0.0).normalize_or_zero();
        assert!((n.x - 0.6).abs() < 1.0e-6);
        assert!((n.y - 0.8).abs() < 1.0e-6);
    }

    #[test]
    fn components_split_vector() {
        let v = Vec3::new(2.0, 3.0, -1.0);
        let parallel = v.parallel_component(Vec3::Z);
        let perpendicular = v.perpendicular_component(Vec3::Z);
        assert_eq!(parallel, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(perpendicular, Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(parallel + perpendicular, v);
    }

    #[test]
    fn cross_follows_axis_order() {
        assert_eq!(Vec3::Y.cross(Vec3::Z), Vec3::X);
        assert_eq!(Vec3::Z.cross(Vec3::X), Vec3::Y);
    }

    #[test]
    fn angle_conversion_is_symmetric() {
        for degrees in [0.0_f32, 30.0, 90.0, 135.0, 180.0] {
            let back = cosine_to_angle(angle_to_cosine(degrees));
            assert!((back - degrees).abs() < 1.0e-3, "{degrees} -> {back}");
        }
        assert!(angle_to_cosine(90.0).abs() < 1.0e-6);
        assert!((cosine_to_angle(1.5) - 0.0).abs() < 1.0e-6);
    }

    #[test]
    fn blend_clamps_rate() {
        let mut acc = Vec3::ZERO;
        blend_into_accumulator(0.5, Vec3::new(2.0, 0.0, 0.0), &mut acc);
        assert_eq!(acc, Vec3::X);
        blend_into_accumulator(4.0, Vec3::new(5.0, 0.0, 0.0), &mut acc);
        assert_eq!(acc, Vec3::new(5.0, 0.0, 0.0));
    }
}
