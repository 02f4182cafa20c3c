use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};
use crate::math::{blend_into_accumulator, Vec3, EPSILON};

const ORTHONORMAL_TOLERANCE: f32 = 1.0e-3;
const REFERENCE_SWITCH_DOT: f32 = 0.97;

// Banking: the global up term makes the vehicle right itself, the
// acceleration term rolls it toward the center of path curvature.
const BANK_GLOBAL_UP: Vec3 = Vec3::new(0.0, 0.2, 0.0);
const BANK_ACCELERATION_GAIN: f32 = 0.05;
const BANK_SMOOTH_RATE: f32 = 3.0;
const ACCELERATION_SMOOTH_RATE: f32 = 0.4;

/// Orthonormal local frame. `side = up x forward`, `up = forward x side`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Basis {
    pub forward: Vec3,
    pub side: Vec3,
    pub up: Vec3,
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Basis {
    pub const IDENTITY: Self = Self {
        forward: Vec3::Z,
        side: Vec3::X,
        up: Vec3::Y,
    };

    pub fn new(forward: Vec3, side: Vec3, up: Vec3) -> Result<Self> {
        let basis = Self { forward, side, up };
        if !basis.is_orthonormal(ORTHONORMAL_TOLERANCE) {
            return Err(FlockError::DegenerateOrientation);
        }
        Ok(basis)
    }

    /// Frame facing `heading`, picking world up as the roll reference unless
    /// the heading is nearly vertical.
    pub fn from_forward(heading: Vec3) -> Self {
        let forward = heading.normalize_or(Vec3::Z);
        let up_ref = if forward.dot(Vec3::Y).abs() > REFERENCE_SWITCH_DOT {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Self::from_forward_and_up(forward, up_ref)
    }

    /// Frame facing `forward` with `up_hint` as the approximate up direction.
    pub fn from_forward_and_up(forward: Vec3, up_hint: Vec3) -> Self {
        let forward = forward.normalize_or(Vec3::Z);
        let side = up_hint.cross(forward);
        if side.length_squared() <= EPSILON {
            return Self::from_forward(forward);
        }

        let side = side.normalize_or_zero();
        let up = forward.cross(side).normalize_or(Vec3::Y);
        Self { forward, side, up }
    }

    pub fn is_orthonormal(&self, tolerance: f32) -> bool {
        let unit = |v: Vec3| v.is_finite() && (v.length() - 1.0).abs() <= tolerance;
        unit(self.forward)
            && unit(self.side)
            && unit(self.up)
            && self.forward.dot(self.side).abs() <= tolerance
            && self.forward.dot(self.up).abs() <= tolerance
            && self.side.dot(self.up).abs() <= tolerance
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleParams {
    pub mass: f32,
    pub max_force: f32,
    pub max_speed: f32,
    /// When false, forces lose their vertical component and the vehicle
    /// stays on its initial horizontal plane.
    pub moves_vertically: bool,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            max_force: 27.0,
            max_speed: 9.0,
            moves_vertically: true,
        }
    }
}

impl VehicleParams {
    pub fn validate(&self) -> Result<()> {
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(FlockError::InvalidMass(self.mass));
        }
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 {
            return Err(FlockError::InvalidMaxSpeed(self.max_speed));
        }
        if !self.max_force.is_finite() || self.max_force < 0.0 {
            return Err(FlockError::InvalidMaxForce(self.max_force));
        }
        Ok(())
    }
}

/// Point-mass vehicle: position, local frame and scalar speed along
/// `forward`.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    position: Vec3,
    basis: Basis,
    speed: f32,
    smoothed_acceleration: Vec3,
    params: VehicleParams,
}

impl Vehicle {
    pub fn new(position: Vec3, basis: Basis, params: VehicleParams) -> Result<Self> {
        params.validate()?;
        if !position.is_finite() {
            return Err(FlockError::NonFinitePosition);
        }
        if !basis.is_orthonormal(ORTHONORMAL_TOLERANCE) {
            return Err(FlockError::DegenerateOrientation);
        }

        let mut vehicle = Self {
            position,
            basis,
            speed: 0.0,
            smoothed_acceleration: Vec3::ZERO,
            params,
        };
        vehicle.set_basis(basis);
        Ok(vehicle)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn forward(&self) -> Vec3 {
        self.basis.forward
    }

    pub fn side(&self) -> Vec3 {
        self.basis.side
    }

    pub fn up(&self) -> Vec3 {
        self.basis.up
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn velocity(&self) -> Vec3 {
        self.basis.forward * self.speed
    }

    pub fn params(&self) -> VehicleParams {
        self.params
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub(crate) fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(0.0, self.params.max_speed);
    }

    /// Planar vehicles get their heading flattened onto the horizontal plane.
    pub(crate) fn set_basis(&mut self, basis: Basis) {
        self.basis = if self.params.moves_vertically || basis.forward.y == 0.0 {
            basis
        } else {
            Basis::from_forward(basis.forward.horizontal().normalize_or(Vec3::Z))
        };
        self.smoothed_acceleration = Vec3::ZERO;
    }

    /// Integrate one step: clamp the force, accelerate, clamp the speed,
    /// re-derive the frame with banking, then move.
    pub fn apply_steering_force(&mut self, force: Vec3, elapsed_time: f32) {
        let force = if force.is_finite() {
            force
        } else {
            tracing::warn!(?force, "ignoring non-finite steering force");
            Vec3::ZERO
        };
        let force = if self.params.moves_vertically {
            force
        } else {
            force.horizontal()
        };

        let acceleration = force.truncate_length(self.params.max_force) / self.params.mass;
        let raw_velocity = self.velocity() + acceleration * elapsed_time;
        let raw_speed = raw_velocity.length();
        let (velocity, speed) = if raw_speed > self.params.max_speed {
            (
                raw_velocity * (self.params.max_speed / raw_speed),
                self.params.max_speed,
            )
        } else {
            (raw_velocity, raw_speed)
        };

        self.speed = speed;
        blend_into_accumulator(
            elapsed_time * ACCELERATION_SMOOTH_RATE,
            acceleration,
            &mut self.smoothed_acceleration,
        );
        self.regenerate_basis_for_banking(velocity, elapsed_time);
        self.position += velocity * elapsed_time;
    }

    fn regenerate_basis_for_banking(&mut self, velocity: Vec3, elapsed_time: f32) {
        if self.speed <= EPSILON {
            return;
        }

        let bank_up = self.smoothed_acceleration * BANK_ACCELERATION_GAIN + BANK_GLOBAL_UP;
        let mut up = self.basis.up;
        blend_into_accumulator(elapsed_time * BANK_SMOOTH_RATE, bank_up, &mut up);
        let up = up.normalize_or(self.basis.up);

        let forward = velocity.normalize_or(self.basis.forward);
        self.basis = Basis::from_forward_and_up(forward, up);
    }
}
