use rand::Rng;

use crate::boundary::{handle_boundary, BoundaryAction, BoundaryMode, BoundaryProbe};
use crate::config::BoidConfig;
use crate::error::{FlockError, Result};
use crate::flocking::{steer_to_flock, FlockForces, FlockingParams, Observer};
use crate::math::{Vec3, EPSILON};
use crate::neighborhood::Neighbor;
use crate::vehicle::{Basis, Vehicle, VehicleParams};

/// Fraction of max speed a boid cruises at after `reset`.
pub const RESET_SPEED_FRACTION: f32 = 0.3;

/// Read-phase result for one agent: everything `commit` needs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Steering {
    pub forces: FlockForces,
    pub boundary: BoundaryAction,
}

impl Steering {
    pub fn total(&self) -> Vec3 {
        self.forces.total() + self.boundary.steering()
    }
}

/// A flocking agent: a vehicle plus its rule tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct Boid {
    vehicle: Vehicle,
    params: FlockingParams,
}

impl Boid {
    pub fn new(
        position: Vec3,
        vehicle_params: VehicleParams,
        flocking_params: FlockingParams,
    ) -> Result<Self> {
        flocking_params.validate()?;
        let vehicle = Vehicle::new(position, Basis::IDENTITY, vehicle_params)?;

        let mut boid = Self {
            vehicle,
            params: flocking_params,
        };
        boid.reset();
        Ok(boid)
    }

    pub fn from_config(position: Vec3, config: &BoidConfig) -> Result<Self> {
        let (vehicle_params, flocking_params) = config.validate()?;
        Self::new(position, vehicle_params, flocking_params)
    }

    /// Identity orientation, cruising speed. Position is kept.
    pub fn reset(&mut self) {
        self.vehicle.set_basis(Basis::IDENTITY);
        let cruise = self.vehicle.params().max_speed * RESET_SPEED_FRACTION;
        self.vehicle.set_speed(cruise);
    }

    /// Scenario setup only: random heading, random position within
    /// `distance` of the origin. Planar boids stay on their plane.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R, distance: f32) -> Result<()> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(FlockError::InvalidScatterDistance(distance));
        }

        let planar = !self.vehicle.params().moves_vertically;
        let heading = random_vector_in_unit_sphere(rng, planar).normalize_or(Vec3::Z);
        let offset = random_vector_in_unit_sphere(rng, planar) * distance;
        let position = if planar {
            Vec3::new(offset.x, self.vehicle.position().y, offset.z)
        } else {
            offset
        };

        self.vehicle.set_basis(Basis::from_forward(heading));
        self.vehicle.set_position(position);
        Ok(())
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn params(&self) -> &FlockingParams {
        &self.params
    }

    pub fn set_params(&mut self, params: FlockingParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn config(&self) -> BoidConfig {
        BoidConfig::from_params(&self.vehicle.params(), &self.params)
    }

    pub fn as_neighbor(&self, id: usize) -> Neighbor {
        Neighbor {
            id,
            position: self.vehicle.position(),
            forward: self.vehicle.forward(),
        }
    }

    pub fn steer_to_flock(&self, neighbors: &[Neighbor]) -> FlockForces {
        let observer = Observer {
            position: self.vehicle.position(),
            forward: self.vehicle.forward(),
        };
        steer_to_flock(&observer, neighbors, &self.params)
    }

    pub fn handle_boundary(&self, mode: BoundaryMode) -> BoundaryAction {
        let vehicle_params = self.vehicle.params();
        let probe = BoundaryProbe {
            position: self.vehicle.position(),
            forward: self.vehicle.forward(),
            side: self.vehicle.side(),
            speed: self.vehicle.speed(),
            max_speed: vehicle_params.max_speed,
            moves_vertically: vehicle_params.moves_vertically,
        };
        handle_boundary(&probe, self.params.world_radius, mode)
    }

    /// Read phase: nothing on `self` changes.
    pub fn compute_steering(&self, neighbors: &[Neighbor], mode: BoundaryMode) -> Steering {
        Steering {
            forces: self.steer_to_flock(neighbors),
            boundary: self.handle_boundary(mode),
        }
    }

    /// Write phase: relocate if containment asked for it, then integrate.
    pub fn commit(&mut self, steering: &Steering, elapsed_time: f32) {
        if let Some(position) = steering.boundary.relocation() {
            self.vehicle.set_position(position);
        }
        self.vehicle.apply_steering_force(steering.total(), elapsed_time);
    }

    /// Single-agent tick. `neighbors` must not include this boid and must
    /// come from the same start-of-tick snapshot as every other agent's.
    pub fn update(
        &mut self,
        elapsed_time: f32,
        neighbors: &[Neighbor],
        mode: BoundaryMode,
    ) -> Result<Steering> {
        validate_time_step(elapsed_time)?;
        let steering = self.compute_steering(neighbors, mode);
        self.commit(&steering, elapsed_time);
        Ok(steering)
    }
}

pub(crate) fn validate_time_step(elapsed_time: f32) -> Result<()> {
    if !elapsed_time.is_finite() || elapsed_time < 0.0 {
        return Err(FlockError::InvalidTimeStep(elapsed_time));
    }
    Ok(())
}

fn random_vector_in_unit_sphere<R: Rng>(rng: &mut R, planar: bool) -> Vec3 {
    loop {
        let y = if planar { 0.0 } else { rng.gen_range(-1.0..=1.0) };
        let v = Vec3::new(rng.gen_range(-1.0..=1.0), y, rng.gen_range(-1.0..=1.0));
        let len_sq = v.length_squared();
        if len_sq > EPSILON && len_sq <= 1.0 {
            return v;
        }
    }
}
