use wasm_bindgen::prelude::*;

pub mod boid;
pub mod boundary;
pub mod config;
pub mod error;
pub mod flock;
pub mod flocking;
pub mod math;
pub mod neighbor_grid;
pub mod neighborhood;
pub mod observer;
pub mod vehicle;

pub use boid::{Boid, Steering};
pub use boundary::{BoundaryAction, BoundaryMode};
pub use config::{BehaviorConfig, BoidConfig};
pub use error::FlockError;
pub use flock::{Flock, TickStats};
pub use flocking::{Behavior, BehaviorParams, FlockForces, FlockingParams};
pub use math::Vec3;
pub use neighbor_grid::NeighborGrid;
pub use neighborhood::{is_in_neighborhood, Neighbor, NeighborProvider};
pub use observer::{SteeringEvent, SteeringObserver};
pub use vehicle::{Basis, Vehicle, VehicleParams};

/// Initial scatter radius as a fraction of the world radius.
const SCATTER_FRACTION: f32 = 0.5;

/// Browser-facing handle around a [`Flock`]. Positions and headings are
/// mirrored into flat `xyz` buffers after every step for rendering.
#[wasm_bindgen]
pub struct Sim {
    flock: Flock,
    config: BoidConfig,
    positions: Vec<f32>,
    forwards: Vec<f32>,
}

#[wasm_bindgen]
impl Sim {
    /// Seed `0` draws a seed from the platform entropy source.
    #[wasm_bindgen(constructor)]
    pub fn new(count: usize, seed: u32, world_radius: f32) -> Result<Sim, JsError> {
        let config = BoidConfig {
            world_radius,
            ..BoidConfig::default()
        };
        Ok(Self::build(count, seed, config)?)
    }

    pub fn from_json(count: usize, seed: u32, config_json: &str) -> Result<Sim, JsError> {
        let config = BoidConfig::from_json(config_json).inspect_err(|err| {
            tracing::warn!(%err, "rejected flock configuration");
        })?;
        Ok(Self::build(count, seed, config)?)
    }

    pub fn step(&mut self, dt: f32) -> Result<(), JsError> {
        self.advance(dt)?;
        Ok(())
    }

    pub fn set_boundary_mode(&mut self, mode: u32) {
        self.flock.set_boundary_mode(BoundaryMode::from_u32(mode));
    }

    pub fn boundary_mode(&self) -> u32 {
        self.flock.boundary_mode().as_u32()
    }

    pub fn toggle_boundary_mode(&mut self) -> u32 {
        self.flock.advance_boundary_mode().as_u32()
    }

    pub fn count(&self) -> usize {
        self.flock.len()
    }

    pub fn positions(&self) -> Vec<f32> {
        self.positions.clone()
    }

    pub fn forwards(&self) -> Vec<f32> {
        self.forwards.clone()
    }

    pub fn config_json(&self) -> Result<String, JsError> {
        Ok(self.config.to_json()?)
    }
}

impl Sim {
    pub fn build(count: usize, seed: u32, config: BoidConfig) -> error::Result<Self> {
        let seed = resolve_seed(seed)?;
        let mut flock = Flock::spawn(count, &config)?;
        flock.scatter(seed, config.world_radius * SCATTER_FRACTION)?;
        tracing::info!(
            count,
            seed,
            world_radius = config.world_radius,
            "simulation created"
        );

        let mut sim = Self {
            flock,
            config,
            positions: Vec::with_capacity(count * 3),
            forwards: Vec::with_capacity(count * 3),
        };
        sim.sync_render_buffers();
        Ok(sim)
    }

    pub fn advance(&mut self, dt: f32) -> error::Result<TickStats> {
        let stats = self.flock.update(dt)?;
        self.sync_render_buffers();
        Ok(stats)
    }

    pub fn flock(&self) -> &Flock {
        &self.flock
    }

    fn sync_render_buffers(&mut self) {
        self.positions.clear();
        self.forwards.clear();
        for boid in self.flock.boids() {
            let position = boid.vehicle().position();
            let forward = boid.vehicle().forward();
            self.positions.extend_from_slice(&[position.x, position.y, position.z]);
            self.forwards.extend_from_slice(&[forward.x, forward.y, forward.z]);
        }
    }
}

fn resolve_seed(seed: u32) -> error::Result<u64> {
    if seed != 0 {
        return Ok(u64::from(seed));
    }
    getrandom::u64().map_err(|err| FlockError::EntropyError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{BoidConfig, BoundaryMode, Sim};

    #[test]
    fn buffers_track_the_flock() {
        let mut sim = Sim::build(10, 7, BoidConfig::default()).unwrap();
        assert_eq!(sim.count(), 10);
        assert_eq!(sim.positions().len(), 30);
        assert_eq!(sim.forwards().len(), 30);

        let before = sim.positions();
        sim.advance(0.1).unwrap();
        assert_ne!(before, sim.positions());
        let first = sim.flock().boids()[0].vehicle().position();
        assert_eq!(&sim.positions()[..3], &[first.x, first.y, first.z]);
    }

    #[test]
    fn same_seed_same_scenario() {
        let a = Sim::build(8, 1234, BoidConfig::default()).unwrap();
        let b = Sim::build(8, 1234, BoidConfig::default()).unwrap();
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.forwards(), b.forwards());
    }

    #[test]
    fn boundary_mode_codes() {
        let mut sim = Sim::build(2, 3, BoidConfig::default()).unwrap();
        assert_eq!(sim.boundary_mode(), 0);
        sim.set_boundary_mode(1);
        assert_eq!(sim.flock().boundary_mode(), BoundaryMode::WrapAround);
        assert_eq!(sim.toggle_boundary_mode(), 0);
    }

    #[test]
    fn rejects_invalid_world_radius() {
        let config = BoidConfig {
            world_radius: -5.0,
            ..BoidConfig::default()
        };
        assert!(Sim::build(4, 9, config).is_err());
    }
}
