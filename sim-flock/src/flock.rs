use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::boid::{validate_time_step, Boid, Steering};
use crate::boundary::BoundaryMode;
use crate::config::BoidConfig;
use crate::error::Result;
use crate::math::Vec3;
use crate::neighbor_grid::NeighborGrid;
use crate::neighborhood::{Neighbor, NeighborProvider};
use crate::observer::{SteeringEvent, SteeringObserver};

/// Grid reach beyond the largest world sphere, for agents mid-overshoot.
const GRID_EXTENT_MARGIN: f32 = 1.25;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub tick: u64,
    pub agents: usize,
    pub neighbor_reads: usize,
    pub relocations: usize,
}

/// Owns an agent collection and advances it one tick at a time. Every
/// agent's steering is computed from the same start-of-tick snapshot
/// before any agent moves.
pub struct Flock {
    boids: Vec<Boid>,
    boundary_mode: BoundaryMode,
    grid: NeighborGrid,
    snapshot: Vec<Neighbor>,
    tick: u64,
}

impl Default for Flock {
    fn default() -> Self {
        Self::new()
    }
}

impl Flock {
    pub fn new() -> Self {
        Self::with_boids(Vec::new())
    }

    pub fn with_boids(boids: Vec<Boid>) -> Self {
        Self {
            boids,
            boundary_mode: BoundaryMode::default(),
            grid: NeighborGrid::new(1.0, 1.0),
            snapshot: Vec::new(),
            tick: 0,
        }
    }

    /// `count` boids at the origin sharing one configuration.
    pub fn spawn(count: usize, config: &BoidConfig) -> Result<Self> {
        let boids = (0..count)
            .map(|_| Boid::from_config(Vec3::ZERO, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_boids(boids))
    }

    pub fn push(&mut self, boid: Boid) -> usize {
        self.boids.push(boid);
        self.boids.len() - 1
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn boid(&self, id: usize) -> Option<&Boid> {
        self.boids.get(id)
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn boundary_mode(&self) -> BoundaryMode {
        self.boundary_mode
    }

    /// Takes `&mut self`, so it cannot race a tick in progress.
    pub fn set_boundary_mode(&mut self, mode: BoundaryMode) {
        if mode != self.boundary_mode {
            tracing::info!(from = ?self.boundary_mode, to = ?mode, "boundary mode changed");
        }
        self.boundary_mode = mode;
    }

    pub fn advance_boundary_mode(&mut self) -> BoundaryMode {
        self.set_boundary_mode(self.boundary_mode.next());
        self.boundary_mode
    }

    /// Scenario setup: reproducible random headings and positions. Not for
    /// use once a run that must replay deterministically has started.
    pub fn scatter(&mut self, seed: u64, distance: f32) -> Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for boid in &mut self.boids {
            boid.randomize(&mut rng, distance)?;
        }
        tracing::debug!(seed, distance, agents = self.boids.len(), "flock scattered");
        Ok(())
    }

    pub fn update(&mut self, elapsed_time: f32) -> Result<TickStats> {
        self.update_observed(elapsed_time, &mut ())
    }

    pub fn update_observed<O>(&mut self, elapsed_time: f32, observer: &mut O) -> Result<TickStats>
    where
        O: SteeringObserver + ?Sized,
    {
        validate_time_step(elapsed_time)?;
        self.tick = self.tick.wrapping_add(1);
        let span = tracing::debug_span!("flock_tick", tick = self.tick);
        let _enter = span.enter();

        self.take_snapshot();
        let results = self.compute_all_steering();

        let mut stats = TickStats {
            tick: self.tick,
            agents: self.boids.len(),
            ..TickStats::default()
        };

        for (id, (steering, neighbor_reads)) in results.iter().enumerate() {
            stats.neighbor_reads += neighbor_reads;
            observer.on_steering(&SteeringEvent {
                id,
                forces: steering.forces,
                boundary: steering.boundary,
            });
        }

        for (id, (boid, (steering, _))) in self.boids.iter_mut().zip(&results).enumerate() {
            if let Some(position) = steering.boundary.relocation() {
                tracing::trace!(id, ?position, "wrapped to antipode");
                stats.relocations += 1;
            }
            boid.commit(steering, elapsed_time);
        }

        tracing::debug!(
            agents = stats.agents,
            neighbor_reads = stats.neighbor_reads,
            relocations = stats.relocations,
            "tick complete"
        );
        Ok(stats)
    }

    fn take_snapshot(&mut self) {
        self.snapshot.clear();
        let boids = self.boids.iter().enumerate();
        self.snapshot.extend(boids.map(|(id, boid)| boid.as_neighbor(id)));

        let (world_radius, cell_size) = self.boids.iter().fold((0.0f32, 0.0f32), |acc, boid| {
            let params = boid.params();
            (acc.0.max(params.world_radius), acc.1.max(params.max_radius()))
        });
        self.grid.set_half_extent(world_radius * GRID_EXTENT_MARGIN);
        self.grid.set_cell_size(cell_size);
        self.grid.rebuild(&self.snapshot);
    }

    /// Read phase. Only the snapshot grid and unmodified boids are touched.
    fn compute_all_steering(&self) -> Vec<(Steering, usize)> {
        let grid = &self.grid;
        let mode = self.boundary_mode;
        let compute = |(id, boid): (usize, &Boid)| {
            let mut neighbors = grid.query(boid.vehicle().position(), boid.params().max_radius());
            neighbors.retain(|n| n.id != id);
            (boid.compute_steering(&neighbors, mode), neighbors.len())
        };

        #[cfg(feature = "parallel")]
        let results = self.boids.par_iter().enumerate().map(compute).collect();
        #[cfg(not(feature = "parallel"))]
        let results = self.boids.iter().enumerate().map(compute).collect();

        results
    }
}
