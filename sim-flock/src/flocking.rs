use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};
use crate::math::{angle_to_cosine, Vec3};
use crate::neighborhood::{is_in_neighborhood, Neighbor};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    Separation,
    Alignment,
    Cohesion,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Separation => "separation",
            Self::Alignment => "alignment",
            Self::Cohesion => "cohesion",
        };
        f.write_str(name)
    }
}

/// Perception and gain for one flocking rule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorParams {
    pub radius: f32,
    /// Cosine of the view-cone half angle.
    pub cos_max_angle: f32,
    /// May be negative to invert the rule.
    pub weight: f32,
}

impl BehaviorParams {
    pub fn from_degrees(radius: f32, angle_degrees: f32, weight: f32) -> Self {
        Self {
            radius,
            cos_max_angle: angle_to_cosine(angle_degrees),
            weight,
        }
    }

    pub fn validate(&self, behavior: Behavior) -> Result<()> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(FlockError::InvalidRadius {
                behavior,
                radius: self.radius,
            });
        }
        if !(-1.0..=1.0).contains(&self.cos_max_angle) {
            return Err(FlockError::InvalidCosine {
                behavior,
                cosine: self.cos_max_angle,
            });
        }
        if !self.weight.is_finite() {
            return Err(FlockError::InvalidWeight {
                behavior,
                weight: self.weight,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlockingParams {
    pub separation: BehaviorParams,
    pub alignment: BehaviorParams,
    pub cohesion: BehaviorParams,
    pub world_radius: f32,
    /// Reserved for collision anticipation; no current rule reads it.
    pub min_time_to_collision: f32,
}

impl Default for FlockingParams {
    fn default() -> Self {
        Self {
            separation: BehaviorParams {
                radius: 5.0,
                cos_max_angle: -0.707,
                weight: 12.0,
            },
            alignment: BehaviorParams {
                radius: 7.5,
                cos_max_angle: 0.7,
                weight: 8.0,
            },
            cohesion: BehaviorParams {
                radius: 9.0,
                cos_max_angle: -0.15,
                weight: 8.0,
            },
            world_radius: 50.0,
            min_time_to_collision: 2.0,
        }
    }
}

impl FlockingParams {
    pub fn validate(&self) -> Result<()> {
        self.separation.validate(Behavior::Separation)?;
        self.alignment.validate(Behavior::Alignment)?;
        self.cohesion.validate(Behavior::Cohesion)?;
        if !self.world_radius.is_finite() || self.world_radius <= 0.0 {
            return Err(FlockError::InvalidWorldRadius(self.world_radius));
        }
        if !self.min_time_to_collision.is_finite() || self.min_time_to_collision < 0.0 {
            return Err(FlockError::InvalidTimeToCollision(
                self.min_time_to_collision,
            ));
        }
        Ok(())
    }

    /// Largest perception radius over the three rules; the neighbor query
    /// must reach at least this far.
    pub fn max_radius(&self) -> f32 {
        self.separation
            .radius
            .max(self.alignment.radius)
            .max(self.cohesion.radius)
    }
}

/// Observer state the rules read: where the agent is and where it faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    pub position: Vec3,
    pub forward: Vec3,
}

impl Observer {
    fn sees(&self, neighbor: &Neighbor, params: &BehaviorParams) -> bool {
        is_in_neighborhood(
            self.position,
            self.forward,
            neighbor.position,
            params.radius,
            params.cos_max_angle,
        )
    }
}

/// Weighted rule outputs for one agent and tick. Their sum is the
/// unclamped flocking force.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlockForces {
    pub separation: Vec3,
    pub alignment: Vec3,
    pub cohesion: Vec3,
}

impl FlockForces {
    pub fn total(&self) -> Vec3 {
        self.separation + self.alignment + self.cohesion
    }
}

/// Unit direction away from the qualifying neighbors, or zero.
pub fn steer_for_separation(
    observer: &Observer,
    neighbors: &[Neighbor],
    params: &BehaviorParams,
) -> Vec3 {
    let mut steering = Vec3::ZERO;
    let mut count = 0usize;

    for neighbor in neighbors.iter().filter(|n| observer.sees(n, params)) {
        steering += observer.position - neighbor.position;
        count += 1;
    }

    if count == 0 {
        return Vec3::ZERO;
    }
    steering.normalize_or_zero()
}

/// Unit direction from own heading toward the average neighbor heading, or
/// zero.
pub fn steer_for_alignment(
    observer: &Observer,
    neighbors: &[Neighbor],
    params: &BehaviorParams,
) -> Vec3 {
    let mut heading_sum = Vec3::ZERO;
    let mut count = 0usize;

    for neighbor in neighbors.iter().filter(|n| observer.sees(n, params)) {
        heading_sum += neighbor.forward;
        count += 1;
    }

    if count == 0 {
        return Vec3::ZERO;
    }
    (heading_sum / count as f32 - observer.forward).normalize_or_zero()
}

/// Unit direction toward the centroid of qualifying neighbors, or zero.
pub fn steer_for_cohesion(
    observer: &Observer,
    neighbors: &[Neighbor],
    params: &BehaviorParams,
) -> Vec3 {
    let mut position_sum = Vec3::ZERO;
    let mut count = 0usize;

    for neighbor in neighbors.iter().filter(|n| observer.sees(n, params)) {
        position_sum += neighbor.position;
        count += 1;
    }

    if count == 0 {
        return Vec3::ZERO;
    }
    (position_sum / count as f32 - observer.position).normalize_or_zero()
}

/// Run all three rules over the same neighbor set and apply their weights.
/// Each rule yields a unit vector or zero, so the weights alone set the
/// size of each contribution.
pub fn steer_to_flock(
    observer: &Observer,
    neighbors: &[Neighbor],
    params: &FlockingParams,
) -> FlockForces {
    let separation = steer_for_separation(observer, neighbors, &params.separation);
    let alignment = steer_for_alignment(observer, neighbors, &params.alignment);
    let cohesion = steer_for_cohesion(observer, neighbors, &params.cohesion);

    FlockForces {
        separation: separation * params.separation.weight,
        alignment: alignment * params.alignment.weight,
        cohesion: cohesion * params.cohesion.weight,
    }
}
