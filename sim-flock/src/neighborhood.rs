use serde::{Deserialize, Serialize};

use crate::math::{Vec3, EPSILON};

/// Read-only view of another agent as of the start of the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: usize,
    pub position: Vec3,
    pub forward: Vec3,
}

/// Supplies candidate neighbors around a point. Results must reflect the
/// start-of-tick snapshot and come back sorted by `id` so that summation
/// order, and therefore the resulting forces, are reproducible.
pub trait NeighborProvider {
    fn query(&self, position: Vec3, max_radius: f32) -> Vec<Neighbor>;
}

impl NeighborProvider for [Neighbor] {
    fn query(&self, position: Vec3, max_radius: f32) -> Vec<Neighbor> {
        let radius_sq = max_radius.max(0.0) * max_radius.max(0.0);
        let mut found: Vec<Neighbor> = self
            .iter()
            .filter(|n| (n.position - position).length_squared() <= radius_sq)
            .copied()
            .collect();
        found.sort_by_key(|n| n.id);
        found
    }
}

/// Radius plus view-cone test. A candidate sitting on top of the observer
/// always counts, since it has no direction to test against the cone.
pub fn is_in_neighborhood(
    position: Vec3,
    forward: Vec3,
    candidate: Vec3,
    radius: f32,
    cos_max_angle: f32,
) -> bool {
    let offset = candidate - position;
    let distance = offset.length();

    if distance > radius {
        return false;
    }
    if distance < EPSILON {
        return true;
    }

    let unit_offset = offset / distance;
    unit_offset.dot(forward) > cos_max_angle
}
