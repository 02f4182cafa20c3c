use serde::{Deserialize, Serialize};

use crate::math::{Vec3, EPSILON};

/// Wrapped agents land this fraction of the world radius from the center,
/// just inside the sphere, so they are not wrapped straight back.
const WRAP_INSET: f32 = 0.999;

/// How agents outside the world sphere are brought back. Chosen per
/// simulation and only changed between ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryMode {
    #[default]
    Seek,
    WrapAround,
}

impl BoundaryMode {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::WrapAround,
            _ => Self::Seek,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Seek => 0,
            Self::WrapAround => 1,
        }
    }

    /// Advance to the other mode, the way an interactive toggle would.
    pub fn next(self) -> Self {
        match self {
            Self::Seek => Self::WrapAround,
            Self::WrapAround => Self::Seek,
        }
    }
}

/// Containment response for one agent. Relocation is applied in the commit
/// phase, never while other agents are still reading the snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum BoundaryAction {
    #[default]
    Inside,
    Steer(Vec3),
    Relocate(Vec3),
}

impl BoundaryAction {
    pub fn steering(&self) -> Vec3 {
        match self {
            Self::Steer(force) => *force,
            Self::Inside | Self::Relocate(_) => Vec3::ZERO,
        }
    }

    pub fn relocation(&self) -> Option<Vec3> {
        match self {
            Self::Relocate(position) => Some(*position),
            Self::Inside | Self::Steer(_) => None,
        }
    }
}

/// Agent state the containment check reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryProbe {
    pub position: Vec3,
    pub forward: Vec3,
    pub side: Vec3,
    pub speed: f32,
    pub max_speed: f32,
    pub moves_vertically: bool,
}

pub fn handle_boundary(
    probe: &BoundaryProbe,
    world_radius: f32,
    mode: BoundaryMode,
) -> BoundaryAction {
    if probe.position.length() < world_radius {
        return BoundaryAction::Inside;
    }

    match mode {
        BoundaryMode::Seek => BoundaryAction::Steer(seek_inward_laterally(probe)),
        BoundaryMode::WrapAround => BoundaryAction::Relocate(antipodal_point(probe, world_radius)),
    }
}

/// Seek the origin, keeping only the part of the seek force that turns the
/// agent rather than braking or thrusting it.
fn seek_inward_laterally(probe: &BoundaryProbe) -> Vec3 {
    let velocity = probe.forward * probe.speed;
    let desired = (-probe.position).normalize_or_zero() * probe.max_speed;
    let seek = desired - velocity;
    let lateral = seek.perpendicular_component(probe.forward);

    if lateral.length_squared() > EPSILON {
        return lateral;
    }
    // Heading straight out leaves no lateral part; turn along side instead.
    if probe.forward.dot(desired) < 0.0 {
        return probe.side * seek.length();
    }
    lateral
}

/// Mirror point through the center, just inside the sphere. Planar agents
/// mirror only their horizontal coordinates so their height is kept.
///
/// A planar agent whose height alone reaches the wrap radius has no point
/// inside the sphere on its plane. It lands on the vertical axis at its own
/// height and stays outside, so it is wrapped again on every tick.
fn antipodal_point(probe: &BoundaryProbe, world_radius: f32) -> Vec3 {
    let target_radius = world_radius * WRAP_INSET;

    if probe.moves_vertically {
        return (-probe.position).normalize_or_zero() * target_radius;
    }

    let height = probe.position.y;
    let horizontal = (-probe.position.horizontal()).normalize_or_zero();
    let horizontal_radius = (target_radius * target_radius - height * height)
        .max(0.0)
        .sqrt();
    Vec3::new(
        horizontal.x * horizontal_radius,
        height,
        horizontal.z * horizontal_radius,
    )
}

#[cfg(test)]
mod tests {
    use super::{handle_boundary, BoundaryAction, BoundaryMode, BoundaryProbe};
    use crate::math::Vec3;

    const WORLD_RADIUS: f32 = 50.0;

    fn probe_at(position: Vec3, forward: Vec3) -> BoundaryProbe {
        BoundaryProbe {
            position,
            forward,
            side: Vec3::Y.cross(forward).normalize_or(Vec3::X),
            speed: 3.0,
            max_speed: 9.0,
            moves_vertically: true,
        }
    }

    #[test]
    fn inside_the_sphere_has_no_pressure() {
        let probe = probe_at(Vec3::new(WORLD_RADIUS - 1.0, 0.0, 0.0), Vec3::X);
        for mode in [BoundaryMode::Seek, BoundaryMode::WrapAround] {
            let action = handle_boundary(&probe, WORLD_RADIUS, mode);
            assert_eq!(action, BoundaryAction::Inside);
            assert_eq!(action.steering(), Vec3::ZERO);
        }
    }

    #[test]
    fn seek_steers_laterally_when_outside() {
        let position = Vec3::new(WORLD_RADIUS + 5.0, 0.0, 0.0);
        let forward = Vec3::new(1.0, 0.0, 1.0).normalize_or_zero();
        let probe = probe_at(position, forward);

        let steering = handle_boundary(&probe, WORLD_RADIUS, BoundaryMode::Seek).steering();
        assert!(steering.length() > 0.1);
        assert!(steering.dot(forward).abs() < 1.0e-4);
        // turns the agent toward the interior
        assert!(steering.x < 0.0);
    }

    #[test]
    fn seek_turns_an_agent_heading_straight_out() {
        let probe = probe_at(Vec3::new(0.0, 0.0, WORLD_RADIUS + 5.0), Vec3::Z);
        let steering = handle_boundary(&probe, WORLD_RADIUS, BoundaryMode::Seek).steering();
        assert!(steering.length() > 0.1);
        assert!(steering.dot(Vec3::Z).abs() < 1.0e-4);
    }

    #[test]
    fn wrap_moves_to_antipode_without_steering() {
        let probe = probe_at(Vec3::new(30.0, 40.0, 10.0), Vec3::X);
        let action = handle_boundary(&probe, WORLD_RADIUS, BoundaryMode::WrapAround);
        let landing = action.relocation().unwrap();

        assert_eq!(action.steering(), Vec3::ZERO);
        assert!(landing.length() < WORLD_RADIUS);
        assert!(landing.length() > WORLD_RADIUS * 0.99);
        let direction = landing.normalize_or_zero();
        let original = probe.position.normalize_or_zero();
        assert!((direction + original).length() < 1.0e-5);
    }

    #[test]
    fn planar_wrap_keeps_height() {
        let mut probe = probe_at(Vec3::new(60.0, 4.0, 0.0), Vec3::X);
        probe.moves_vertically = false;
        let landing = handle_boundary(&probe, WORLD_RADIUS, BoundaryMode::WrapAround)
            .relocation()
            .unwrap();
        assert_eq!(landing.y, 4.0);
        assert!(landing.x < 0.0);
        assert!(landing.length() < WORLD_RADIUS);
    }

    #[test]
    fn planar_wrap_above_the_sphere_lands_on_the_axis() {
        let mut probe = probe_at(Vec3::new(10.0, WORLD_RADIUS + 10.0, 5.0), Vec3::X);
        probe.moves_vertically = false;
        let landing = handle_boundary(&probe, WORLD_RADIUS, BoundaryMode::WrapAround)
            .relocation()
            .unwrap();

        assert_eq!(landing.y, WORLD_RADIUS + 10.0);
        assert_eq!(landing.horizontal().length(), 0.0);
        // still outside, so the next tick wraps it again
        probe.position = landing;
        let again = handle_boundary(&probe, WORLD_RADIUS, BoundaryMode::WrapAround);
        assert_eq!(again.relocation(), Some(landing));
    }

    #[test]
    fn mode_codes_round_trip_through_toggle() {
        assert_eq!(BoundaryMode::from_u32(1), BoundaryMode::WrapAround);
        assert_eq!(BoundaryMode::from_u32(7), BoundaryMode::Seek);
        assert_eq!(BoundaryMode::Seek.next().as_u32(), 1);
        assert_eq!(BoundaryMode::WrapAround.next(), BoundaryMode::Seek);
    }
}
