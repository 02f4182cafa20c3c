use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryAction;
use crate::flocking::FlockForces;

/// Per-agent breakdown of one tick's steering, emitted after the read phase.
/// Hosts that want debug lines draw them from these.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SteeringEvent {
    pub id: usize,
    pub forces: FlockForces,
    pub boundary: BoundaryAction,
}

pub trait SteeringObserver {
    fn on_steering(&mut self, event: &SteeringEvent);
}

impl SteeringObserver for () {
    fn on_steering(&mut self, _event: &SteeringEvent) {}
}

impl SteeringObserver for Vec<SteeringEvent> {
    fn on_steering(&mut self, event: &SteeringEvent) {
        self.push(*event);
    }
}
