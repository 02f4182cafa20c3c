use thiserror::Error;

use crate::flocking::Behavior;

#[derive(Error, Debug)]
pub enum FlockError {
    #[error("mass must be finite and positive, got {0}")]
    InvalidMass(f32),

    #[error("max speed must be finite and positive, got {0}")]
    InvalidMaxSpeed(f32),

    #[error("max force must be finite and non-negative, got {0}")]
    InvalidMaxForce(f32),

    #[error("{behavior} radius must be finite and non-negative, got {radius}")]
    InvalidRadius { behavior: Behavior, radius: f32 },

    #[error("{behavior} view angle must lie in [0, 180] degrees, got {degrees}")]
    InvalidAngle { behavior: Behavior, degrees: f32 },

    #[error("{behavior} view cosine must lie in [-1, 1], got {cosine}")]
    InvalidCosine { behavior: Behavior, cosine: f32 },

    #[error("{behavior} weight must be finite, got {weight}")]
    InvalidWeight { behavior: Behavior, weight: f32 },

    #[error("world radius must be finite and positive, got {0}")]
    InvalidWorldRadius(f32),

    #[error("min time to collision must be finite and non-negative, got {0}")]
    InvalidTimeToCollision(f32),

    #[error("elapsed time must be finite and non-negative, got {0}")]
    InvalidTimeStep(f32),

    #[error("scatter distance must be finite and non-negative, got {0}")]
    InvalidScatterDistance(f32),

    #[error("orientation basis is not orthonormal")]
    DegenerateOrientation,

    #[error("position must be finite")]
    NonFinitePosition,

    #[error("Config error: {0}")]
    ConfigError(#[from] serde_json::Error),

    #[error("Entropy source unavailable: {0}")]
    EntropyError(String),
}

pub type Result<T> = std::result::Result<T, FlockError>;
