use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FlockError, Result};
use crate::flocking::{Behavior, BehaviorParams, FlockingParams};
use crate::math::cosine_to_angle;
use crate::vehicle::VehicleParams;

/// One rule as seen at the configuration boundary, angle in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub radius: f32,
    pub angle_degrees: f32,
    pub weight: f32,
}

impl BehaviorConfig {
    fn validate(&self, behavior: Behavior) -> Result<BehaviorParams> {
        if !self.angle_degrees.is_finite() || !(0.0..=180.0).contains(&self.angle_degrees) {
            return Err(FlockError::InvalidAngle {
                behavior,
                degrees: self.angle_degrees,
            });
        }

        let params = BehaviorParams::from_degrees(self.radius, self.angle_degrees, self.weight);
        params.validate(behavior)?;
        Ok(params)
    }

    fn from_params(params: &BehaviorParams) -> Self {
        Self {
            radius: params.radius,
            angle_degrees: cosine_to_angle(params.cos_max_angle),
            weight: params.weight,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoidConfig {
    pub separation: BehaviorConfig,
    pub alignment: BehaviorConfig,
    pub cohesion: BehaviorConfig,
    pub world_radius: f32,
    pub min_time_to_collision: f32,
    pub moves_vertically: bool,
    pub mass: f32,
    pub max_force: f32,
    pub max_speed: f32,
}

impl Default for BoidConfig {
    fn default() -> Self {
        Self {
            separation: BehaviorConfig {
                radius: 5.0,
                angle_degrees: 135.0,
                weight: 12.0,
            },
            alignment: BehaviorConfig {
                radius: 7.5,
                angle_degrees: 45.6,
                weight: 8.0,
            },
            cohesion: BehaviorConfig {
                radius: 9.0,
                angle_degrees: 98.6,
                weight: 8.0,
            },
            world_radius: 50.0,
            min_time_to_collision: 2.0,
            moves_vertically: true,
            mass: 1.0,
            max_force: 27.0,
            max_speed: 9.0,
        }
    }
}

impl BoidConfig {
    /// Fields left out, at any depth, keep their default. A rule object
    /// naming only `radius` keeps that rule's default angle and weight.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check every field and convert angles to cosines.
    pub fn validate(&self) -> Result<(VehicleParams, FlockingParams)> {
        let vehicle = VehicleParams {
            mass: self.mass,
            max_force: self.max_force,
            max_speed: self.max_speed,
            moves_vertically: self.moves_vertically,
        };
        vehicle.validate()?;

        let flocking = FlockingParams {
            separation: self.separation.validate(Behavior::Separation)?,
            alignment: self.alignment.validate(Behavior::Alignment)?,
            cohesion: self.cohesion.validate(Behavior::Cohesion)?,
            world_radius: self.world_radius,
            min_time_to_collision: self.min_time_to_collision,
        };
        flocking.validate()?;

        Ok((vehicle, flocking))
    }

    /// Report runtime parameters back in configuration units.
    pub fn from_params(vehicle: &VehicleParams, flocking: &FlockingParams) -> Self {
        Self {
            separation: BehaviorConfig::from_params(&flocking.separation),
            alignment: BehaviorConfig::from_params(&flocking.alignment),
            cohesion: BehaviorConfig::from_params(&flocking.cohesion),
            world_radius: flocking.world_radius,
            min_time_to_collision: flocking.min_time_to_collision,
            moves_vertically: vehicle.moves_vertically,
            mass: vehicle.mass,
            max_force: vehicle.max_force,
            max_speed: vehicle.max_speed,
        }
    }
}

fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::BoidConfig;
    use crate::error::FlockError;
    use crate::flocking::Behavior;

    #[test]
    fn defaults_are_valid_and_match_classic_cosines() {
        let (vehicle, flocking) = BoidConfig::default().validate().unwrap();
        assert_eq!(vehicle.max_speed, 9.0);
        assert!((flocking.separation.cos_max_angle + 0.707).abs() < 1.0e-3);
        assert!((flocking.alignment.cos_max_angle - 0.7).abs() < 1.0e-3);
        assert!((flocking.cohesion.cos_max_angle + 0.15).abs() < 1.0e-3);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = BoidConfig::from_json(
            r#"{ "world_radius": 120.0, "moves_vertically": false,
                 "cohesion": { "radius": 15.0, "angle_degrees": 180.0, "weight": 2.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.world_radius, 120.0);
        assert!(!config.moves_vertically);
        assert_eq!(config.cohesion.radius, 15.0);
        assert_eq!(config.separation, BoidConfig::default().separation);
    }

    #[test]
    fn partial_rule_keeps_that_rules_defaults() {
        let config = BoidConfig::from_json(r#"{ "cohesion": { "radius": 15.0 } }"#).unwrap();
        let defaults = BoidConfig::default();

        assert_eq!(config.cohesion.radius, 15.0);
        assert_eq!(config.cohesion.angle_degrees, defaults.cohesion.angle_degrees);
        assert_eq!(config.cohesion.weight, defaults.cohesion.weight);
        assert_eq!(config.alignment, defaults.alignment);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_object_is_the_default_config() {
        assert_eq!(BoidConfig::from_json("{}").unwrap(), BoidConfig::default());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = BoidConfig::from_json("{ \"mass\": \"heavy\" }").unwrap_err();
        assert!(matches!(err, FlockError::ConfigError(_)));
        let err = BoidConfig::from_json(r#"{ "separation": 3 }"#).unwrap_err();
        assert!(matches!(err, FlockError::ConfigError(_)));
        assert!(BoidConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = BoidConfig::default();
        config.separation.angle_degrees = 200.0;
        match config.validate() {
            Err(FlockError::InvalidAngle { behavior, .. }) => {
                assert_eq!(behavior, Behavior::Separation)
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut config = BoidConfig::default();
        config.cohesion.radius = -2.0;
        assert!(matches!(
            config.validate(),
            Err(FlockError::InvalidRadius { .. })
        ));

        let mut config = BoidConfig::default();
        config.mass = -1.0;
        assert!(matches!(config.validate(), Err(FlockError::InvalidMass(_))));

        let mut config = BoidConfig::default();
        config.min_time_to_collision = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(FlockError::InvalidTimeToCollision(_))
        ));
    }

    #[test]
    fn params_report_back_in_degrees() {
        let original = BoidConfig::default();
        let (vehicle, flocking) = original.validate().unwrap();
        let reported = BoidConfig::from_params(&vehicle, &flocking);
        assert!((reported.alignment.angle_degrees - 45.6).abs() < 1.0e-3);
        assert_eq!(reported.world_radius, original.world_radius);
        assert_eq!(reported.mass, original.mass);
    }
}
