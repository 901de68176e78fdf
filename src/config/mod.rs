//! Configuration module - environment variable parsing and validation

use std::env;
use std::str::FromStr;

/// Simulation tuning loaded from environment variables
///
/// Every value has a default, so `Config::default()` is always valid and
/// `from_env` only overrides what the environment sets. Validation is
/// fail-fast: a config that passes [`Config::validate`] never has to be
/// re-checked inside the tick loop.
#[derive(Clone, Debug)]
pub struct Config {
    /// Horizontal speed while walking (units/s)
    pub walk_speed: f32,
    /// Horizontal speed while sprinting (units/s)
    pub sprint_speed: f32,
    /// Upward impulse applied on jump execution
    pub jump_impulse: f32,
    /// Downward impulse applied when a rising avatar hits a ceiling
    pub head_bonk_impulse: f32,
    /// Extra gravity factor while falling (1.0 = no extra)
    pub fall_gravity_multiplier: f32,
    /// Vertical gravity acceleration, negative is down
    pub gravity_y: f32,
    /// Grace window after leaving the ground where a jump still counts (s)
    pub coyote_time: f64,
    /// How long a jump request stays pending before it expires (s)
    pub jump_buffer_time: f64,
    /// Radius of the ground-contact probe sphere
    pub ground_probe_radius: f32,
    /// Length of the upward ceiling probe ray
    pub ceiling_probe_distance: f32,
    /// Foot probe anchor height above the avatar's feet
    pub foot_anchor_offset: f32,
    /// Head probe anchor height above the avatar's feet
    pub head_anchor_offset: f32,
    /// Maximum number of Hunter roles in a session
    pub hunter_capacity: usize,
    /// Simulation ticks per second
    pub simulation_tps: u32,
    /// Snapshot broadcasts per second
    pub snapshot_tps: u32,
    /// Radius of the hunter spawn ring around the arena origin
    pub spawn_radius: f32,
    /// Seed for reproducible spawn placement
    pub session_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            walk_speed: 8.0,
            sprint_speed: 12.0,
            jump_impulse: 12.0,
            head_bonk_impulse: 12.0,
            fall_gravity_multiplier: 2.5,
            gravity_y: -24.0,
            coyote_time: 0.15,
            jump_buffer_time: 0.15,
            ground_probe_radius: 0.4,
            ceiling_probe_distance: 0.2,
            foot_anchor_offset: 0.1,
            head_anchor_offset: 1.7,
            hunter_capacity: 3,
            simulation_tps: 60,
            snapshot_tps: 20,
            spawn_radius: 14.0,
            session_seed: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults; set variables must parse and the
    /// resulting config must validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            walk_speed: parse_var("MH_WALK_SPEED", defaults.walk_speed)?,
            sprint_speed: parse_var("MH_SPRINT_SPEED", defaults.sprint_speed)?,
            jump_impulse: parse_var("MH_JUMP_IMPULSE", defaults.jump_impulse)?,
            head_bonk_impulse: parse_var("MH_HEAD_BONK_IMPULSE", defaults.head_bonk_impulse)?,
            fall_gravity_multiplier: parse_var(
                "MH_FALL_GRAVITY_MULTIPLIER",
                defaults.fall_gravity_multiplier,
            )?,
            gravity_y: parse_var("MH_GRAVITY_Y", defaults.gravity_y)?,
            coyote_time: parse_var("MH_COYOTE_TIME", defaults.coyote_time)?,
            jump_buffer_time: parse_var("MH_JUMP_BUFFER_TIME", defaults.jump_buffer_time)?,
            ground_probe_radius: parse_var("MH_GROUND_PROBE_RADIUS", defaults.ground_probe_radius)?,
            ceiling_probe_distance: parse_var(
                "MH_CEILING_PROBE_DISTANCE",
                defaults.ceiling_probe_distance,
            )?,
            foot_anchor_offset: parse_var("MH_FOOT_ANCHOR_OFFSET", defaults.foot_anchor_offset)?,
            head_anchor_offset: parse_var("MH_HEAD_ANCHOR_OFFSET", defaults.head_anchor_offset)?,
            hunter_capacity: parse_var("MH_HUNTER_CAPACITY", defaults.hunter_capacity)?,
            simulation_tps: parse_var("MH_SIMULATION_TPS", defaults.simulation_tps)?,
            snapshot_tps: parse_var("MH_SNAPSHOT_TPS", defaults.snapshot_tps)?,
            spawn_radius: parse_var("MH_SPAWN_RADIUS", defaults.spawn_radius)?,
            session_seed: parse_var("MH_SESSION_SEED", defaults.session_seed)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every tuning constraint the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("walk_speed", self.walk_speed)?;
        require_positive("sprint_speed", self.sprint_speed)?;
        require_positive("jump_impulse", self.jump_impulse)?;
        require_positive("head_bonk_impulse", self.head_bonk_impulse)?;
        require_positive("ground_probe_radius", self.ground_probe_radius)?;
        require_positive("ceiling_probe_distance", self.ceiling_probe_distance)?;
        require_positive("foot_anchor_offset", self.foot_anchor_offset)?;
        require_positive("spawn_radius", self.spawn_radius)?;

        if !self.fall_gravity_multiplier.is_finite() || self.fall_gravity_multiplier < 1.0 {
            return Err(ConfigError::Constraint(
                "fall_gravity_multiplier must be at least 1.0",
            ));
        }
        if !self.gravity_y.is_finite() || self.gravity_y >= 0.0 {
            return Err(ConfigError::Constraint("gravity_y must be negative"));
        }
        if !self.coyote_time.is_finite() || self.coyote_time < 0.0 {
            return Err(ConfigError::Constraint("coyote_time must not be negative"));
        }
        if !self.jump_buffer_time.is_finite() || self.jump_buffer_time < 0.0 {
            return Err(ConfigError::Constraint(
                "jump_buffer_time must not be negative",
            ));
        }
        if self.head_anchor_offset <= self.foot_anchor_offset {
            return Err(ConfigError::Constraint(
                "head_anchor_offset must sit above foot_anchor_offset",
            ));
        }
        if self.simulation_tps == 0 {
            return Err(ConfigError::Constraint("simulation_tps must be nonzero"));
        }
        if self.snapshot_tps == 0 || self.snapshot_tps > self.simulation_tps {
            return Err(ConfigError::Constraint(
                "snapshot_tps must be nonzero and at most simulation_tps",
            ));
        }

        Ok(())
    }
}

/// Parse an environment variable, falling back to a default when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn require_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {name} has unparseable value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("{0}")]
    Constraint(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_speed() {
        let config = Config {
            walk_speed: 0.0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                name: "walk_speed",
                ..
            })
        ));
    }

    #[test]
    fn rejects_nan_tuning() {
        let config = Config {
            jump_impulse: f32::NAN,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_upward_gravity() {
        let config = Config {
            gravity_y: 9.81,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Constraint(_))));
    }

    #[test]
    fn rejects_weak_fall_multiplier() {
        let config = Config {
            fall_gravity_multiplier: 0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_head_anchor_below_foot_anchor() {
        let config = Config {
            foot_anchor_offset: 1.8,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_snapshot_rate_above_simulation_rate() {
        let config = Config {
            simulation_tps: 30,
            snapshot_tps: 60,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
