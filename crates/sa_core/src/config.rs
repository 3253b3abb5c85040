//! Battle configuration.
//!
//! [`BattleConfig`] holds everything that is not part of the fleets: the
//! tick length, the timeout, the spatial-grid resolution, the damage ramp,
//! and the [`Tuning`] constants for reverse-engineered game mechanics. The
//! tuning values are approximations; keep them configurable rather than
//! baking them into the engine.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::units::{Time, UnitExt};

/// Approximated game-mechanic constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// A ship is destroyed once fewer than this fraction of its modules live.
    pub critical_damage_fraction: f64,
    /// Length of one energy duty cycle.
    pub energy_cycle: Time,
    /// How long a movement action lasts before it is re-rolled.
    pub movement_interval: Time,
    /// Fraction of linear velocity kept after one second.
    pub movement_damping: f64,
    /// Fraction of angular velocity kept after one second.
    pub rotation_damping: f64,
    /// Acceleration multiplier when no module contributes thrust or turning.
    pub idle_acceleration: f64,
    /// Upper bound of the random warp-progress setback after a jump.
    pub warp_jitter: f64,
    /// Sub-cell step of the hit-detection ray march, in cells.
    pub ray_step: f64,
    /// Ships do not retreat once the enemy flagship is further than this
    /// fraction of their longest weapon range.
    pub retreat_range_factor: f64,
    /// Ships always advance once the enemy flagship is further than this
    /// fraction of their longest weapon range.
    pub advance_range_factor: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            critical_damage_fraction: 0.3,
            energy_cycle: 5.seconds(),
            movement_interval: 2.seconds(),
            movement_damping: 0.75,
            rotation_damping: 0.1,
            idle_acceleration: 0.25,
            warp_jitter: 0.1,
            ray_step: 0.8,
            retreat_range_factor: 0.8,
            advance_range_factor: 1.2,
        }
    }
}

/// Parameters of one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Simulated time per tick.
    pub time_step: Time,
    /// Simulated time after which the battle is a draw.
    pub timeout: Time,
    /// Chunks per side of the spatial grids.
    pub grid_resolution: usize,
    /// Elapsed time before projectile damage starts ramping up.
    pub damage_ramp_start: Time,
    /// Damage multiplier growth per second once the ramp has started.
    pub damage_ramp_per_second: f64,
    /// Approximated game-mechanic constants.
    pub tuning: Tuning,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            time_step: (1.0 / 30.0).seconds(),
            timeout: 180.seconds(),
            grid_resolution: 16,
            damage_ramp_start: 60.seconds(),
            damage_ramp_per_second: 0.01,
            tuning: Tuning::default(),
        }
    }
}

impl BattleConfig {
    /// Set the tick length.
    pub fn with_time_step(mut self, time_step: Time) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Time) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the spatial grid resolution.
    pub fn with_grid_resolution(mut self, resolution: usize) -> Self {
        self.grid_resolution = resolution;
        self
    }

    /// Set the damage ramp.
    pub fn with_damage_ramp(mut self, start: Time, per_second: f64) -> Self {
        self.damage_ramp_start = start;
        self.damage_ramp_per_second = per_second;
        self
    }

    /// Disable the damage ramp.
    pub fn without_damage_ramp(self) -> Self {
        self.with_damage_ramp(Time::ZERO, 0.0)
    }

    /// Replace the tuning constants.
    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Global projectile damage multiplier after `elapsed` simulated time.
    #[must_use]
    pub fn damage_scaling(&self, elapsed: Time) -> f64 {
        if elapsed > self.damage_ramp_start {
            1.0 + (elapsed - self.damage_ramp_start).as_seconds() * self.damage_ramp_per_second
        } else {
            1.0
        }
    }

    /// Reject values that cannot drive a simulation.
    pub fn validate(&self) -> Result<()> {
        let step = self.time_step.as_seconds();
        if !is_positive(step) {
            return Err(SimError::InvalidConfig(format!(
                "time step must be positive, got {step}"
            )));
        }
        if !is_positive(self.timeout.as_seconds()) {
            return Err(SimError::InvalidConfig(format!(
                "timeout must be positive, got {}",
                self.timeout.as_seconds()
            )));
        }
        if self.grid_resolution == 0 {
            return Err(SimError::InvalidConfig(
                "grid resolution must be at least 1".to_string(),
            ));
        }
        if self.damage_ramp_per_second < 0.0 {
            return Err(SimError::InvalidConfig(
                "damage ramp cannot be negative".to_string(),
            ));
        }
        let tuning = &self.tuning;
        if !is_positive(tuning.ray_step) {
            return Err(SimError::InvalidConfig(format!(
                "ray step must be positive, got {}",
                tuning.ray_step
            )));
        }
        if !is_positive(tuning.energy_cycle.as_seconds())
            || !is_positive(tuning.movement_interval.as_seconds())
        {
            return Err(SimError::InvalidConfig(
                "energy cycle and movement interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = BattleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_resolution, 16);
        assert_eq!(config.tuning.critical_damage_fraction, 0.3);
    }

    #[test]
    fn test_rejects_zero_time_step() {
        let config = BattleConfig::default().with_time_step(Time::ZERO);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_grid() {
        let config = BattleConfig::default().with_grid_resolution(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_damage_scaling_ramp() {
        let config = BattleConfig::default().with_damage_ramp(10.seconds(), 0.1);
        assert_eq!(config.damage_scaling(5.seconds()), 1.0);
        assert!((config.damage_scaling(20.seconds()) - 2.0).abs() < 1e-12);
        let flat = BattleConfig::default().without_damage_ramp();
        assert_eq!(flat.damage_scaling(500.seconds()), 1.0);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: BattleConfig = ron::from_str("(timeout: 60.0, tuning: (ray_step: 0.5))").unwrap();
        assert_eq!(config.timeout, 60.seconds());
        assert_eq!(config.tuning.ray_step, 0.5);
        assert_eq!(config.tuning.movement_damping, 0.75);
        assert_eq!(config.grid_resolution, 16);
    }
}
