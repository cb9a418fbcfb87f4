//! Robot and simulator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Robot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Rate at which running control laws emit drive commands
    #[serde(rename = "drive-hz", default = "default_drive_hz")]
    pub drive_hz: u32,

    /// Running against the simulator (relaxes minimum turn speeds)
    #[serde(default)]
    pub sim: bool,

    /// Distance between the wheels in meters
    #[serde(default = "default_wheelbase")]
    pub wheelbase: f64,

    /// Ground speed of a wheel commanded at 1.0, in m/s
    #[serde(rename = "max-wheel-speed", default = "default_max_wheel_speed")]
    pub max_wheel_speed: f64,

    /// Width of the simulated corridor the robot drives in, in meters
    #[serde(rename = "corridor-width", default = "default_corridor_width")]
    pub corridor_width: f64,

    /// Capacity of the drive command bus
    #[serde(rename = "drive-buffer", default = "default_drive_buffer")]
    pub drive_buffer: usize,
}

fn default_drive_hz() -> u32 {
    20
}

fn default_wheelbase() -> f64 {
    0.4
}

fn default_max_wheel_speed() -> f64 {
    0.5
}

fn default_corridor_width() -> f64 {
    2.0
}

fn default_drive_buffer() -> usize {
    64
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            drive_hz: default_drive_hz(),
            sim: false,
            wheelbase: default_wheelbase(),
            max_wheel_speed: default_max_wheel_speed(),
            corridor_width: default_corridor_width(),
            drive_buffer: default_drive_buffer(),
        }
    }
}

impl RobotConfig {
    /// Period between drive commands
    pub fn drive_period(&self) -> Duration {
        debug!(drive_hz = %self.drive_hz, "RobotConfig::drive_period: called");
        Duration::from_secs_f64(1.0 / f64::from(self.drive_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RobotConfig::default();
        assert_eq!(config.drive_hz, 20);
        assert!(!config.sim);
        assert_eq!(config.corridor_width, 2.0);
    }

    #[test]
    fn test_drive_period() {
        let config = RobotConfig {
            drive_hz: 50,
            ..Default::default()
        };
        assert_eq!(config.drive_period(), Duration::from_millis(20));
    }

    #[test]
    fn test_partial_yaml() {
        let config: RobotConfig = serde_yaml::from_str("sim: true\ncorridor-width: 3.5\n").unwrap();
        assert!(config.sim);
        assert_eq!(config.corridor_width, 3.5);
        assert_eq!(config.drive_hz, 20);
    }
}
