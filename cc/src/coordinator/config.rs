//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Evaluator rate in ticks per second
    #[serde(rename = "tick-hz", default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Channel name stamped on every status snapshot
    #[serde(rename = "status-channel", default = "default_status_channel")]
    pub status_channel: String,

    /// Stop a control law before removing it on destroy
    #[serde(rename = "stop-on-destroy", default = "default_stop_on_destroy")]
    pub stop_on_destroy: bool,

    /// Buffer size of the broadcast status channel
    #[serde(rename = "status-buffer", default = "default_status_buffer")]
    pub status_buffer: usize,
}

fn default_tick_hz() -> u32 {
    debug!("default_tick_hz: called");
    30
}

fn default_status_channel() -> String {
    debug!("default_status_channel: called");
    "CONTROL_LAW_STATUS".to_string()
}

fn default_stop_on_destroy() -> bool {
    debug!("default_stop_on_destroy: called");
    true
}

fn default_status_buffer() -> usize {
    debug!("default_status_buffer: called");
    256
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            tick_hz: 30,
            status_channel: "CONTROL_LAW_STATUS".to_string(),
            stop_on_destroy: true,
            status_buffer: 256,
        }
    }
}

impl CoordinatorConfig {
    /// Time between evaluator ticks
    pub fn tick_period(&self) -> Duration {
        debug!(tick_hz = %self.tick_hz, "CoordinatorConfig::tick_period: called");
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.tick_hz, 30);
        assert_eq!(config.status_channel, "CONTROL_LAW_STATUS");
        assert!(config.stop_on_destroy);
        assert_eq!(config.status_buffer, 256);
    }

    #[test]
    fn test_tick_period_duration() {
        let config = CoordinatorConfig {
            tick_hz: 10,
            ..Default::default()
        };
        assert_eq!(config.tick_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let config = CoordinatorConfig {
            tick_hz: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_yaml_defaults_fill_in() {
        let config: CoordinatorConfig = serde_yaml::from_str("stop-on-destroy: false\n").unwrap();
        assert!(!config.stop_on_destroy);
        assert_eq!(config.tick_hz, 30);
    }
}
