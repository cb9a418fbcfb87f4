//! Robot state and actuation plumbing
//!
//! Control laws read the latest [`RobotState`] and emit [`DiffDrive`]
//! commands; both travel through a [`RobotIo`] handle. What feeds the state
//! (a real driver or the [`sim::Simulator`]) is not the laws' concern.

mod config;
pub mod sim;

use std::f64::consts::PI;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

pub use config::RobotConfig;

/// Planar robot pose
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }
}

/// Latest sensor picture of the robot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub pose: Option<Pose>,
    /// Distance to the nearest obstacle on the left, in meters
    pub left_range: Option<f64>,
    /// Distance to the nearest obstacle on the right, in meters
    pub right_range: Option<f64>,
}

/// Differential drive command, wheel speeds normalized to [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffDrive {
    pub left: f64,
    pub right: f64,
    pub enabled: bool,
}

impl DiffDrive {
    pub fn new(left: f64, right: f64) -> Self {
        Self {
            left,
            right,
            enabled: true,
        }
    }

    /// Enabled command with both wheels at rest
    pub fn stopped() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn is_stopped(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Which side of the robot a sensor or wall is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn range(self, state: &RobotState) -> Option<f64> {
        match self {
            Self::Left => state.left_range,
            Self::Right => state.right_range,
        }
    }
}

/// Wrap an angle into [-π, π)
pub fn mod2pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped.is_nan() { 0.0 } else { wrapped }
}

/// Shared handle to the robot's state feed and drive bus
#[derive(Clone)]
pub struct RobotIo {
    state_tx: Arc<watch::Sender<RobotState>>,
    drive_tx: broadcast::Sender<DiffDrive>,
}

impl RobotIo {
    pub fn new(drive_buffer: usize) -> Self {
        debug!(drive_buffer, "RobotIo::new: called");
        let (state_tx, _) = watch::channel(RobotState::default());
        let (drive_tx, _) = broadcast::channel(drive_buffer.max(1));
        Self {
            state_tx: Arc::new(state_tx),
            drive_tx,
        }
    }

    /// Latest published state
    pub fn latest(&self) -> RobotState {
        self.state_tx.borrow().clone()
    }

    /// Receiver notified on every state update
    pub fn state(&self) -> watch::Receiver<RobotState> {
        self.state_tx.subscribe()
    }

    /// Publish a new state, replacing the previous one
    pub fn update_state(&self, state: RobotState) {
        self.state_tx.send_replace(state);
    }

    /// Emit a drive command; dropped when nobody is listening
    pub fn send_drive(&self, command: DiffDrive) {
        let _ = self.drive_tx.send(command);
    }

    pub fn subscribe_drive(&self) -> broadcast::Receiver<DiffDrive> {
        self.drive_tx.subscribe()
    }
}

impl Default for RobotIo {
    fn default() -> Self {
        Self::new(64)
    }
}
