//! Kinematic robot simulator
//!
//! Integrates the most recent drive command into a planar pose and derives
//! wall ranges from a straight corridor running along the x axis, centered on
//! y = 0. Good enough to close the loop for control laws and condition tests
//! without hardware.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::{DiffDrive, Pose, RobotConfig, RobotIo, RobotState, mod2pi};

/// Differential drive simulator
pub struct Simulator {
    io: RobotIo,
    config: RobotConfig,
    pose: Pose,
    command: DiffDrive,
}

impl Simulator {
    pub fn new(io: RobotIo, config: RobotConfig, start: Pose) -> Self {
        debug!(?start, "Simulator::new: called");
        let sim = Self {
            io,
            config,
            pose: start,
            command: DiffDrive::stopped(),
        };
        sim.io.update_state(sim.state());
        sim
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Apply a drive command until the next one arrives
    pub fn set_command(&mut self, command: DiffDrive) {
        self.command = if command.enabled { command } else { DiffDrive::stopped() };
    }

    /// Advance the simulation by `dt` seconds and publish the new state
    pub fn step(&mut self, dt: f64) -> RobotState {
        let left = self.command.left.clamp(-1.0, 1.0) * self.config.max_wheel_speed;
        let right = self.command.right.clamp(-1.0, 1.0) * self.config.max_wheel_speed;

        let v = (left + right) / 2.0;
        let w = (right - left) / self.config.wheelbase;

        self.pose.x += v * self.pose.yaw.cos() * dt;
        self.pose.y += v * self.pose.yaw.sin() * dt;
        self.pose.yaw = mod2pi(self.pose.yaw + w * dt);

        let state = self.state();
        self.io.update_state(state.clone());
        state
    }

    fn state(&self) -> RobotState {
        let half = self.config.corridor_width / 2.0;
        RobotState {
            pose: Some(self.pose),
            left_range: Some((half - self.pose.y).max(0.0)),
            right_range: Some((half + self.pose.y).max(0.0)),
        }
    }

    /// Run the simulator until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        let period = self.config.drive_period();
        let dt = period.as_secs_f64();
        let mut drive_rx = self.io.subscribe_drive();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(hz = self.config.drive_hz, "Simulator started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    loop {
                        match drive_rx.try_recv() {
                            Ok(command) => self.set_command(command),
                            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                                warn!(missed = n, "Simulator: lagged behind drive bus");
                            }
                            Err(_) => break,
                        }
                    }
                    self.step(dt);
                }
                _ = shutdown_rx.recv() => {
                    info!("Simulator shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sim() -> Simulator {
        Simulator::new(RobotIo::default(), RobotConfig::default(), Pose::default())
    }

    #[test]
    fn test_initial_state_is_published() {
        let io = RobotIo::default();
        let _sim = Simulator::new(io.clone(), RobotConfig::default(), Pose::new(0.0, 0.5, 0.0));
        let state = io.latest();
        assert_eq!(state.pose, Some(Pose::new(0.0, 0.5, 0.0)));
        assert_eq!(state.left_range, Some(0.5));
        assert_eq!(state.right_range, Some(1.5));
    }

    #[test]
    fn test_straight_drive() {
        let mut sim = sim();
        sim.set_command(DiffDrive::new(1.0, 1.0));
        for _ in 0..10 {
            sim.step(0.1);
        }
        let pose = sim.pose();
        assert!((pose.x - 0.5).abs() < 1e-9);
        assert!(pose.y.abs() < 1e-9);
        assert!(pose.yaw.abs() < 1e-9);
    }

    #[test]
    fn test_turn_in_place_left() {
        let mut sim = sim();
        sim.set_command(DiffDrive::new(-0.5, 0.5));
        sim.step(0.1);
        let pose = sim.pose();
        assert!(pose.yaw > 0.0);
        assert!(pose.x.abs() < 1e-9);
    }

    #[test]
    fn test_disabled_command_stops() {
        let mut sim = sim();
        sim.set_command(DiffDrive {
            left: 1.0,
            right: 1.0,
            enabled: false,
        });
        sim.step(1.0);
        assert_eq!(sim.pose(), Pose::default());
    }

    #[test]
    fn test_yaw_stays_wrapped() {
        let mut sim = sim();
        sim.set_command(DiffDrive::new(-1.0, 1.0));
        for _ in 0..100 {
            sim.step(0.1);
            assert!(sim.pose().yaw >= -PI && sim.pose().yaw < PI);
        }
    }
}
