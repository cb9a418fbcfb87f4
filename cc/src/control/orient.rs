//! Orient the robot to face along a heading, turning the shorter way

use std::f64::consts::{FRAC_PI_2, PI};

use parking_lot::Mutex;

use super::DrivePolicy;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};
use crate::robot::{DiffDrive, RobotState, mod2pi};

const SPEED_THRESH_RANGE_RAD: f64 = FRAC_PI_2;
const MAX_SPEED: f64 = 0.60;
const MIN_SPEED: f64 = 0.45;
const MIN_SIM_SPEED: f64 = 0.0;
const DONE_THRESH_RAD: f64 = 3.0 * PI / 180.0;

/// Turn in place toward `goal_yaw`
pub struct Orient {
    goal_yaw: f64,
    sim: bool,
    last_speed: Mutex<f64>,
}

impl Orient {
    pub fn new(goal_yaw: f64, sim: bool) -> Self {
        Self {
            goal_yaw,
            sim,
            last_speed: Mutex::new(0.0),
        }
    }

    pub fn from_params(params: &Parameters, sim_default: bool) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        Ok(Self::new(params.f64("yaw")?, params.bool_or("sim", sim_default)))
    }

    pub fn goal_yaw(&self) -> f64 {
        self.goal_yaw
    }
}

impl DrivePolicy for Orient {
    fn name(&self) -> &'static str {
        "ORIENT"
    }

    fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("yaw", ValueType::Double)
                .range(-PI, PI)
                .describe("Goal heading in radians"),
            TypedParameter::optional("sim", ValueType::Bool).describe("Allow turn speeds below the motor deadband"),
        ]
    }

    fn command(&self, state: &RobotState) -> DiffDrive {
        let Some(pose) = state.pose else {
            return DiffDrive::stopped();
        };

        let dyaw = mod2pi(self.goal_yaw - pose.yaw);
        let min_speed = if self.sim { MIN_SIM_SPEED } else { MIN_SPEED };
        let speed = (MAX_SPEED * (dyaw.abs() / SPEED_THRESH_RANGE_RAD)).clamp(min_speed, MAX_SPEED);

        let mut last_speed = self.last_speed.lock();
        let speed = ((speed + *last_speed) / 2.0).min(MAX_SPEED);

        // Positive error turns left
        let mut command = if dyaw > 0.0 {
            DiffDrive::new(-speed, speed)
        } else {
            DiffDrive::new(speed, -speed)
        };

        if dyaw.abs() < DONE_THRESH_RAD {
            command = DiffDrive::stopped();
        }

        *last_speed = command.left.abs();
        command
    }

    fn reset(&self) {
        *self.last_speed.lock() = 0.0;
    }

    fn describe(&self) -> String {
        format!("Orient to heading {:.3}", self.goal_yaw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::Pose;

    fn at_yaw(yaw: f64) -> RobotState {
        RobotState {
            pose: Some(Pose::new(0.0, 0.0, yaw)),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_pose_means_no_motion() {
        let orient = Orient::new(1.0, false);
        assert!(orient.command(&RobotState::default()).is_stopped());
    }

    #[test]
    fn test_turns_left_toward_positive_error() {
        let orient = Orient::new(1.0, false);
        let cmd = orient.command(&at_yaw(0.0));
        assert!(cmd.left < 0.0);
        assert!(cmd.right > 0.0);
    }

    #[test]
    fn test_turns_the_short_way_across_pi() {
        // From 3.0 rad to -3.0 rad is a small left turn through pi
        let orient = Orient::new(-3.0, false);
        let cmd = orient.command(&at_yaw(3.0));
        assert!(cmd.right > cmd.left);
    }

    #[test]
    fn test_speed_is_filtered_and_bounded() {
        let orient = Orient::new(PI - 0.01, false);
        let first = orient.command(&at_yaw(0.0));
        // Ramp from rest: average of MAX and 0
        assert!((first.right - MAX_SPEED / 2.0).abs() < 1e-9);
        for _ in 0..20 {
            let cmd = orient.command(&at_yaw(0.0));
            assert!(cmd.right <= MAX_SPEED + 1e-12);
        }
    }

    #[test]
    fn test_stops_within_threshold() {
        let orient = Orient::new(0.5, false);
        assert!(orient.command(&at_yaw(0.5 - 0.01)).is_stopped());
    }

    #[test]
    fn test_sim_allows_slow_turns() {
        let real = Orient::new(0.1, false);
        let sim = Orient::new(0.1, true);
        let real_cmd = real.command(&at_yaw(0.0));
        let sim_cmd = sim.command(&at_yaw(0.0));
        assert!(sim_cmd.right < real_cmd.right);
    }

    #[test]
    fn test_from_params_requires_yaw() {
        let err = Orient::from_params(&Parameters::new(), false).err().unwrap();
        assert_eq!(err, ParameterError::Missing { name: "yaw".to_string() });

        let orient = Orient::from_params(&Parameters::new().with("yaw", 1.2), true).unwrap();
        assert_eq!(orient.goal_yaw(), 1.2);
    }

    #[test]
    fn test_reset_clears_filter() {
        let orient = Orient::new(PI - 0.01, false);
        orient.command(&at_yaw(0.0));
        orient.command(&at_yaw(0.0));
        orient.reset();
        let cmd = orient.command(&at_yaw(0.0));
        assert!((cmd.right - MAX_SPEED / 2.0).abs() < 1e-9);
    }
}
