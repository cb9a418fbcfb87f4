//! True once the robot faces a heading

use std::f64::consts::PI;

use super::ConditionTest;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};
use crate::robot::{RobotIo, mod2pi};

const DEFAULT_TOLERANCE: f64 = 3.0 * PI / 180.0;

pub struct HeadingReached {
    goal_yaw: f64,
    tolerance: f64,
    io: RobotIo,
}

impl HeadingReached {
    pub fn new(goal_yaw: f64, tolerance: f64, io: RobotIo) -> Self {
        Self {
            goal_yaw,
            tolerance,
            io,
        }
    }

    pub fn from_params(params: &Parameters, io: RobotIo) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        Ok(Self::new(
            params.f64("yaw")?,
            params.f64_or("tolerance", DEFAULT_TOLERANCE),
            io,
        ))
    }

    pub fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("yaw", ValueType::Double)
                .range(-PI, PI)
                .describe("Target heading in radians"),
            TypedParameter::optional("tolerance", ValueType::Double)
                .range(0.0, PI)
                .describe("Allowed heading error in radians"),
        ]
    }
}

impl ConditionTest for HeadingReached {
    fn name(&self) -> &str {
        "HEADING_REACHED"
    }

    fn condition_met(&self) -> bool {
        self.io
            .latest()
            .pose
            .is_some_and(|pose| mod2pi(self.goal_yaw - pose.yaw).abs() <= self.tolerance)
    }

    fn parameters(&self) -> Vec<TypedParameter> {
        Self::schema()
    }

    fn describe(&self) -> String {
        format!("Heading within {:.3} of {:.3}", self.tolerance, self.goal_yaw)
    }
}
