//! Constant-speed straight driving

use super::DrivePolicy;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};
use crate::robot::{DiffDrive, RobotState};

/// Drive straight at a fixed wheel speed
pub struct Forward {
    speed: f64,
}

impl Forward {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }

    pub fn from_params(params: &Parameters) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        Ok(Self::new(params.f64("speed")?))
    }
}

impl DrivePolicy for Forward {
    fn name(&self) -> &'static str {
        "DRIVE"
    }

    fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("speed", ValueType::Double)
                .range(-1.0, 1.0)
                .describe("Wheel speed; negative reverses"),
        ]
    }

    fn command(&self, _state: &RobotState) -> DiffDrive {
        DiffDrive::new(self.speed, self.speed)
    }

    fn describe(&self) -> String {
        format!("Drive at {:.2}", self.speed)
    }
}
