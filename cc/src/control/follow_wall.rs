//! Follow a wall at a fixed distance

use super::DrivePolicy;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};
use crate::robot::{DiffDrive, RobotState, Side};

const DEFAULT_SPEED: f64 = 0.4;
const GAIN: f64 = 0.8;

/// Drive forward while holding `distance` from the wall on `side`
pub struct FollowWall {
    side: Side,
    distance: f64,
    speed: f64,
}

impl FollowWall {
    pub fn new(side: Side, distance: f64, speed: f64) -> Self {
        Self { side, distance, speed }
    }

    pub fn from_params(params: &Parameters) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        let side_name = params.string("side")?;
        let side = Side::parse(side_name).ok_or_else(|| ParameterError::Invalid {
            name: "side".to_string(),
            reason: format!("'{}' is not left or right", side_name),
        })?;
        Ok(Self::new(side, params.f64("distance")?, params.f64_or("speed", DEFAULT_SPEED)))
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl DrivePolicy for FollowWall {
    fn name(&self) -> &'static str {
        "FOLLOW_WALL"
    }

    fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("side", ValueType::String).describe("Wall side: left or right"),
            TypedParameter::required("distance", ValueType::Double)
                .range(0.1, 5.0)
                .describe("Distance to hold from the wall, meters"),
            TypedParameter::optional("speed", ValueType::Double)
                .range(0.0, 1.0)
                .describe("Forward wheel speed"),
        ]
    }

    fn command(&self, state: &RobotState) -> DiffDrive {
        let Some(range) = self.side.range(state) else {
            return DiffDrive::new(self.speed, self.speed);
        };

        // Positive error: too far from the wall, steer toward it
        let error = range - self.distance;
        let turn = (GAIN * error).clamp(-self.speed, self.speed);

        match self.side {
            Side::Left => DiffDrive::new(self.speed - turn, self.speed + turn),
            Side::Right => DiffDrive::new(self.speed + turn, self.speed - turn),
        }
    }

    fn describe(&self) -> String {
        format!("Follow {:?} wall at {:.2}m", self.side, self.distance).to_lowercase()
    }
}
