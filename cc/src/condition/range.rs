//! True when an obstacle is closer than a threshold

use super::ConditionTest;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};
use crate::robot::{RobotIo, Side};

pub struct RangeBelow {
    side: Side,
    distance: f64,
    io: RobotIo,
}

impl RangeBelow {
    pub fn new(side: Side, distance: f64, io: RobotIo) -> Self {
        Self { side, distance, io }
    }

    pub fn from_params(params: &Parameters, io: RobotIo) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        let side_name = params.string("side")?;
        let side = Side::parse(side_name).ok_or_else(|| ParameterError::Invalid {
            name: "side".to_string(),
            reason: format!("'{}' is not left or right", side_name),
        })?;
        Ok(Self::new(side, params.f64("distance")?, io))
    }

    pub fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("side", ValueType::String).describe("Sensor side: left or right"),
            TypedParameter::required("distance", ValueType::Double)
                .at_least(0.0)
                .describe("Threshold in meters"),
        ]
    }
}

impl ConditionTest for RangeBelow {
    fn name(&self) -> &str {
        "RANGE_BELOW"
    }

    fn condition_met(&self) -> bool {
        self.side.range(&self.io.latest()).is_some_and(|r| r < self.distance)
    }

    fn parameters(&self) -> Vec<TypedParameter> {
        Self::schema()
    }
}
