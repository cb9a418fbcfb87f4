//! True after a fixed time has passed since construction

use std::time::{Duration, Instant};

use super::ConditionTest;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};

pub struct Elapsed {
    started: Instant,
    duration: Duration,
}

impl Elapsed {
    pub fn new(duration: Duration) -> Self {
        Self {
            started: Instant::now(),
            duration,
        }
    }

    pub fn from_params(params: &Parameters) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        Ok(Self::new(Duration::from_secs_f64(params.f64("seconds")?)))
    }

    pub fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("seconds", ValueType::Double)
                .range(0.0, 86_400.0)
                .describe("Time until the condition is met"),
        ]
    }
}

impl ConditionTest for Elapsed {
    fn name(&self) -> &str {
        "ELAPSED"
    }

    fn condition_met(&self) -> bool {
        self.started.elapsed() >= self.duration
    }

    fn parameters(&self) -> Vec<TypedParameter> {
        Self::schema()
    }

    fn describe(&self) -> String {
        format!("Elapsed {:?}", self.duration)
    }
}
