//! Externally triggered condition

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::ConditionTest;
use crate::domain::{ParameterError, Parameters, TypedParameter, ValueType};

/// A condition set from outside, e.g. by a perception pipeline that has
/// classified a door in view
pub struct Flag {
    label: String,
    state: Arc<AtomicBool>,
}

/// Cloneable switch for a [`Flag`]
#[derive(Clone)]
pub struct FlagHandle {
    label: String,
    state: Arc<AtomicBool>,
}

impl Flag {
    pub fn new(label: &str, initial: bool) -> Self {
        Self {
            label: label.to_string(),
            state: Arc::new(AtomicBool::new(initial)),
        }
    }

    pub fn from_params(params: &Parameters) -> Result<Self, ParameterError> {
        params.validate(&Self::schema())?;
        let label = params.get("label").and_then(|v| v.as_str()).unwrap_or("FLAG");
        Ok(Self::new(label, params.bool_or("initial", false)))
    }

    pub fn schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::optional("label", ValueType::String).describe("Name reported for this test"),
            TypedParameter::optional("initial", ValueType::Bool).describe("Initial flag value"),
        ]
    }

    pub fn handle(&self) -> FlagHandle {
        FlagHandle {
            label: self.label.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl FlagHandle {
    pub fn set(&self, value: bool) {
        debug!(label = %self.label, value, "FlagHandle::set: called");
        self.state.store(value, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ConditionTest for Flag {
    fn name(&self) -> &str {
        &self.label
    }

    fn condition_met(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    fn parameters(&self) -> Vec<TypedParameter> {
        Self::schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_follows_handle() {
        let flag = Flag::new("DoorSeen", false);
        let handle = flag.handle();
        assert!(!flag.condition_met());
        handle.set(true);
        assert!(flag.condition_met());
        handle.set(false);
        assert!(!flag.condition_met());
    }

    #[test]
    fn test_flag_from_params() {
        let flag = Flag::from_params(&Parameters::new().with("label", "DoorSeen").with("initial", true)).unwrap();
        assert_eq!(flag.name(), "DoorSeen");
        assert!(flag.condition_met());
    }

    #[test]
    fn test_default_label() {
        let flag = Flag::from_params(&Parameters::new()).unwrap();
        assert_eq!(flag.name(), "FLAG");
    }
}
