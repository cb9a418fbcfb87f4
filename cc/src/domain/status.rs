//! Execution status of a control law

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a registered control law
///
/// A law starts `Executing`. It moves to `Success` or `Failure` only when a
/// bound condition test fires; once there it stays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Executing,
    Success,
    Failure,
    Unknown,
}

impl Status {
    /// Whether the evaluator must leave this status alone
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executing => "EXECUTING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EXECUTING" => Ok(Self::Executing),
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!("Unknown status: {}. Use: executing, success, failure, or unknown", s)),
        }
    }
}
