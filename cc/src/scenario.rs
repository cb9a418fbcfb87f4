//! Scenario files: timed command scripts for `ccd run`

use std::fs;
use std::path::Path;
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::service::CoordCommand;

/// A named list of commands, each issued at an offset from the start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Seconds from scenario start
    #[serde(rename = "at-secs", default)]
    pub at_secs: f64,

    pub command: CoordCommand,
}

impl Step {
    pub fn offset(&self) -> Duration {
        Duration::from_secs_f64(self.at_secs.max(0.0))
    }
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "Scenario::load: called");
        let content = fs::read_to_string(path).context(format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml(&content).context(format!("Failed to parse scenario {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut scenario: Self = serde_yaml::from_str(content)?;
        // Stable: steps sharing an offset keep their file order
        scenario.steps.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        Ok(scenario)
    }

    /// Offset of the last step
    pub fn end(&self) -> Duration {
        self.steps.last().map(Step::offset).unwrap_or_default()
    }

    /// Check every step without touching a coordinator
    ///
    /// Builds each law and test descriptor through `catalog` and rejects
    /// negative or non-finite offsets. Returns one message per problem.
    pub fn validate(&self, catalog: &Catalog) -> Vec<String> {
        debug!(name = %self.name, steps = self.steps.len(), "Scenario::validate: called");
        let mut problems = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            if !step.at_secs.is_finite() || step.at_secs < 0.0 {
                problems.push(format!("step {}: invalid offset {}", index, step.at_secs));
            }

            let result = match &step.command {
                CoordCommand::RegisterControlLaw { law } => catalog.build_control_law(law).map(|_| ()),
                CoordCommand::RegisterConditionTest { test } => catalog.build_condition_test(test).map(|_| ()),
                _ => Ok(()),
            };
            if let Err(e) = result {
                problems.push(format!("step {}: {}", index, e));
            }
        }

        problems
    }
}
