//! Catalog - builds control laws and condition tests from descriptors
//!
//! The coordinator never sees the catalog; it only receives the trait
//! objects built here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::debug;

use crate::condition::{All, Any, ConditionTest, Elapsed, Flag, FlagHandle, HeadingReached, Not, RangeBelow};
use crate::control::{ControlLaw, DrivePolicy, DrivenLaw, FollowWall, Forward, Orient};
use crate::domain::{ParameterError, Parameters, TypedParameter};
use crate::robot::{RobotConfig, RobotIo};

/// Names a control law variant and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlLawDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Parameters,
}

impl ControlLawDescriptor {
    pub fn new(name: &str, params: Parameters) -> Self {
        Self {
            name: name.to_string(),
            params,
        }
    }
}

/// Names a condition test variant, its parameters and, for composites, the
/// child tests it combines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTestDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConditionTestDescriptor>,
}

impl ConditionTestDescriptor {
    pub fn new(name: &str, params: Parameters) -> Self {
        Self {
            name: name.to_string(),
            params,
            children: Vec::new(),
        }
    }

    pub fn composite(name: &str, children: Vec<ConditionTestDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            params: Parameters::new(),
            children,
        }
    }
}

/// Errors building from a descriptor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Unknown control law: {0}")]
    UnknownControlLaw(String),

    #[error("Unknown condition test: {0}")]
    UnknownConditionTest(String),

    #[error("Invalid parameters: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Composite '{0}' needs at least one child")]
    EmptyComposite(String),

    #[error("'{name}' takes {expected} child test(s), got {found}")]
    ChildCount { name: String, expected: usize, found: usize },
}

/// A built condition test plus the flags anywhere inside it
pub struct BuiltTest {
    pub test: Arc<dyn ConditionTest>,
    pub flags: Vec<FlagHandle>,
}

/// One variant the catalog can build
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<TypedParameter>,
}

/// Builds concrete laws and tests wired to one robot
///
/// Laws are bound to the runtime current when the catalog was created, so
/// they start even when registered from a thread outside that runtime.
#[derive(Clone)]
pub struct Catalog {
    io: RobotIo,
    robot: RobotConfig,
    runtime: Option<Handle>,
}

impl Catalog {
    pub fn new(io: RobotIo, robot: RobotConfig) -> Self {
        debug!(?robot, "Catalog::new: called");
        Self {
            io,
            robot,
            runtime: Handle::try_current().ok(),
        }
    }

    /// Run the drive tasks of built laws on `runtime`
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn io(&self) -> &RobotIo {
        &self.io
    }

    /// Build a control law; it is constructed stopped
    pub fn build_control_law(&self, desc: &ControlLawDescriptor) -> Result<Arc<dyn ControlLaw>, CatalogError> {
        debug!(name = %desc.name, "Catalog::build_control_law: called");
        match normalize(&desc.name).as_str() {
            "orient" => Ok(self.driven(Orient::from_params(&desc.params, self.robot.sim)?)),
            "follow-wall" => Ok(self.driven(FollowWall::from_params(&desc.params)?)),
            "drive" => Ok(self.driven(Forward::from_params(&desc.params)?)),
            _ => Err(CatalogError::UnknownControlLaw(desc.name.clone())),
        }
    }

    fn driven<P: DrivePolicy>(&self, policy: P) -> Arc<dyn ControlLaw> {
        let law = DrivenLaw::new(policy, self.io.clone(), self.robot.drive_period());
        match &self.runtime {
            Some(runtime) => Arc::new(law.with_runtime(runtime.clone())),
            None => Arc::new(law),
        }
    }

    /// Build a condition test, recursing into composite children
    pub fn build_condition_test(&self, desc: &ConditionTestDescriptor) -> Result<BuiltTest, CatalogError> {
        debug!(name = %desc.name, "Catalog::build_condition_test: called");
        let mut flags = Vec::new();
        let test = self.build_test(desc, &mut flags)?;
        Ok(BuiltTest { test, flags })
    }

    fn build_test(
        &self,
        desc: &ConditionTestDescriptor,
        flags: &mut Vec<FlagHandle>,
    ) -> Result<Arc<dyn ConditionTest>, CatalogError> {
        let name = normalize(&desc.name);
        match name.as_str() {
            "all" | "any" => {
                if desc.children.is_empty() {
                    return Err(CatalogError::EmptyComposite(desc.name.clone()));
                }
                let children = desc
                    .children
                    .iter()
                    .map(|child| self.build_test(child, flags))
                    .collect::<Result<Vec<_>, _>>()?;
                if name == "all" {
                    Ok(Arc::new(All::new(children)))
                } else {
                    Ok(Arc::new(Any::new(children)))
                }
            }
            "not" => match desc.children.as_slice() {
                [child] => Ok(Arc::new(Not::new(self.build_test(child, flags)?))),
                children => Err(CatalogError::ChildCount {
                    name: desc.name.clone(),
                    expected: 1,
                    found: children.len(),
                }),
            },
            leaf => {
                if !desc.children.is_empty() {
                    return Err(CatalogError::ChildCount {
                        name: desc.name.clone(),
                        expected: 0,
                        found: desc.children.len(),
                    });
                }
                match leaf {
                    "flag" => {
                        let flag = Flag::from_params(&desc.params)?;
                        flags.push(flag.handle());
                        Ok(Arc::new(flag))
                    }
                    "heading-reached" => Ok(Arc::new(HeadingReached::from_params(&desc.params, self.io.clone())?)),
                    "range-below" => Ok(Arc::new(RangeBelow::from_params(&desc.params, self.io.clone())?)),
                    "elapsed" => Ok(Arc::new(Elapsed::from_params(&desc.params)?)),
                    _ => Err(CatalogError::UnknownConditionTest(desc.name.clone())),
                }
            }
        }
    }

    /// Control law variants with their parameter schemas
    pub fn control_laws() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                name: "orient",
                description: "Turn in place to a heading, the shorter way",
                params: Orient::schema(),
            },
            CatalogEntry {
                name: "follow-wall",
                description: "Hold a distance from the wall on one side while driving",
                params: FollowWall::schema(),
            },
            CatalogEntry {
                name: "drive",
                description: "Drive straight at a constant speed",
                params: Forward::schema(),
            },
        ]
    }

    /// Condition test variants with their parameter schemas
    pub fn condition_tests() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                name: "flag",
                description: "Set and cleared from outside",
                params: Flag::schema(),
            },
            CatalogEntry {
                name: "heading-reached",
                description: "Robot faces a heading within a tolerance",
                params: HeadingReached::schema(),
            },
            CatalogEntry {
                name: "range-below",
                description: "Side range sensor reads under a distance",
                params: RangeBelow::schema(),
            },
            CatalogEntry {
                name: "elapsed",
                description: "A fixed time has passed since registration",
                params: Elapsed::schema(),
            },
            CatalogEntry {
                name: "all",
                description: "Every child test is met",
                params: Vec::new(),
            },
            CatalogEntry {
                name: "any",
                description: "At least one child test is met",
                params: Vec::new(),
            },
            CatalogEntry {
                name: "not",
                description: "The single child test is not met",
                params: Vec::new(),
            },
        ]
    }
}

/// `FOLLOW_WALL`, `follow_wall` and `follow-wall` name the same variant
fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn catalog() -> Catalog {
        Catalog::new(RobotIo::default(), RobotConfig::default())
    }

    #[test]
    fn test_build_control_laws() {
        let catalog = catalog();
        let orient = catalog
            .build_control_law(&ControlLawDescriptor::new("orient", Parameters::new().with("yaw", PI / 2.0)))
            .unwrap();
        assert_eq!(orient.name(), "ORIENT");
        assert!(!orient.is_running());

        let wall = catalog
            .build_control_law(&ControlLawDescriptor::new(
                "FOLLOW_WALL",
                Parameters::new().with("side", "left").with("distance", 1.0),
            ))
            .unwrap();
        assert_eq!(wall.name(), "FOLLOW_WALL");
    }

    #[test]
    fn test_unknown_control_law() {
        let err = catalog()
            .build_control_law(&ControlLawDescriptor::new("teleport", Parameters::new()))
            .err()
            .unwrap();
        assert_eq!(err, CatalogError::UnknownControlLaw("teleport".to_string()));
    }

    #[test]
    fn test_parameter_errors_surface() {
        let err = catalog()
            .build_control_law(&ControlLawDescriptor::new("orient", Parameters::new().with("yaw", 7.0)))
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::Parameter(ParameterError::OutOfRange { .. })));

        let err = catalog()
            .build_control_law(&ControlLawDescriptor::new("drive", Parameters::new()))
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::Parameter(ParameterError::Missing { .. })));
    }

    #[test]
    fn test_composite_collects_flags() {
        let desc = ConditionTestDescriptor::composite(
            "all",
            vec![
                ConditionTestDescriptor::composite(
                    "any",
                    vec![
                        ConditionTestDescriptor::new("flag", Parameters::new().with("label", "F0")),
                        ConditionTestDescriptor::new("flag", Parameters::new().with("label", "F1")),
                    ],
                ),
                ConditionTestDescriptor::new("flag", Parameters::new().with("label", "F2")),
            ],
        );
        let built = catalog().build_condition_test(&desc).unwrap();
        assert_eq!(built.flags.len(), 3);
        assert_eq!(built.test.name(), "ALL");
        assert!(!built.test.condition_met());

        built.flags[2].set(true);
        assert!(!built.test.condition_met());
        built.flags[1].set(true);
        assert!(built.test.condition_met());
    }

    #[test]
    fn test_composite_shape_errors() {
        let catalog = catalog();
        let err = catalog
            .build_condition_test(&ConditionTestDescriptor::composite("any", Vec::new()))
            .err()
            .unwrap();
        assert_eq!(err, CatalogError::EmptyComposite("any".to_string()));

        let two = vec![
            ConditionTestDescriptor::new("flag", Parameters::new()),
            ConditionTestDescriptor::new("flag", Parameters::new()),
        ];
        let err = catalog
            .build_condition_test(&ConditionTestDescriptor::composite("not", two))
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::ChildCount { expected: 1, found: 2, .. }));
    }

    #[test]
    fn test_not_inverts_child() {
        let desc = ConditionTestDescriptor::composite("not", vec![ConditionTestDescriptor::new("flag", Parameters::new())]);
        let built = catalog().build_condition_test(&desc).unwrap();
        assert!(built.test.condition_met());
        built.flags[0].set(true);
        assert!(!built.test.condition_met());
    }

    #[test]
    fn test_descriptor_from_yaml() {
        let yaml = r#"
name: any
children:
  - name: range-below
    params:
      side: right
      distance: 0.5
  - name: elapsed
    params:
      seconds: 10
"#;
        let desc: ConditionTestDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(desc.children.len(), 2);
        let built = catalog().build_condition_test(&desc).unwrap();
        assert!(built.flags.is_empty());
    }

    #[test]
    fn test_listing_covers_every_variant() {
        let laws: Vec<&str> = Catalog::control_laws().iter().map(|e| e.name).collect();
        assert_eq!(laws, vec!["orient", "follow-wall", "drive"]);
        let tests = Catalog::condition_tests();
        assert_eq!(tests.len(), 7);
        assert!(tests.iter().any(|e| e.name == "heading-reached" && !e.params.is_empty()));
    }
}
