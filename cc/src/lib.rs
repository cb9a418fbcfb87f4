//! commandcoord - coordination engine for robot control laws
//!
//! Control laws are closed-loop actuation policies; condition tests are
//! predicates that decide when a law should stop and with what outcome. The
//! coordinator ties them together: it hands out ids, keeps the termination
//! bindings, evaluates every test on a fixed schedule, stops the laws whose
//! bound tests fired, and publishes each law's status after every pass.
//!
//! # Modules
//!
//! - [`coordinator`] - Registries, termination bindings, evaluator, publishers
//! - [`control`] - ControlLaw trait and the orient / follow-wall / drive laws
//! - [`condition`] - ConditionTest trait, leaf tests and composites
//! - [`catalog`] - Builds laws and tests from named descriptors
//! - [`service`] - Serializable command boundary in front of the coordinator
//! - [`robot`] - Robot state, drive commands and the kinematic simulator
//! - [`scenario`] - Timed command scripts
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod catalog;
pub mod cli;
pub mod condition;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod domain;
pub mod robot;
pub mod scenario;
pub mod service;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, ConditionTestDescriptor, ControlLawDescriptor};
pub use condition::ConditionTest;
pub use config::Config;
pub use control::ControlLaw;
pub use coordinator::{
    BroadcastPublisher, Coordinator, CoordinatorConfig, CoordinatorMetrics, EvaluatorHandle, PublishError,
    StatusPublisher, StatusSnapshot,
};
pub use domain::{LawId, ParameterError, Parameters, Status, TestId, TypedParameter, TypedValue, ValueType};
pub use scenario::Scenario;
pub use service::{CommandService, CoordCommand, CoordReply};
