//! Coordinator for control laws and condition tests
//!
//! The Coordinator closes the loop between three tables:
//! - **Laws:** running control laws and their current status
//! - **Tests:** condition tests polled every tick
//! - **Terminations:** which laws a firing test stops, and with what status
//!
//! A fixed-rate evaluator polls the tests, applies terminations and hands a
//! [`StatusSnapshot`] of every law to the injected [`StatusPublisher`].

mod bindings;
mod config;
mod core;
mod messages;
mod publisher;
mod snapshot;

pub use bindings::{TerminationCondition, TerminationTable};
pub use config::CoordinatorConfig;
pub use core::{Coordinator, EvaluatorHandle};
pub use messages::CoordinatorMetrics;
pub use publisher::{
    BroadcastPublisher, FanoutPublisher, JsonlPublisher, PublishError, StatusPublisher, TracingPublisher,
};
pub use snapshot::{StatusEntry, StatusSnapshot};
