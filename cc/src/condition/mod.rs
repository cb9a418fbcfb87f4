//! Condition tests
//!
//! A condition test is a predicate polled by the coordinator's evaluator.
//! Tests may be composites that own and evaluate other tests; the
//! coordinator only ever sees the top-level test it registered.

mod composite;
mod elapsed;
mod flag;
mod heading;
mod range;

use crate::domain::TypedParameter;

pub use composite::{All, Any, Not};
pub use elapsed::Elapsed;
pub use flag::{Flag, FlagHandle};
pub use heading::HeadingReached;
pub use range::RangeBelow;

/// A predicate over robot or world state
pub trait ConditionTest: Send + Sync {
    fn name(&self) -> &str;

    /// Recompute the predicate from whatever state the test tracks
    fn condition_met(&self) -> bool;

    /// Parameters this test accepts
    fn parameters(&self) -> Vec<TypedParameter> {
        Vec::new()
    }

    fn describe(&self) -> String {
        self.name().to_string()
    }
}
