//! Control laws
//!
//! A control law is a running actuation policy. The coordinator only starts
//! and stops laws and asks for their names; everything else lives behind the
//! [`ControlLaw`] trait.
//!
//! Concrete laws are written as [`DrivePolicy`]s (pure state → command
//! functions) and wrapped in a [`DrivenLaw`], which owns the fixed-rate task
//! that feeds the policy and publishes its commands while the law runs.

mod follow_wall;
mod forward;
mod orient;
mod runner;

use crate::domain::TypedParameter;
use crate::robot::{DiffDrive, RobotState};

pub use follow_wall::FollowWall;
pub use forward::Forward;
pub use orient::Orient;
pub use runner::DrivenLaw;

/// A closed-loop actuation policy managed by the coordinator
pub trait ControlLaw: Send + Sync {
    /// Short name, used in status snapshots
    fn name(&self) -> &str;

    /// Start or stop producing actuation output
    fn set_running(&self, run: bool);

    fn is_running(&self) -> bool;

    /// Parameters this law accepts
    fn parameters(&self) -> Vec<TypedParameter>;

    /// Human-readable summary of the configured law
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Maps the latest robot state to a drive command
pub trait DrivePolicy: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Parameters accepted by this policy's constructor
    fn schema() -> Vec<TypedParameter>
    where
        Self: Sized;

    fn command(&self, state: &RobotState) -> DiffDrive;

    /// Forget any filtering state carried between commands
    fn reset(&self) {}

    fn describe(&self) -> String {
        self.name().to_string()
    }
}
