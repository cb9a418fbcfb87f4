//! Fixed-rate drive task behind every concrete control law

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ControlLaw, DrivePolicy};
use crate::domain::TypedParameter;
use crate::robot::{DiffDrive, RobotIo};

/// A [`DrivePolicy`] bound to the robot's I/O
///
/// While running, a spawned task reads the latest state every `period`,
/// asks the policy for a command and puts it on the drive bus. Stopping
/// aborts the task and emits one zero command so the wheels come to rest;
/// no policy command is sent after that zero command.
///
/// The drive task is spawned on the runtime captured at construction (or
/// given with [`DrivenLaw::with_runtime`]), so the law can be started from
/// any thread.
pub struct DrivenLaw<P: DrivePolicy> {
    policy: Arc<P>,
    io: RobotIo,
    period: Duration,
    runtime: Option<Handle>,
    task: Mutex<Option<DriveTask>>,
}

struct DriveTask {
    handle: JoinHandle<()>,
    /// Cleared under its lock on stop; the task sends only while holding it set
    live: Arc<Mutex<bool>>,
}

impl<P: DrivePolicy> DrivenLaw<P> {
    pub fn new(policy: P, io: RobotIo, period: Duration) -> Self {
        debug!(name = policy.name(), ?period, "DrivenLaw::new: called");
        Self {
            policy: Arc::new(policy),
            io,
            period,
            runtime: Handle::try_current().ok(),
            task: Mutex::new(None),
        }
    }

    /// Spawn the drive task on `runtime`
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            debug!(name = self.policy.name(), "DrivenLaw::start: already running");
            return;
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(name = self.policy.name(), "No async runtime, control law cannot start");
            return;
        };

        self.policy.reset();
        let policy = Arc::clone(&self.policy);
        let io = self.io.clone();
        let period = self.period;
        let live = Arc::new(Mutex::new(true));
        let task_live = Arc::clone(&live);

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let command = policy.command(&io.latest());
                let live = task_live.lock();
                if !*live {
                    break;
                }
                io.send_drive(command);
            }
        });
        *task = Some(DriveTask { handle, live });
        debug!(name = self.policy.name(), "DrivenLaw::start: drive task spawned");
    }

    fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            *task.live.lock() = false;
            task.handle.abort();
            self.io.send_drive(DiffDrive::stopped());
            debug!(name = self.policy.name(), "DrivenLaw::stop: drive task aborted");
        }
    }
}

impl<P: DrivePolicy> ControlLaw for DrivenLaw<P> {
    fn name(&self) -> &str {
        self.policy.name()
    }

    fn set_running(&self, run: bool) {
        debug!(name = self.policy.name(), run, "DrivenLaw::set_running: called");
        if run { self.start() } else { self.stop() }
    }

    fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    fn parameters(&self) -> Vec<TypedParameter> {
        P::schema()
    }

    fn describe(&self) -> String {
        self.policy.describe()
    }
}

impl<P: DrivePolicy> Drop for DrivenLaw<P> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}
