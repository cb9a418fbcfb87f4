//! Main Coordinator implementation

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::bindings::{TerminationCondition, TerminationTable};
use super::config::CoordinatorConfig;
use super::messages::CoordinatorMetrics;
use super::publisher::{PublishError, StatusPublisher};
use super::snapshot::{StatusEntry, StatusSnapshot};
use crate::condition::ConditionTest;
use crate::control::ControlLaw;
use crate::domain::{IdCounter, LawId, Status, TestId};

/// Registry record for a control law
struct LawEntry {
    law: Arc<dyn ControlLaw>,
    name: String,
    status: Status,
}

/// Registry record for a condition test
struct TestEntry {
    test: Arc<dyn ConditionTest>,
    name: String,
}

/// A law selected for termination during one tick
struct Target {
    law_id: LawId,
    law: Arc<dyn ControlLaw>,
    status: Status,
    test_id: TestId,
}

#[derive(Default)]
struct Counters {
    /// Completed ticks; written under the evaluation lock, read without it
    ticks: AtomicU64,
    stop_signals: AtomicU64,
    terminations_applied: AtomicU64,
    publish_failures: AtomicU64,
}

/// The Coordinator owns every registered control law and condition test,
/// the termination bindings between them, and the evaluator that closes
/// the loop.
///
/// Each table sits behind its own lock. A lock is held for a single map
/// operation or a single copy-out during a tick, never while calling into
/// law or test code, and never together with another table's lock.
pub struct Coordinator {
    config: CoordinatorConfig,
    law_ids: IdCounter,
    test_ids: IdCounter,
    laws: Mutex<BTreeMap<LawId, LawEntry>>,
    tests: Mutex<BTreeMap<TestId, TestEntry>>,
    terminations: Mutex<TerminationTable>,
    publisher: Arc<dyn StatusPublisher>,
    /// Serializes evaluation passes; holds the number of the last started tick
    evaluation: Mutex<u64>,
    counters: Counters,
}

impl Coordinator {
    /// Create a new Coordinator publishing through `publisher`
    pub fn new(config: CoordinatorConfig, publisher: Arc<dyn StatusPublisher>) -> Self {
        debug!(?config, "Coordinator::new: called");
        Self {
            config,
            law_ids: IdCounter::new(),
            test_ids: IdCounter::new(),
            laws: Mutex::new(BTreeMap::new()),
            tests: Mutex::new(BTreeMap::new()),
            terminations: Mutex::new(TerminationTable::new()),
            publisher,
            evaluation: Mutex::new(0),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Register a control law and start it
    ///
    /// The law is started before it becomes visible to the evaluator, so a
    /// stop issued by a termination always follows the start.
    pub fn register_control_law(&self, law: Arc<dyn ControlLaw>) -> LawId {
        let id = LawId::new(self.law_ids.next_raw());
        let name = law.name().to_string();
        debug!(%id, %name, "Coordinator::register_control_law: called");

        law.set_running(true);
        self.laws.lock().insert(
            id,
            LawEntry {
                law,
                name: name.clone(),
                status: Status::Executing,
            },
        );

        info!(%id, %name, "Registered and started control law");
        id
    }

    /// Remove a control law; returns whether one was registered under `id`
    ///
    /// With `stop-on-destroy` set the law is stopped after removal,
    /// otherwise it is dropped as is and may keep running if something else
    /// holds it.
    pub fn destroy_control_law(&self, id: LawId) -> bool {
        debug!(%id, "Coordinator::destroy_control_law: called");
        let removed = self.laws.lock().remove(&id);

        match removed {
            Some(entry) => {
                if self.config.stop_on_destroy {
                    debug!(%id, "Coordinator::destroy_control_law: stopping before drop");
                    entry.law.set_running(false);
                    self.counters.stop_signals.fetch_add(1, Ordering::Relaxed);
                }
                info!(%id, name = %entry.name, status = %entry.status, "Destroyed control law");
                true
            }
            None => {
                debug!(%id, "Coordinator::destroy_control_law: not found");
                false
            }
        }
    }

    /// Register a condition test; it is polled from the next tick on
    pub fn register_condition_test(&self, test: Arc<dyn ConditionTest>) -> TestId {
        let id = TestId::new(self.test_ids.next_raw());
        let name = test.name().to_string();
        debug!(%id, %name, "Coordinator::register_condition_test: called");

        self.tests.lock().insert(id, TestEntry { test, name: name.clone() });

        info!(%id, %name, "Registered condition test");
        id
    }

    /// Remove a condition test; returns whether one was registered under `id`
    ///
    /// Its termination bindings go with it: ids are never reused, so they
    /// could not fire again.
    pub fn destroy_condition_test(&self, id: TestId) -> bool {
        debug!(%id, "Coordinator::destroy_condition_test: called");
        let removed = self.tests.lock().remove(&id);

        match removed {
            Some(entry) => {
                let dropped = self.terminations.lock().remove_test(id);
                info!(%id, name = %entry.name, bindings = dropped, "Destroyed condition test");
                true
            }
            None => {
                debug!(%id, "Coordinator::destroy_condition_test: not found");
                false
            }
        }
    }

    /// Bind `test_id` to terminate `law_id` with `status` when it fires
    ///
    /// Neither id is checked; duplicates append.
    pub fn register_termination_condition(&self, test_id: TestId, law_id: LawId, status: Status) {
        debug!(%test_id, %law_id, %status, "Coordinator::register_termination_condition: called");
        self.terminations.lock().add(test_id, law_id, status);
        info!(%test_id, %law_id, %status, "Registered termination condition");
    }

    pub fn control_law_status(&self, id: LawId) -> Option<Status> {
        self.laws.lock().get(&id).map(|e| e.status)
    }

    pub fn control_law_name(&self, id: LawId) -> Option<String> {
        self.laws.lock().get(&id).map(|e| e.name.clone())
    }

    pub fn control_law_ids(&self) -> Vec<LawId> {
        self.laws.lock().keys().copied().collect()
    }

    pub fn has_condition_test(&self, id: TestId) -> bool {
        self.tests.lock().contains_key(&id)
    }

    pub fn condition_test_ids(&self) -> Vec<TestId> {
        self.tests.lock().keys().copied().collect()
    }

    pub fn termination_conditions(&self, test_id: TestId) -> Vec<TerminationCondition> {
        self.terminations.lock().get(test_id).to_vec()
    }

    /// Current law statuses without running a tick or publishing
    ///
    /// Never waits for a running pass; `tick` is the last completed one.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.build_snapshot(self.counters.ticks.load(Ordering::Acquire))
    }

    pub fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            registered_laws: self.laws.lock().len(),
            registered_tests: self.tests.lock().len(),
            termination_bindings: self.terminations.lock().len(),
            ticks: self.counters.ticks.load(Ordering::Acquire),
            stop_signals: self.counters.stop_signals.load(Ordering::Relaxed),
            terminations_applied: self.counters.terminations_applied.load(Ordering::Relaxed),
            publish_failures: self.counters.publish_failures.load(Ordering::Relaxed),
        }
    }

    /// Run one evaluation pass and publish its snapshot
    ///
    /// Polls every registered test, stops and statuses the laws bound to the
    /// ones that fired, then snapshots the law registry. Passes never
    /// overlap; a concurrent caller waits for the running pass to finish.
    pub fn tick(&self) -> StatusSnapshot {
        let mut evaluation = self.evaluation.lock();
        *evaluation += 1;
        let tick = *evaluation;

        let tests: Vec<(TestId, Arc<dyn ConditionTest>)> = self
            .tests
            .lock()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(&entry.test)))
            .collect();

        // Every test is evaluated, bound or not
        let fired: Vec<TestId> = tests
            .iter()
            .filter(|(_, test)| test.condition_met())
            .map(|(id, _)| *id)
            .collect();

        if !fired.is_empty() {
            let bound = self.terminations.lock().bound_to(&fired);
            if !bound.is_empty() {
                self.apply_terminations(&bound);
            }
        }

        let snapshot = self.build_snapshot(tick);
        self.counters.ticks.store(tick, Ordering::Release);
        drop(evaluation);

        self.publish(&snapshot);
        snapshot
    }

    fn apply_terminations(&self, bound: &[(TestId, TerminationCondition)]) {
        let targets = self.select_targets(bound);

        for target in &targets {
            debug!(law_id = %target.law_id, test_id = %target.test_id, "Coordinator::tick: stopping law");
            target.law.set_running(false);
            self.counters.stop_signals.fetch_add(1, Ordering::Relaxed);
        }

        let mut laws = self.laws.lock();
        for target in targets {
            // Destroyed while being stopped
            let Some(entry) = laws.get_mut(&target.law_id) else {
                continue;
            };
            entry.status = target.status;
            self.counters.terminations_applied.fetch_add(1, Ordering::Relaxed);
            info!(
                law_id = %target.law_id,
                name = %entry.name,
                test_id = %target.test_id,
                status = %target.status,
                "Termination condition met"
            );
        }
    }

    /// Pick the laws to stop this tick
    ///
    /// Bindings to missing laws are skipped, and so are laws already in a
    /// terminal status. A law hit by several bindings is stopped once and
    /// keeps the status of the last binding in order.
    fn select_targets(&self, bound: &[(TestId, TerminationCondition)]) -> Vec<Target> {
        let laws = self.laws.lock();
        let mut targets: Vec<Target> = Vec::new();

        for (test_id, cond) in bound {
            let Some(entry) = laws.get(&cond.law_id) else {
                debug!(law_id = %cond.law_id, %test_id, "Coordinator::tick: bound law no longer registered");
                continue;
            };
            if entry.status.is_terminal() {
                continue;
            }

            match targets.iter_mut().find(|t| t.law_id == cond.law_id) {
                Some(target) => {
                    target.status = cond.status;
                    target.test_id = *test_id;
                }
                None => targets.push(Target {
                    law_id: cond.law_id,
                    law: Arc::clone(&entry.law),
                    status: cond.status,
                    test_id: *test_id,
                }),
            }
        }

        targets
    }

    fn build_snapshot(&self, tick: u64) -> StatusSnapshot {
        let entries = self
            .laws
            .lock()
            .iter()
            .map(|(id, entry)| StatusEntry {
                id: *id,
                name: entry.name.clone(),
                status: entry.status,
            })
            .collect();
        StatusSnapshot::new(self.config.status_channel.clone(), tick, entries)
    }

    fn publish(&self, snapshot: &StatusSnapshot) {
        match self.publisher.publish(snapshot) {
            Ok(()) => {}
            Err(PublishError::NoSubscribers) => {
                debug!(tick = snapshot.tick, "Coordinator::publish: no subscribers");
            }
            Err(e) => {
                self.counters.publish_failures.fetch_add(1, Ordering::Relaxed);
                warn!(tick = snapshot.tick, error = %e, "Failed to publish status snapshot");
            }
        }
    }

    /// Run the evaluator at the configured rate until shutdown
    ///
    /// Each pass runs on the blocking pool so slow law or test code does not
    /// stall the async workers. A pass in flight when shutdown arrives is
    /// finished first. Overrunning passes cause ticks to be skipped.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        let period = self.config.tick_period();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(hz = self.config.tick_hz, channel = %self.config.status_channel, "Coordinator evaluator started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let coordinator = Arc::clone(&self);
                    if let Err(e) = tokio::task::spawn_blocking(move || coordinator.tick()).await {
                        warn!(error = %e, "Evaluator pass did not complete");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Coordinator evaluator shutting down");
                    break;
                }
            }
        }

        info!("Coordinator evaluator stopped");
    }

    /// Spawn the evaluator as a background task
    pub fn spawn(self: &Arc<Self>) -> EvaluatorHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(Arc::clone(self).run(shutdown_rx));
        EvaluatorHandle { shutdown_tx, task }
    }
}

/// Handle to a spawned evaluator
pub struct EvaluatorHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl EvaluatorHandle {
    /// Ask the evaluator to stop and wait for it to finish its current pass
    pub async fn stop(self) {
        debug!("EvaluatorHandle::stop: called");
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Evaluator task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
