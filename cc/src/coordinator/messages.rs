//! Observability types for the Coordinator

use serde::{Deserialize, Serialize};

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub registered_laws: usize,
    pub registered_tests: usize,
    pub termination_bindings: usize,
    pub ticks: u64,
    pub stop_signals: u64,
    pub terminations_applied: u64,
    pub publish_failures: u64,
}
