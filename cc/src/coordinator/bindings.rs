//! Termination bindings: condition test → (control law, resulting status)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{LawId, Status, TestId};

/// One law a firing test terminates, and the status it leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationCondition {
    #[serde(rename = "law-id")]
    pub law_id: LawId,
    pub status: Status,
}

/// Ordered binding lists keyed by test id
///
/// Law ids are not checked against the law registry; a binding to a law
/// that is gone is simply skipped by the evaluator.
#[derive(Debug, Default)]
pub struct TerminationTable {
    by_test: HashMap<TestId, Vec<TerminationCondition>>,
}

impl TerminationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding; duplicates are kept in order
    pub fn add(&mut self, test_id: TestId, law_id: LawId, status: Status) {
        self.by_test
            .entry(test_id)
            .or_default()
            .push(TerminationCondition { law_id, status });
    }

    pub fn get(&self, test_id: TestId) -> &[TerminationCondition] {
        self.by_test.get(&test_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bindings of every fired test, in the order the tests are given
    pub fn bound_to(&self, fired: &[TestId]) -> Vec<(TestId, TerminationCondition)> {
        fired
            .iter()
            .flat_map(|test_id| self.get(*test_id).iter().map(move |cond| (*test_id, *cond)))
            .collect()
    }

    /// Drop every binding of a test
    pub fn remove_test(&mut self, test_id: TestId) -> usize {
        self.by_test.remove(&test_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Total bindings across all tests
    pub fn len(&self) -> usize {
        self.by_test.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_test.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_creates_and_appends() {
        let mut table = TerminationTable::new();
        table.add(TestId::new(0), LawId::new(1), Status::Success);
        table.add(TestId::new(0), LawId::new(2), Status::Failure);

        let conds = table.get(TestId::new(0));
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].law_id, LawId::new(1));
        assert_eq!(conds[1].status, Status::Failure);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let mut table = TerminationTable::new();
        table.add(TestId::new(3), LawId::new(0), Status::Success);
        table.add(TestId::new(3), LawId::new(0), Status::Failure);
        let statuses: Vec<Status> = table.get(TestId::new(3)).iter().map(|c| c.status).collect();
        assert_eq!(statuses, vec![Status::Success, Status::Failure]);
    }

    #[test]
    fn test_bound_to_follows_fired_order() {
        let mut table = TerminationTable::new();
        table.add(TestId::new(1), LawId::new(10), Status::Failure);
        table.add(TestId::new(0), LawId::new(10), Status::Success);

        let bound = table.bound_to(&[TestId::new(0), TestId::new(1), TestId::new(9)]);
        assert_eq!(
            bound,
            vec![
                (
                    TestId::new(0),
                    TerminationCondition {
                        law_id: LawId::new(10),
                        status: Status::Success
                    }
                ),
                (
                    TestId::new(1),
                    TerminationCondition {
                        law_id: LawId::new(10),
                        status: Status::Failure
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_unknown_test_has_no_bindings() {
        let table = TerminationTable::new();
        assert!(table.get(TestId::new(42)).is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_test() {
        let mut table = TerminationTable::new();
        table.add(TestId::new(0), LawId::new(0), Status::Success);
        table.add(TestId::new(0), LawId::new(1), Status::Success);
        assert_eq!(table.remove_test(TestId::new(0)), 2);
        assert_eq!(table.remove_test(TestId::new(0)), 0);
        assert_eq!(table.len(), 0);
    }
}
