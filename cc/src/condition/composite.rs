//! AND / OR / NOT over other condition tests

use std::sync::Arc;

use super::ConditionTest;

/// Met when every child is met
pub struct All {
    children: Vec<Arc<dyn ConditionTest>>,
}

/// Met when at least one child is met
pub struct Any {
    children: Vec<Arc<dyn ConditionTest>>,
}

/// Met when the child is not
pub struct Not {
    child: Arc<dyn ConditionTest>,
}

impl All {
    pub fn new(children: Vec<Arc<dyn ConditionTest>>) -> Self {
        Self { children }
    }
}

impl Any {
    pub fn new(children: Vec<Arc<dyn ConditionTest>>) -> Self {
        Self { children }
    }
}

impl Not {
    pub fn new(child: Arc<dyn ConditionTest>) -> Self {
        Self { child }
    }
}

fn join(children: &[Arc<dyn ConditionTest>], op: &str) -> String {
    let parts: Vec<String> = children.iter().map(|c| c.describe()).collect();
    format!("({})", parts.join(op))
}

impl ConditionTest for All {
    fn name(&self) -> &str {
        "ALL"
    }

    fn condition_met(&self) -> bool {
        self.children.iter().all(|c| c.condition_met())
    }

    fn describe(&self) -> String {
        join(&self.children, " AND ")
    }
}

impl ConditionTest for Any {
    fn name(&self) -> &str {
        "ANY"
    }

    fn condition_met(&self) -> bool {
        self.children.iter().any(|c| c.condition_met())
    }

    fn describe(&self) -> String {
        join(&self.children, " OR ")
    }
}

impl ConditionTest for Not {
    fn name(&self) -> &str {
        "NOT"
    }

    fn condition_met(&self) -> bool {
        !self.child.condition_met()
    }

    fn describe(&self) -> String {
        format!("NOT {}", self.child.describe())
    }
}
