//! Point-in-time status of every registered control law

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LawId, Status};

/// One law's line in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub id: LawId,
    pub name: String,
    pub status: Status,
}

/// Status of all registered laws as of one evaluator tick
///
/// Snapshots from different ticks are unrelated; no diffing is implied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub channel: String,
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<StatusEntry>,
}

impl StatusSnapshot {
    pub fn new(channel: impl Into<String>, tick: u64, entries: Vec<StatusEntry>) -> Self {
        Self {
            channel: channel.into(),
            tick,
            timestamp: Utc::now(),
            entries,
        }
    }

    /// Timestamp in microseconds since the epoch
    pub fn utime(&self) -> i64 {
        self.timestamp.timestamp_micros()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: LawId) -> Option<&StatusEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn status_of(&self, id: LawId) -> Option<Status> {
        self.get(id).map(|e| e.status)
    }

    /// Whether every listed law has finished; false for an empty snapshot
    pub fn all_terminal(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.status.is_terminal())
    }

    /// Compact one-line rendering, e.g. `0:ORIENT=SUCCESS 1:DRIVE=EXECUTING`
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}:{}={}", e.id.get(), e.name, e.status))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, name: &str, status: Status) -> StatusEntry {
        StatusEntry {
            id: LawId::new(id),
            name: name.to_string(),
            status,
        }
    }

    #[test]
    fn test_lookup_and_summary() {
        let snap = StatusSnapshot::new(
            "CONTROL_LAW_STATUS",
            4,
            vec![entry(0, "ORIENT", Status::Success), entry(2, "DRIVE", Status::Executing)],
        );
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.status_of(LawId::new(0)), Some(Status::Success));
        assert_eq!(snap.status_of(LawId::new(1)), None);
        assert_eq!(snap.summary(), "0:ORIENT=SUCCESS 2:DRIVE=EXECUTING");
        assert!(!snap.all_terminal());
    }

    #[test]
    fn test_all_terminal() {
        let empty = StatusSnapshot::new("c", 0, Vec::new());
        assert!(!empty.all_terminal());

        let done = StatusSnapshot::new(
            "c",
            1,
            vec![entry(0, "A", Status::Success), entry(1, "B", Status::Failure)],
        );
        assert!(done.all_terminal());
    }

    #[test]
    fn test_serialized_shape() {
        let snap = StatusSnapshot::new("c", 1, vec![entry(7, "FOLLOW_WALL", Status::Failure)]);
        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["entries"][0]["id"], 7);
        assert_eq!(json["entries"][0]["status"], "FAILURE");
        assert!(json["timestamp"].is_string());
    }
}
