//! Status publishers
//!
//! The coordinator hands each tick's snapshot to one injected
//! [`StatusPublisher`]. Delivery is best effort: an error is logged and
//! counted by the caller and the next tick proceeds as usual.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use super::snapshot::StatusSnapshot;

/// Reasons a snapshot did not reach its audience
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("No status subscribers")]
    NoSubscribers,

    #[error("Status channel closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{failed} of {total} publishers failed: {first}")]
    Fanout { failed: usize, total: usize, first: String },
}

/// Receives every status snapshot the evaluator builds
pub trait StatusPublisher: Send + Sync {
    fn publish(&self, snapshot: &StatusSnapshot) -> Result<(), PublishError>;
}

/// Publishes snapshots on a tokio broadcast channel
///
/// Slow subscribers lag and lose the oldest snapshots rather than holding
/// up the evaluator.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<StatusSnapshot>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "BroadcastPublisher::new: called");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every snapshot published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StatusSnapshot> {
        debug!("BroadcastPublisher::subscribe: new subscriber");
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl StatusPublisher for BroadcastPublisher {
    fn publish(&self, snapshot: &StatusSnapshot) -> Result<(), PublishError> {
        self.tx
            .send(snapshot.clone())
            .map(|_| ())
            .map_err(|_| PublishError::NoSubscribers)
    }
}

/// Appends each snapshot as one JSON line to a file
pub struct JsonlPublisher {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlPublisher {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "JsonlPublisher::create: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusPublisher for JsonlPublisher {
    fn publish(&self, snapshot: &StatusSnapshot) -> Result<(), PublishError> {
        let line = serde_json::to_string(snapshot)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Logs a one-line summary of each snapshot at debug level
#[derive(Default)]
pub struct TracingPublisher;

impl StatusPublisher for TracingPublisher {
    fn publish(&self, snapshot: &StatusSnapshot) -> Result<(), PublishError> {
        debug!(
            channel = %snapshot.channel,
            tick = snapshot.tick,
            laws = snapshot.len(),
            summary = %snapshot.summary(),
            "status"
        );
        Ok(())
    }
}

/// Delivers to several publishers; one failing does not skip the rest
#[derive(Default)]
pub struct FanoutPublisher {
    publishers: Vec<Arc<dyn StatusPublisher>>,
}

impl FanoutPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, publisher: Arc<dyn StatusPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

impl StatusPublisher for FanoutPublisher {
    fn publish(&self, snapshot: &StatusSnapshot) -> Result<(), PublishError> {
        let mut failures = Vec::new();
        for publisher in &self.publishers {
            match publisher.publish(snapshot) {
                Ok(()) | Err(PublishError::NoSubscribers) => {}
                Err(e) => failures.push(e.to_string()),
            }
        }

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(PublishError::Fanout {
                failed: failures.len(),
                total: self.publishers.len(),
                first: first.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::snapshot::StatusEntry;
    use crate::domain::{LawId, Status};

    fn snapshot(tick: u64) -> StatusSnapshot {
        StatusSnapshot::new(
            "CONTROL_LAW_STATUS",
            tick,
            vec![StatusEntry {
                id: LawId::new(0),
                name: "ORIENT".to_string(),
                status: Status::Executing,
            }],
        )
    }

    struct Failing;

    impl StatusPublisher for Failing {
        fn publish(&self, _snapshot: &StatusSnapshot) -> Result<(), PublishError> {
            Err(PublishError::Closed)
        }
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_all_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx1 = publisher.subscribe();
        let mut rx2 = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        publisher.publish(&snapshot(1)).unwrap();

        assert_eq!(rx1.recv().await.unwrap().tick, 1);
        assert_eq!(rx2.recv().await.unwrap().tick, 1);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        assert!(matches!(publisher.publish(&snapshot(1)), Err(PublishError::NoSubscribers)));
    }

    #[test]
    fn test_jsonl_appends_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("status").join("status.jsonl");
        let publisher = JsonlPublisher::create(&path).unwrap();

        publisher.publish(&snapshot(1)).unwrap();
        publisher.publish(&snapshot(2)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: StatusSnapshot = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.tick, 2);
        assert_eq!(second.entries[0].name, "ORIENT");
    }

    #[test]
    fn test_fanout_continues_past_failures() {
        let broadcast = Arc::new(BroadcastPublisher::new(8));
        let mut rx = broadcast.subscribe();
        let fanout = FanoutPublisher::new()
            .with(Arc::new(Failing))
            .with(broadcast.clone())
            .with(Arc::new(TracingPublisher));

        let err = fanout.publish(&snapshot(3)).unwrap_err();
        assert!(matches!(err, PublishError::Fanout { failed: 1, total: 3, .. }));
        assert_eq!(rx.try_recv().unwrap().tick, 3);
    }

    #[test]
    fn test_fanout_ignores_missing_subscribers() {
        let fanout = FanoutPublisher::new().with(Arc::new(BroadcastPublisher::new(8)));
        assert!(fanout.publish(&snapshot(1)).is_ok());
    }
}
