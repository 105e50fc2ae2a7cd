//! Change feed over the document store.
//!
//! [`ChangeWatcher`] polls a set of collections, fingerprints each document
//! with BLAKE3 and reports what was added, modified or removed since the
//! previous poll. The first poll of a collection only records its state.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::storage::{Document, DocumentStore};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The document appeared.
    Added,
    /// The document's fields changed.
    Modified,
    /// The document disappeared.
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// One observed change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Collection the document belongs to.
    pub collection: String,
    /// Document identifier.
    pub id: String,
    /// What happened.
    pub kind: ChangeKind,
    /// Current fields; `None` for removals.
    pub fields: Option<Document>,
}

/// A cloneable handle that stops a running watcher.
#[derive(Debug, Clone, Default)]
pub struct WatchHandle {
    stop_signal: Arc<AtomicBool>,
}

impl WatchHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the watcher to stop after its current poll.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

type Snapshot = HashMap<String, blake3::Hash>;

fn fingerprint(fields: &Document) -> blake3::Hash {
    // serde_json maps are ordered, so equal documents serialize identically
    let bytes = serde_json::to_vec(fields).unwrap_or_default();
    blake3::hash(&bytes)
}

/// Polls collections and reports document changes.
#[derive(Debug)]
pub struct ChangeWatcher {
    store: Arc<dyn DocumentStore>,
    collections: Vec<String>,
    interval: Duration,
    snapshots: HashMap<String, Snapshot>,
}

impl ChangeWatcher {
    /// Watch `collections` every `interval`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collections: Vec<String>, interval: Duration) -> Self {
        Self {
            store,
            collections,
            interval,
            snapshots: HashMap::new(),
        }
    }

    /// Watch the configured collections at the configured interval.
    #[must_use]
    pub fn from_config(store: Arc<dyn DocumentStore>, sync: &SyncConfig) -> Self {
        Self::new(
            store,
            sync.collections.clone(),
            Duration::from_millis(sync.poll_interval_ms),
        )
    }

    /// Poll every collection once and return the changes since the last poll.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be listed; snapshots of
    /// collections polled before the failure are kept.
    pub async fn poll(&mut self) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();

        for collection in &self.collections {
            let documents = self.store.list(collection).await?;
            let mut current = Snapshot::with_capacity(documents.len());
            let previous = self.snapshots.get(collection);

            for doc in documents {
                let hash = fingerprint(&doc.fields);
                let kind = match previous.map(|p| p.get(&doc.id)) {
                    None => None,
                    Some(None) => Some(ChangeKind::Added),
                    Some(Some(old)) if *old != hash => Some(ChangeKind::Modified),
                    Some(Some(_)) => None,
                };
                if let Some(kind) = kind {
                    events.push(ChangeEvent {
                        collection: collection.clone(),
                        id: doc.id.clone(),
                        kind,
                        fields: Some(doc.fields),
                    });
                }
                current.insert(doc.id, hash);
            }

            if let Some(previous) = previous {
                let mut removed: Vec<_> = previous
                    .keys()
                    .filter(|id| !current.contains_key(*id))
                    .cloned()
                    .collect();
                removed.sort();
                events.extend(removed.into_iter().map(|id| ChangeEvent {
                    collection: collection.clone(),
                    id,
                    kind: ChangeKind::Removed,
                    fields: None,
                }));
            } else {
                debug!(collection = %collection, documents = current.len(), "Primed snapshot");
            }

            self.snapshots.insert(collection.clone(), current);
        }

        Ok(events)
    }

    /// Run the watcher on a background task.
    ///
    /// Events are delivered on the returned channel. The task ends when the
    /// handle is stopped or the receiver is dropped. Poll failures are
    /// logged and retried on the next tick.
    #[must_use]
    pub fn spawn(
        mut self,
        buffer: usize,
    ) -> (WatchHandle, mpsc::Receiver<ChangeEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = WatchHandle::new();
        let stop = handle.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if stop.should_stop() {
                    debug!("Change watcher stopped");
                    break;
                }

                match self.poll().await {
                    Ok(events) => {
                        for event in events {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("Change poll failed: {e}"),
                }
            }
        });

        (handle, rx, task)
    }
}
