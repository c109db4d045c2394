use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// A cloud-style NoSQL collection store. Collections are addressed by slash
/// separated paths, snapshots are ordered by document id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Creates a document under a store-assigned id and returns that id.
    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Creates or replaces the document with the given id.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Deleting an absent document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn listen(&self, collection: &str) -> Result<DocumentListener, StoreError>;
}

/// Standing subscription to one collection. Dropping it releases the subscription.
pub struct DocumentListener {
    rx: watch::Receiver<Vec<Document>>,
    primed: bool,
}

impl DocumentListener {
    pub(crate) fn new(rx: watch::Receiver<Vec<Document>>) -> Self {
        Self { rx, primed: false }
    }

    /// The current snapshot on the first call, then one full snapshot per change.
    /// Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        if self.primed {
            self.rx.changed().await.ok()?;
        } else {
            self.primed = true;
        }

        Some(self.rx.borrow_and_update().clone())
    }

    pub fn cancel(self) {
        log::debug!("Document listener cancelled");
    }
}

/// Per-collection snapshot channels shared by the listeners of one store.
#[derive(Default)]
pub(crate) struct CollectionWatchers(Mutex<HashMap<String, watch::Sender<Vec<Document>>>>);

impl CollectionWatchers {
    pub fn subscribe(&self, collection: &str, snapshot: Vec<Document>) -> DocumentListener {
        let mut watchers = self.0.lock().expect("Watcher registry lock poisoned");
        let rx = match watchers.get(collection) {
            Some(tx) => {
                tx.send_if_modified(|current| {
                    if *current == snapshot {
                        return false;
                    }
                    *current = snapshot;
                    true
                });
                tx.subscribe()
            }
            None => {
                let (tx, rx) = watch::channel(snapshot);
                watchers.insert(collection.to_string(), tx);
                rx
            }
        };

        DocumentListener::new(rx)
    }

    pub fn is_watched(&self, collection: &str) -> bool {
        let mut watchers = self.0.lock().expect("Watcher registry lock poisoned");
        watchers.retain(|_, tx| tx.receiver_count() > 0);
        watchers.contains_key(collection)
    }

    pub fn publish(&self, collection: &str, snapshot: Vec<Document>) {
        let watchers = self.0.lock().expect("Watcher registry lock poisoned");
        if let Some(tx) = watchers.get(collection) {
            tx.send_replace(snapshot);
        }
    }
}
