use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    document::{CollectionWatchers, Document, DocumentListener, DocumentStore},
    error::StoreError,
};

type Collection = BTreeMap<String, Value>;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
    watchers: CollectionWatchers,
    offline: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with [`StoreError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Network("document store is offline".to_string()));
        }
        Ok(())
    }

    fn snapshot(collection: Option<&Collection>) -> Vec<Document> {
        collection
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn publish(&self, collections: &HashMap<String, Collection>, collection: &str) {
        if self.watchers.is_watched(collection) {
            self.watchers
                .publish(collection, Self::snapshot(collections.get(collection)));
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(Self::snapshot(collections.get(collection)))
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        self.ensure_online()?;
        let id = Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        self.publish(&collections, collection);

        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        self.publish(&collections, collection);

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some();

        if removed {
            self.publish(&collections, collection);
        }

        Ok(())
    }

    async fn listen(&self, collection: &str) -> Result<DocumentListener, StoreError> {
        self.ensure_online()?;
        let collections = self.collections.write().await;
        let snapshot = Self::snapshot(collections.get(collection));

        Ok(self.watchers.subscribe(collection, snapshot))
    }
}
