mod model;

use async_trait::async_trait;
use model::DocumentStorageModel;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    document::{CollectionWatchers, Document, DocumentListener, DocumentStore},
    error::StoreError,
};

/// Document store persisted in a single SQLite table. Writes are serialised so
/// that every listener observes snapshots in write order.
pub struct SqliteDocumentStore {
    pool: sqlx::SqlitePool,
    watchers: CollectionWatchers,
    write_lock: Mutex<()>,
}

impl SqliteDocumentStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            pool,
            watchers: CollectionWatchers::default(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new().connect(database_url).await?;
        let store = Self::new(pool);
        store.migrate().await?;

        log::info!("Connected to document store at {database_url}");
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)
",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentStorageModel>(
            "SELECT id, data FROM documents WHERE collection = ? ORDER BY id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn upsert(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError> {
        let data = serde_json::to_string(data)?;
        sqlx::query(
            "
INSERT INTO documents (collection, id, data)
VALUES (?, ?, ?)
ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data
",
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn publish(&self, collection: &str) {
        if !self.watchers.is_watched(collection) {
            return;
        }

        match self.fetch_collection(collection).await {
            Ok(snapshot) => self.watchers.publish(collection, snapshot),
            Err(e) => log::warn!("Failed to refresh listeners of {collection}: {e}"),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.fetch_collection(collection).await
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let _guard = self.write_lock.lock().await;
        let id = Uuid::new_v4().simple().to_string();
        self.upsert(collection, &id, &data).await?;
        self.publish(collection).await;

        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.upsert(collection, id, &data).await?;
        self.publish(collection).await;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.publish(collection).await;
        }

        Ok(())
    }

    async fn listen(&self, collection: &str) -> Result<DocumentListener, StoreError> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.fetch_collection(collection).await?;

        Ok(self.watchers.subscribe(collection, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn store() -> SqliteDocumentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteDocumentStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn set_replaces_existing_document() {
        let store = store().await;

        store.set("c", "r1", json!({ "title": "old" })).await.unwrap();
        store.set("c", "r1", json!({ "title": "new" })).await.unwrap();

        let documents = store.list("c").await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].data["title"], "new");
    }

    #[tokio::test]
    async fn add_assigns_fresh_ids() {
        let store = store().await;

        let first = store.add("c", json!({})).await.unwrap();
        let second = store.add("c", json!({})).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list("c").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn listener_sees_deletes() {
        let store = store().await;
        store.set("c", "r1", json!({})).await.unwrap();
        let mut listener = store.listen("c").await.unwrap();
        assert_eq!(listener.next().await.unwrap().len(), 1);

        store.delete("c", "r1").await.unwrap();

        assert!(listener.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = store().await;

        store.set("users/a/reminders", "r1", json!({})).await.unwrap();

        assert!(store.list("users/b/reminders").await.unwrap().is_empty());
    }
}
