use std::sync::Arc;

use async_trait::async_trait;
use chronos_models::reminder::Reminder;

use crate::{
    auth::AuthProvider,
    document::{Document, DocumentListener, DocumentStore},
    error::{AuthError, StoreError},
};

#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Live sequence of the signed-in user's reminders.
    async fn list(&self) -> Result<ReminderSubscription, StoreError>;
    async fn add(&self, reminder: Reminder) -> Result<Reminder, StoreError>;
    async fn update(&self, reminder: Reminder) -> Result<Reminder, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

pub struct ReminderSubscription {
    listener: DocumentListener,
}

impl ReminderSubscription {
    pub async fn next(&mut self) -> Option<Vec<Reminder>> {
        let documents = self.listener.next().await?;
        Some(documents.into_iter().filter_map(decode_reminder).collect())
    }

    pub fn cancel(self) {
        self.listener.cancel();
    }
}

fn decode_reminder(document: Document) -> Option<Reminder> {
    match serde_json::from_value::<Reminder>(document.data) {
        Ok(reminder) => Some(Reminder {
            id: document.id,
            ..reminder
        }),
        Err(e) => {
            log::warn!("Skipping undecodable reminder document {}: {e}", document.id);
            None
        }
    }
}

/// Reminder store over a per-user document collection `users/{uid}/reminders`.
pub struct DocumentReminderStore {
    documents: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl DocumentReminderStore {
    pub fn new(documents: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { documents, auth }
    }

    async fn collection(&self) -> Result<String, StoreError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(AuthError::NotSignedIn)?;

        Ok(format!("users/{}/reminders", user.id))
    }
}

#[async_trait]
impl ReminderStore for DocumentReminderStore {
    async fn list(&self) -> Result<ReminderSubscription, StoreError> {
        let collection = self.collection().await?;
        let listener = self.documents.listen(&collection).await?;

        Ok(ReminderSubscription { listener })
    }

    async fn add(&self, reminder: Reminder) -> Result<Reminder, StoreError> {
        let collection = self.collection().await?;

        if reminder.id.is_empty() {
            let data = serde_json::to_value(&reminder)?;
            let id = self.documents.add(&collection, data).await?;
            log::info!("Added reminder {id} with store-assigned id");
            return Ok(Reminder { id, ..reminder });
        }

        let data = serde_json::to_value(&reminder)?;
        self.documents.set(&collection, &reminder.id, data).await?;
        log::info!("Added reminder {}", reminder.id);

        Ok(reminder)
    }

    async fn update(&self, reminder: Reminder) -> Result<Reminder, StoreError> {
        if reminder.id.is_empty() {
            return Err(StoreError::MissingId);
        }

        let collection = self.collection().await?;
        let data = serde_json::to_value(&reminder)?;
        self.documents.set(&collection, &reminder.id, data).await?;
        log::info!("Updated reminder {}", reminder.id);

        Ok(reminder)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let collection = self.collection().await?;
        self.documents.delete(&collection, id).await?;
        log::info!("Deleted reminder {id}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chronos_models::{reminder::ReminderFireTime, user::User};
    use proptest::prelude::*;
    use serde_json::json;
    use test_strategy::proptest;

    use super::*;
    use crate::{auth::InMemoryAuthProvider, memory::InMemoryDocumentStore};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            display_name: None,
            email: None,
        }
    }

    fn reminder(id: &str, title: &str) -> Reminder {
        Reminder {
            id: id.to_string(),
            title: title.to_string(),
            fire_at: ReminderFireTime::from_millis(1_000).unwrap(),
            notes: None,
            image_url: None,
        }
    }

    fn signed_in_store() -> (Arc<InMemoryDocumentStore>, DocumentReminderStore) {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let auth = Arc::new(InMemoryAuthProvider::signed_in(user("u1")));
        let store = DocumentReminderStore::new(documents.clone(), auth);
        (documents, store)
    }

    fn tokio_ct(future: impl Future<Output = Result<(), TestCaseError>>) -> Result<(), TestCaseError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[tokio::test]
    async fn operations_without_session_fail_with_auth_error() {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let auth = Arc::new(InMemoryAuthProvider::new([]));
        let store = DocumentReminderStore::new(documents, auth);

        let result = store.add(reminder("r1", "t")).await;

        assert!(matches!(
            result,
            Err(StoreError::Auth(AuthError::NotSignedIn))
        ));
        assert!(store.list().await.is_err());
    }

    #[tokio::test]
    async fn reminders_are_scoped_to_user_collection() {
        let (documents, store) = signed_in_store();

        store.add(reminder("r1", "Dentist")).await.unwrap();

        let stored = documents.list("users/u1/reminders").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "r1");
    }

    #[tokio::test]
    async fn add_without_id_uses_store_assigned_id() {
        let (_, store) = signed_in_store();

        let added = store.add(reminder("", "Gym")).await.unwrap();
        let mut subscription = store.list().await.unwrap();
        let snapshot = subscription.next().await.unwrap();

        assert!(!added.id.is_empty());
        assert_eq!(snapshot[0].id, added.id);
    }

    #[tokio::test]
    async fn update_without_id_is_rejected() {
        let (_, store) = signed_in_store();

        let result = store.update(reminder("", "Gym")).await;

        assert!(matches!(result, Err(StoreError::MissingId)));
    }

    #[tokio::test]
    async fn undecodable_documents_are_skipped() {
        let (documents, store) = signed_in_store();
        documents
            .set("users/u1/reminders", "broken", json!({ "title": 5 }))
            .await
            .unwrap();
        store.add(reminder("r1", "ok")).await.unwrap();

        let mut subscription = store.list().await.unwrap();
        let snapshot = subscription.next().await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "r1");
    }

    #[tokio::test]
    async fn delete_removes_from_live_sequence_and_tolerates_repeats() {
        let (_, store) = signed_in_store();
        store.add(reminder("r1", "a")).await.unwrap();
        let mut subscription = store.list().await.unwrap();
        subscription.next().await.unwrap();

        store.delete("r1").await.unwrap();
        store.delete("r1").await.unwrap();

        assert!(subscription.next().await.unwrap().is_empty());
    }

    #[proptest(async = tokio_ct)]
    async fn add_then_updates_converge_to_one_record(
        #[strategy("[a-z0-9]{1,8}")] id: String,
        #[strategy(proptest::collection::vec("[a-zA-Z ]{0,12}", 1..5))] titles: Vec<String>,
    ) {
        let (_, store) = signed_in_store();
        let mut subscription = store.list().await.unwrap();

        store.add(reminder(&id, "first")).await.unwrap();
        for title in &titles {
            store.update(reminder(&id, title)).await.unwrap();
        }

        // The watch channel keeps only the newest snapshot.
        let latest = subscription.next().await.unwrap();
        let matching: Vec<_> = latest.iter().filter(|r| r.id == id).collect();
        prop_assert_eq!(matching.len(), 1);
        prop_assert_eq!(&matching[0].title, titles.last().unwrap());
    }
}
