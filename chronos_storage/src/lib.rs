pub mod auth;
pub mod document;
pub mod error;
pub mod memory;
pub mod object;
pub mod reminder;
pub mod sqlite;

pub use auth::{AuthProvider, InMemoryAuthProvider};
pub use document::{Document, DocumentListener, DocumentStore};
pub use error::{AuthError, StoreError};
pub use memory::InMemoryDocumentStore;
pub use object::{LocalObjectStore, ObjectStore, image_path};
pub use reminder::{DocumentReminderStore, ReminderStore, ReminderSubscription};
