pub mod document_store;

pub use document_store::SqliteDocumentStore;
pub use sqlx;
