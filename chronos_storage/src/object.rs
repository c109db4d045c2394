use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` at `path` and returns a durable download URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError>;
}

/// Upload path for a reminder image, namespaced by a random identifier.
pub fn image_path() -> String {
    format!("reminder_images/{}", Uuid::new_v4())
}

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(StoreError::PermissionDenied(format!(
                "object path {path:?} escapes the store"
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;

        let absolute = tokio::fs::canonicalize(&target).await?;
        log::info!("Uploaded {} bytes to {}", bytes.len(), absolute.display());

        Ok(format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let url = store
            .upload("reminder_images/abc", b"png".to_vec())
            .await
            .unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("reminder_images/abc"));
        let written = std::fs::read(dir.path().join("reminder_images/abc")).unwrap();
        assert_eq!(written, b"png");
    }

    #[tokio::test]
    async fn paths_escaping_root_are_denied() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let result = store.upload("../outside", b"x".to_vec()).await;

        assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
    }

    #[test]
    fn image_paths_are_unique_and_namespaced() {
        let first = image_path();
        let second = image_path();

        assert!(first.starts_with("reminder_images/"));
        assert_ne!(first, second);
    }
}
