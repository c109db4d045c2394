use crate::{document::Document, error::StoreError};

#[derive(sqlx::FromRow)]
pub struct DocumentStorageModel {
    pub id: String,
    pub data: String,
}

impl TryFrom<DocumentStorageModel> for Document {
    type Error = StoreError;

    fn try_from(value: DocumentStorageModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            data: serde_json::from_str(&value.data)?,
        })
    }
}
