use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("The identity provider rejected the sign-in token")]
    InvalidToken,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Store is unreachable: {0}")]
    Network(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Reminder has no identifier")]
    MissingId,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
