use std::collections::HashMap;

use async_trait::async_trait;
use chronos_models::{settings::AccountSettings, user::User};
use tokio::sync::RwLock;

use crate::error::AuthError;

/// Federated identity provider. A provider token is exchanged for a session
/// that scopes every store access.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Option<User>;
    async fn sign_in_with_token(&self, token: &str) -> Result<User, AuthError>;
    async fn sign_out(&self);
}

pub struct InMemoryAuthProvider {
    accounts: HashMap<String, User>,
    session: RwLock<Option<User>>,
}

impl InMemoryAuthProvider {
    pub fn new(accounts: impl IntoIterator<Item = (String, User)>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
            session: RwLock::new(None),
        }
    }

    pub fn from_settings(accounts: &[AccountSettings]) -> Self {
        Self::new(accounts.iter().map(|account| {
            let user = User {
                id: account.uid.clone(),
                display_name: account.display_name.clone(),
                email: account.email.clone(),
            };
            (account.token.clone(), user)
        }))
    }

    /// Provider with a session already established, without going through a token.
    pub fn signed_in(user: User) -> Self {
        Self {
            accounts: HashMap::new(),
            session: RwLock::new(Some(user)),
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn current_user(&self) -> Option<User> {
        self.session.read().await.clone()
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<User, AuthError> {
        let user = self
            .accounts
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;

        log::info!("Signed in user {}", user.id);
        *self.session.write().await = Some(user.clone());

        Ok(user)
    }

    async fn sign_out(&self) {
        if let Some(user) = self.session.write().await.take() {
            log::info!("Signed out user {}", user.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> InMemoryAuthProvider {
        InMemoryAuthProvider::new([(
            "google-token".to_string(),
            User {
                id: "uid-1".to_string(),
                display_name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
            },
        )])
    }

    #[tokio::test]
    async fn known_token_establishes_session() {
        let auth = provider();

        let user = auth.sign_in_with_token("google-token").await.unwrap();

        assert_eq!(user.id, "uid-1");
        assert_eq!(auth.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let auth = provider();

        let result = auth.sign_in_with_token("forged").await;

        assert!(matches!(result, Err(AuthError::InvalidToken)));
        assert_eq!(auth.current_user().await, None);
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let auth = provider();
        auth.sign_in_with_token("google-token").await.unwrap();

        auth.sign_out().await;

        assert_eq!(auth.current_user().await, None);
    }
}
