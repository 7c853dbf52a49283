//! In-process store backed by `RwLock`ed maps.

use super::{RefreshTokenStore, StoreError, UserStore};
use crate::models::{NewRefreshToken, NewUser, RefreshToken, User};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    refresh_tokens: RwLock<Vec<RefreshToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Move the stored expiry of every token of a user
    #[cfg(test)]
    pub(crate) async fn set_token_expiry(
        &self,
        user_id: Uuid,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) {
        for token in self
            .refresh_tokens
            .write()
            .await
            .iter_mut()
            .filter(|t| t.user_id == user_id)
        {
            token.expires_at = expires_at;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        // Checked under the write lock so concurrent inserts cannot both pass
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }

        let user = user.into_user();
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshToken, StoreError> {
        let token = token.into_token();
        self.refresh_tokens.write().await.push(token.clone());
        Ok(token)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, StoreError> {
        Ok(self
            .refresh_tokens
            .read()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_all_by_user_id(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Guest,
            active: true,
        }
    }

    fn new_token(user_id: Uuid) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token_hash: "hash".to_string(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let store = MemoryStore::new();
        let user = assert_ok!(UserStore::create(&store, new_user("ada@example.com")).await);

        let by_email = assert_ok!(store.find_by_email("ada@example.com").await);
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        let by_id = assert_ok!(store.find_by_id(user.id).await);
        assert_eq!(by_id.map(|u| u.email), Some("ada@example.com".to_string()));

        assert!(assert_ok!(store.find_by_id(Uuid::new_v4()).await).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        assert_ok!(UserStore::create(&store, new_user("ada@example.com")).await);

        let err = assert_err!(UserStore::create(&store, new_user("ada@example.com")).await);
        assert!(matches!(err, StoreError::Duplicate("email")));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    UserStore::create(store.as_ref(), new_user("race@example.com")).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_tokens_per_user() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert_ok!(RefreshTokenStore::create(&store, new_token(alice)).await);
        assert_ok!(RefreshTokenStore::create(&store, new_token(alice)).await);
        assert_ok!(RefreshTokenStore::create(&store, new_token(bob)).await);

        assert_eq!(assert_ok!(store.find_by_user_id(alice).await).len(), 2);

        let deleted = assert_ok!(store.delete_all_by_user_id(alice).await);
        assert_eq!(deleted, 2);
        assert!(assert_ok!(store.find_by_user_id(alice).await).is_empty());
        assert_eq!(assert_ok!(store.find_by_user_id(bob).await).len(), 1);
    }
}
