use super::{reset_hash_matches, CredentialStore, Mutation};
use crate::error::{AuthError, Result};
use crate::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 进程内存储，以用户 ID 为键
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::UserExists(user.email));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| reset_hash_matches(u, token_hash, now))
            .cloned())
    }

    async fn update(&self, id: &str, mutation: Mutation) -> Result<User> {
        let mut users = self.users.write().await;
        let mut user = users
            .get(id)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(format!("User not found: {}", id)))?;
        mutation(&mut user)?;
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(AuthError::UserExists(user.email));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.users
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AuthError::NotFound(format!("User not found: {}", id)))
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }
}
