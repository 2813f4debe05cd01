use super::crypto::CredentialHasher;
use super::models::RegisterRequest;
use super::token::{JwtSigner, TokenService};
use super::UserManager;
use crate::error::Result;
use crate::mailer::MemoryMailer;
use crate::store::MemoryStore;
use async_trait::async_trait;
use std::sync::Arc;

/// 测试用哈希器，避免 bcrypt 的开销
pub(crate) struct PlainHasher;

#[async_trait]
impl CredentialHasher for PlainHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        Ok(format!("plain${}", password.chars().rev().collect::<String>()))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(self.hash(password).await? == hash)
    }
}

pub(crate) fn manager() -> (UserManager, Arc<MemoryStore>, Arc<MemoryMailer>) {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MemoryMailer::new());
    let tokens = TokenService::new(Arc::new(JwtSigner::new("test-secret")));
    let manager = UserManager::new(store.clone(), Arc::new(PlainHasher), tokens, mailer.clone());
    (manager, store, mailer)
}

pub(crate) fn alice() -> RegisterRequest {
    RegisterRequest {
        first_name: "Alice".into(),
        last_name: "Smith".into(),
        email: "alice@x.com".into(),
        password: "pw123456".into(),
        ..Default::default()
    }
}
