//! 凭据存储：认证核心中唯一的共享可变资源
//!
//! 所有修改都经过 [`CredentialStore::update`]，闭包在存储的写锁下
//! 作为一次完整的读-改-写执行，同一用户的并发撤销不会丢失条目。

mod file;
mod memory;

use crate::error::Result;
use crate::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use file::FileStore;
pub use memory::MemoryStore;

/// 对单个用户文档的原子修改；返回错误时放弃写入
pub type Mutation = Box<dyn FnOnce(&mut User) -> Result<()> + Send>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 插入新用户；邮箱已被占用时返回 `UserExists`
    async fn insert(&self, user: User) -> Result<User>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// 查找持有该重置 token 哈希且未过期（晚于 `now`）的用户
    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    /// 对已存储用户应用 `mutation` 并持久化。
    /// 未知 ID 返回 `NotFound`；修改后的邮箱属于其他用户时返回 `UserExists`
    async fn update(&self, id: &str, mutation: Mutation) -> Result<User>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn list(&self) -> Result<Vec<User>>;
}

pub(crate) fn reset_hash_matches(user: &User, token_hash: &str, now: DateTime<Utc>) -> bool {
    match (&user.reset_password_token_hash, user.reset_password_expiry) {
        (Some(stored), Some(expiry)) => {
            expiry > now && crate::user::crypto::digest_eq(stored, token_hash)
        }
        _ => false,
    }
}
