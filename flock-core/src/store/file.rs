//! 基于本地文件系统的用户存储：每个用户一个 JSON 文件，外加邮箱索引

use super::{reset_hash_matches, CredentialStore, Mutation};
use crate::error::{AuthError, Result};
use crate::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

const INDEX_FILE: &str = "index";

#[derive(Debug)]
pub struct FileStore {
    /// 数据根目录
    data_dir: PathBuf,
    /// 写锁：串行化所有读-改-写操作
    write_lock: Mutex<()>,
}

// ============================================================================
// 构造器与路径
// ============================================================================

impl FileStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// 确保用户目录存在
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.users_dir())?;
        Ok(())
    }

    fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.users_dir().join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.users_dir().join(format!("{}.json", INDEX_FILE))
    }
}

// ============================================================================
// 内部辅助方法
// ============================================================================

impl FileStore {
    /// 用户 ID 只允许 UUID 风格字符，避免路径穿越
    fn validate_id(id: &str) -> Result<()> {
        let valid = !id.is_empty()
            && id != INDEX_FILE
            && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AuthError::NotFound(format!("User not found: {}", id)));
        }
        Ok(())
    }

    /// 先写同目录下唯一命名的临时文件再 rename，避免写到一半的文档
    fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn persist_user(&self, user: &User) -> Result<()> {
        let data = serde_json::to_vec_pretty(user)?;
        Self::write_atomic(&self.user_path(&user.id), &data)
    }

    fn read_user(&self, id: &str) -> Result<Option<User>> {
        Self::validate_id(id)?;
        let path = self.user_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// 加载邮箱 -> ID 索引
    fn load_email_index(&self) -> HashMap<String, String> {
        if let Ok(data) = fs::read(self.index_path()) {
            if let Ok(map) = serde_json::from_slice::<HashMap<String, String>>(&data) {
                return map;
            }
        }
        HashMap::new()
    }

    fn save_email_index(&self, index: &HashMap<String, String>) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)?;
        Self::write_atomic(&self.index_path(), &data)
    }

    /// 全量扫描用户目录
    fn scan_users(&self) -> Result<Vec<User>> {
        self.ensure_dirs()?;
        let mut users = Vec::new();
        for entry in fs::read_dir(self.users_dir())? {
            let path = entry?.path();
            if path.file_stem().map(|s| s == INDEX_FILE).unwrap_or(false) {
                continue;
            }
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let Ok(data) = fs::read(&path) else {
                    continue;
                };
                match serde_json::from_slice::<User>(&data) {
                    Ok(user) => users.push(user),
                    Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable user file"),
                }
            }
        }
        Ok(users)
    }

    /// 优先走索引；索引缺失或过期时回退到全量扫描。
    /// 只读，索引只在持有写锁的路径上写入。
    fn lookup_email(&self, email: &str) -> Result<Option<User>> {
        self.ensure_dirs()?;
        if let Some(id) = self.load_email_index().get(email) {
            if let Some(user) = self.read_user(id)? {
                if user.email == email {
                    return Ok(Some(user));
                }
            }
        }
        Ok(self.scan_users()?.into_iter().find(|u| u.email == email))
    }

    /// 重建邮箱索引，调用方必须持有写锁
    fn rebuild_email_index(&self) -> Result<HashMap<String, String>> {
        let index = self
            .scan_users()?
            .into_iter()
            .map(|u| (u.email, u.id))
            .collect();
        Ok(index)
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: User) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        Self::validate_id(&user.id)?;
        if self.lookup_email(&user.email)?.is_some() {
            return Err(AuthError::UserExists(user.email));
        }
        self.persist_user(&user)?;
        let mut index = self.rebuild_email_index()?;
        index.insert(user.email.clone(), user.id.clone());
        self.save_email_index(&index)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        match self.read_user(id) {
            Err(AuthError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.lookup_email(email)
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        Ok(self
            .scan_users()?
            .into_iter()
            .find(|u| reset_hash_matches(u, token_hash, now)))
    }

    #[instrument(skip(self, mutation))]
    async fn update(&self, id: &str, mutation: Mutation) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        let mut user = self
            .read_user(id)?
            .ok_or_else(|| AuthError::NotFound(format!("User not found: {}", id)))?;
        let previous_email = user.email.clone();
        mutation(&mut user)?;

        if user.email != previous_email {
            if let Some(other) = self.lookup_email(&user.email)? {
                if other.id != user.id {
                    return Err(AuthError::UserExists(user.email));
                }
            }
            self.persist_user(&user)?;
            let mut index = self.rebuild_email_index()?;
            index.remove(&previous_email);
            index.insert(user.email.clone(), user.id.clone());
            self.save_email_index(&index)?;
        } else {
            self.persist_user(&user)?;
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        Self::validate_id(id)?;
        let path = self.user_path(id);
        if !path.exists() {
            return Err(AuthError::NotFound(format!("User not found: {}", id)));
        }
        fs::remove_file(&path)?;
        let mut index = self.load_email_index();
        index.retain(|_, uid| uid != id);
        self.save_email_index(&index)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        self.scan_users()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::user::RevokedToken;
    use chrono::Duration;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email: email.to_string(),
            password_hash: "hash".into(),
            role: Role::Member,
            department: None,
            phone_number: None,
            is_active: true,
            last_login: None,
            reset_password_token_hash: None,
            reset_password_expiry: None,
            revoked_tokens: vec![],
            token_generation: 0,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn users_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(dir.path());
            store.ensure_dirs().unwrap();
            store.insert(user("u-1", "alice@x.com")).await.unwrap();
        }
        let store = FileStore::new(dir.path());
        let found = store.find_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, "u-1");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.insert(user("u-1", "alice@x.com")).await.unwrap();
        let err = store.insert(user("u-2", "alice@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserExists(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn email_change_moves_index_entry() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.insert(user("u-1", "alice@x.com")).await.unwrap();
        store
            .update(
                "u-1",
                Box::new(|u| {
                    u.email = "alice@new.com".into();
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert!(store.find_by_email("alice@x.com").await.unwrap().is_none());
        assert!(store.find_by_email("alice@new.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.insert(user("u-1", "alice@x.com")).await.unwrap();
        let err = store
            .update(
                "u-1",
                Box::new(|u| {
                    u.first_name = "Mallory".into();
                    Err(AuthError::InvalidOrExpiredToken)
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        let stored = store.find_by_id("u-1").await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Alice");
    }

    #[tokio::test]
    async fn reset_lookup_honours_expiry() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let mut u = user("u-1", "alice@x.com");
        u.reset_password_token_hash = Some("abc".into());
        u.reset_password_expiry = Some(Utc::now() + Duration::minutes(10));
        store.insert(u).await.unwrap();

        let now = Utc::now();
        assert!(store.find_by_reset_token_hash("abc", now).await.unwrap().is_some());
        assert!(store.find_by_reset_token_hash("abd", now).await.unwrap().is_none());
        let later = now + Duration::minutes(11);
        assert!(store.find_by_reset_token_hash("abc", later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn path_like_ids_are_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.find_by_id("../etc/passwd").await.unwrap().is_none());
        assert!(store.find_by_id("index").await.unwrap().is_none());
        assert!(matches!(
            store.delete("../x").await.unwrap_err(),
            AuthError::NotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lookups_during_insert_never_break_the_write() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        for i in 0..20 {
            store
                .insert(user(&format!("seed-{i}"), &format!("seed{i}@x.com")))
                .await
                .unwrap();
        }

        for round in 0..50 {
            // 索引缺失时读路径会走全量扫描
            let _ = fs::remove_file(store.index_path());
            let mut readers = Vec::new();
            for i in 0..6 {
                let store = store.clone();
                readers.push(tokio::spawn(async move {
                    store
                        .find_by_email(&format!("seed{}@x.com", i % 20))
                        .await
                        .unwrap()
                }));
            }
            let id = format!("new-{round}");
            let email = format!("new{round}@x.com");
            store.insert(user(&id, &email)).await.unwrap();
            for reader in readers {
                assert!(reader.await.unwrap().is_some());
            }
            assert_eq!(store.find_by_email(&email).await.unwrap().unwrap().id, id);
        }

        let leftovers: Vec<_> = fs::read_dir(store.users_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x != "json").unwrap_or(true))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(store.list().await.unwrap().len(), 70);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revocations_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        store.insert(user("u-1", "alice@x.com")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        "u-1",
                        Box::new(move |u| {
                            u.revoked_tokens.push(RevokedToken {
                                token_hash: format!("hash-{i}"),
                                revoked_at: Utc::now(),
                            });
                            Ok(())
                        }),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = FileStore::new(dir.path());
        let stored = reopened.find_by_id("u-1").await.unwrap().unwrap();
        assert_eq!(stored.revoked_tokens.len(), 16);
        for i in 0..16 {
            let hash = format!("hash-{i}");
            assert!(stored.revoked_tokens.iter().any(|r| r.token_hash == hash));
        }
    }
}
