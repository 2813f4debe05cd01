//! 密码哈希与一次性 token 工具函数

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use bcrypt::{hash, verify};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 密码哈希算法抽象
#[async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String>;
    async fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// 默认 bcrypt cost
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// bcrypt 实现（在阻塞线程中执行）
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

#[async_trait]
impl CredentialHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| AuthError::Other(format!("spawn_blocking failed: {}", e)))?
            .map_err(|e| AuthError::Other(format!("bcrypt hash failed: {}", e)))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Other(format!("spawn_blocking failed: {}", e)))?
            .map_err(|e| AuthError::Other(format!("bcrypt verify failed: {}", e)))
    }
}

/// SHA-256 摘要（hex），用于 reset token 与撤销列表
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// 生成随机 reset token，返回 (明文, 摘要)
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let digest = sha256_hex(&plaintext);
    (plaintext, digest)
}

/// 常量时间比较两个摘要
pub fn digest_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_token_digest_matches_plaintext() {
        let (plain, digest) = generate_reset_token();
        assert_eq!(plain.len(), 40);
        assert_eq!(sha256_hex(&plain), digest);
        assert_ne!(plain, digest);
    }

    #[test]
    fn reset_tokens_are_unique() {
        let (a, _) = generate_reset_token();
        let (b, _) = generate_reset_token();
        assert_ne!(a, b);
    }

    #[test]
    fn digest_eq_compares_contents() {
        assert!(digest_eq("abc", "abc"));
        assert!(!digest_eq("abc", "abd"));
        assert!(!digest_eq("abc", "abcd"));
    }

    #[tokio::test]
    async fn bcrypt_round_trip() {
        let hasher = BcryptHasher::new(4);
        let hashed = hasher.hash("pw123456").await.unwrap();
        assert_ne!(hashed, "pw123456");
        assert!(hasher.verify("pw123456", &hashed).await.unwrap());
        assert!(!hasher.verify("wrong", &hashed).await.unwrap());
    }
}
