//! Bearer token 签发与验签（不检查撤销状态）

use super::models::{TokenClaims, User};
use crate::error::{AuthError, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_JWT_ISSUER: &str = "flock-api";
pub const DEFAULT_JWT_AUDIENCE: &str = "flock-clients";

/// Token 签名算法抽象
pub trait TokenSigner: Send + Sync {
    fn sign(&self, claims: &TokenClaims) -> Result<String>;
    /// 签名或载荷无效时返回 Unauthenticated
    fn verify(&self, token: &str) -> Result<TokenClaims>;
}

/// HS256 JWT 实现，不带 exp
#[derive(Clone)]
pub struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl JwtSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: DEFAULT_JWT_ISSUER.to_string(),
            audience: DEFAULT_JWT_AUDIENCE.to_string(),
        }
    }

    /// 配置 JWT iss/aud
    pub fn with_claims_context(
        mut self,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        self.issuer = issuer.into();
        self.audience = audience.into();
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // 永久 token：不要求也不校验 exp
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        validation
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &TokenClaims) -> Result<String> {
        let mut claims = claims.clone();
        claims.iss = Some(self.issuer.clone());
        claims.aud = Some(self.audience.clone());
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Other(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| AuthError::unauthenticated(format!("invalid token: {}", e)))
    }
}

/// Token 服务：无状态签发 / 验签
#[derive(Clone)]
pub struct TokenService {
    signer: Arc<dyn TokenSigner>,
}

impl TokenService {
    pub fn new(signer: Arc<dyn TokenSigner>) -> Self {
        Self { signer }
    }

    /// 为用户签发 token（绑定用户 ID 与当前代数）
    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = TokenClaims {
            sub: user.id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            gen: user.token_generation,
            iat: Utc::now().timestamp(),
            iss: None,
            aud: None,
        };
        self.signer.sign(&claims)
    }

    /// 仅验签；撤销检查由 UserManager::authenticate 负责
    pub fn validate(&self, token: &str) -> Result<TokenClaims> {
        let claims = self.signer.verify(token)?;
        if claims.sub.is_empty() {
            return Err(AuthError::unauthenticated("invalid token: empty subject"));
        }
        Ok(claims)
    }
}
