mod app;

use anyhow::Context;
use app::{app_router, AppState, RateLimiter};
use dotenvy::dotenv;
use flock_core::user::{
    DEFAULT_BCRYPT_COST, DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_ISSUER, DEFAULT_RESET_TOKEN_TTL_SECS,
};
use flock_core::{
    BcryptHasher, DisabledMailer, EmailDispatcher, FileStore, JwtSigner, SmtpConfig, SmtpMailer,
    TokenService, UserManager,
};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    data_dir: PathBuf,
    /// JWT 签名密钥
    jwt_secret: String,
    /// JWT iss
    jwt_issuer: String,
    /// JWT aud
    jwt_audience: String,
    /// 重置链接前缀，未配置时从请求 Host 头推导
    public_url: Option<String>,
    reset_ttl_secs: i64,
    bcrypt_cost: u32,
    /// CORS 允许的来源列表（空则允许所有）
    cors_origins: Vec<String>,
    /// 是否采信反向代理写入的客户端 IP 头
    trust_proxy: bool,
    /// 未配置 SMTP_HOST 时为 None，邮件发送一律失败
    smtp: Option<SmtpConfig>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        _ => Ok(default),
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ApiConfig {
    fn from_env() -> anyhow::Result<Self> {
        let bind = env_parse("FLOCK_BIND", SocketAddr::from(([0, 0, 0, 0], 5000)))?;

        let data_dir = env_string("FLOCK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let jwt_secret = env_string("FLOCK_JWT_SECRET").unwrap_or_else(|| {
            warn!("FLOCK_JWT_SECRET not set; generating a random secret for this run");
            uuid::Uuid::new_v4().to_string()
        });
        let jwt_issuer = env_string("FLOCK_JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.into());
        let jwt_audience =
            env_string("FLOCK_JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.into());

        let public_url = match env_string("FLOCK_PUBLIC_URL") {
            Some(raw) => {
                let parsed = url::Url::parse(&raw).context("invalid FLOCK_PUBLIC_URL")?;
                Some(parsed.as_str().trim_end_matches('/').to_string())
            }
            None => None,
        };

        let reset_ttl_secs = env_parse("FLOCK_RESET_TTL_SECS", DEFAULT_RESET_TOKEN_TTL_SECS)?;
        let bcrypt_cost = env_parse("FLOCK_BCRYPT_COST", DEFAULT_BCRYPT_COST)?;

        // CORS 允许的来源，逗号分隔；空或 "*" 表示允许所有
        let cors_origins = env_string("FLOCK_CORS_ORIGINS")
            .filter(|s| s != "*")
            .map(|s| {
                s.split(',')
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| t.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let trust_proxy = env_parse("FLOCK_TRUST_PROXY", false)?;

        let smtp = match env_string("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", 587u16)?,
                username: env_string("SMTP_USERNAME").unwrap_or_default(),
                password: env_string("SMTP_PASSWORD").unwrap_or_default(),
                from_name: env_string("FROM_NAME").unwrap_or_else(|| "Church App".into()),
                from_email: env_string("FROM_EMAIL")
                    .context("FROM_EMAIL is required when SMTP_HOST is set")?,
            }),
            None => None,
        };

        Ok(Self {
            bind,
            data_dir,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            public_url,
            reset_ttl_secs,
            bcrypt_cost,
            cors_origins,
            trust_proxy,
            smtp,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    init_tracing();

    let config = ApiConfig::from_env()?;
    info!("starting API on {}", config.bind);

    let store = Arc::new(FileStore::new(&config.data_dir));
    store.ensure_dirs()?;

    let signer = JwtSigner::new(&config.jwt_secret)
        .with_claims_context(config.jwt_issuer.clone(), config.jwt_audience.clone());

    let mailer: Arc<dyn EmailDispatcher> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            warn!("SMTP_HOST not set; password reset emails will fail");
            Arc::new(DisabledMailer)
        }
    };

    let users = Arc::new(
        UserManager::new(
            store,
            Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            TokenService::new(Arc::new(signer)),
            mailer,
        )
        .with_reset_ttl(chrono::Duration::seconds(config.reset_ttl_secs)),
    );

    let state = AppState {
        users,
        public_url: config.public_url.clone(),
        login_limiter: Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
        reset_limiter: Arc::new(RateLimiter::new(5, Duration::from_secs(15 * 60))),
        auth_limiter: Arc::new(RateLimiter::new(60, Duration::from_secs(60))),
        trust_proxy: config.trust_proxy,
    };

    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
