//! 外发邮件

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Mutex;
use tracing::{info, warn};

/// 一封 HTML 邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// 发送邮件；任何失败都报告为 `DeliveryFailure`
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// SMTP 配置，通常从环境变量读取
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_email: String,
}

/// 通过带认证的 STARTTLS 中继发送
#[derive(Clone)]
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AuthError::Other(format!("invalid from address: {}", e)))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AuthError::Other(format!("SMTP setup failed: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { from, transport })
    }
}

#[async_trait]
impl EmailDispatcher for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AuthError::DeliveryFailure(format!("invalid recipient: {}", e)))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| AuthError::DeliveryFailure(format!("failed to build email: {}", e)))?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| AuthError::DeliveryFailure(e.to_string()))?;
        info!(to = %message.to, subject = %message.subject, code = %response.code(), "email sent");
        Ok(())
    }
}

/// 未配置 SMTP 时使用，发送一律失败
#[derive(Debug, Clone, Default)]
pub struct DisabledMailer;

#[async_trait]
impl EmailDispatcher for DisabledMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        warn!(to = %message.to, "email transport not configured, dropping message");
        Err(AuthError::DeliveryFailure(
            "email delivery is not configured".into(),
        ))
    }
}

/// 将已发送邮件保存在内存中，可切换为发送失败
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<EmailMessage>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<EmailMessage> {
        self.sent().pop()
    }
}

#[async_trait]
impl EmailDispatcher for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AuthError::DeliveryFailure("simulated SMTP outage".into()));
        }
        self.outbox
            .lock()
            .map_err(|_| AuthError::Other("outbox lock poisoned".into()))?
            .push(message);
        Ok(())
    }
}
