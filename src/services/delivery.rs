//! Outbound email/SMS delivery seams.
//!
//! Delivery is fire-and-forget from the engine's perspective: flows spawn
//! sends and log failures, never propagating them to the caller. The SMTP
//! implementation performs the blocking send on the blocking thread pool.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), anyhow::Error>;
}

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_sms(&self, phone: &str, body: &str) -> Result<(), anyhow::Error>;
}

/// SMTP-backed email delivery.
#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from_address: String,
}

impl SmtpEmailService {
    pub fn new(
        relay: &str,
        username: String,
        password: String,
        from_address: String,
    ) -> Result<Self, anyhow::Error> {
        let mailer = SmtpTransport::relay(relay)
            .map_err(|e| anyhow::anyhow!("failed to configure SMTP relay: {e}"))?
            .credentials(Credentials::new(username, password))
            .timeout(Some(Duration::from_secs(10)))
            .build();
        tracing::info!(relay, "email service initialised");
        Ok(Self {
            mailer,
            from_address,
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), anyhow::Error> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        // Blocking transport; keep it off the async runtime.
        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| anyhow::anyhow!("email send task failed: {e}"))??;

        tracing::info!(to, subject, "email sent");
        Ok(())
    }
}

/// Captures sent emails for inspection in tests.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Captures sent text messages for inspection in tests.
#[derive(Default)]
pub struct MockSmsService {
    sent: Mutex<Vec<(String, String)>>,
}

impl MockSmsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SmsProvider for MockSmsService {
    async fn send_sms(&self, phone: &str, body: &str) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((phone.to_string(), body.to_string()));
        Ok(())
    }
}
