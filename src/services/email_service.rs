use async_trait::async_trait;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

/// Posts messages as JSON to a transactional mail API.
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpEmailSender {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let mut request = self.client.post(&self.api_url).json(&message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Mail API rejected message to {}: {} {}", message.to, status, body);
            return Err(AppError::Upstream(format!("Mail API error: {}", status)));
        }

        log::info!("📧 Email sent to {}", message.to);
        Ok(())
    }
}

/// Development sender: writes the message to the log instead of mailing it.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        log::warn!(
            "📧 No mail API configured; email to {} ({}):\n{}",
            message.to,
            message.subject,
            message.text
        );
        Ok(())
    }
}

pub fn sender_from_config(config: &EmailConfig) -> Box<dyn EmailSender> {
    match &config.api_url {
        Some(url) => Box::new(HttpEmailSender::new(url.clone(), config.api_key.clone())),
        None => Box::new(LogEmailSender),
    }
}

pub fn otp_email(from: &str, to: &str, otp: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Your ASHA Health verification code".to_string(),
        text: format!(
            "Your verification code is {}. It expires in {} minutes.",
            otp, ttl_minutes
        ),
        html: format!(
            "<p>Your verification code is <strong>{}</strong>.</p><p>It expires in {} minutes.</p>",
            otp, ttl_minutes
        ),
    }
}
