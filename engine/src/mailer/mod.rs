//! Transactional email delivery
//!
//! `HttpMailer` posts to a Resend-style `/emails` endpoint. `LogMailer` is
//! used when email is disabled in config: it logs what would have been sent
//! and reports success, so reminder bookkeeping works the same in both modes.

use async_trait::async_trait;
use sdk::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::secrets::{scrub_secrets, SecretStore, EMAIL_API_KEY};

/// Plain-text email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Email delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, email: &Email) -> Result<(), AppError>;
}

/// Pick the mailer for a config
pub fn from_config(config: &EmailConfig, secrets: SecretStore) -> Arc<dyn Mailer> {
    if config.enabled {
        Arc::new(HttpMailer::new(config.clone(), secrets))
    } else {
        Arc::new(LogMailer)
    }
}

/// HTTP email API client
pub struct HttpMailer {
    config: EmailConfig,
    secrets: SecretStore,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(config: EmailConfig, secrets: SecretStore) -> Self {
        Self {
            config,
            secrets,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, email: &Email) -> Result<(), AppError> {
        let api_key = self.secrets.get(EMAIL_API_KEY)?;
        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));

        let payload = json!({
            "from": self.config.from_address,
            "to": [email.to],
            "subject": email.subject,
            "text": email.text,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = scrub_secrets(&response.text().await.unwrap_or_default());
            warn!(status, "Email API rejected message");
            return Err(AppError::Email(format!("HTTP {}: {}", status, body)));
        }

        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Mailer that only logs
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &Email) -> Result<(), AppError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            "Email delivery disabled; logging message instead"
        );
        Ok(())
    }
}
