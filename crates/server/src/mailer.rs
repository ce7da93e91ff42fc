//! Outbound mail through an HTTP relay. The recipient is fixed by
//! configuration; the router never chooses who a civic email goes to.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::info;
use urbanbot_core::config::EmailConfig;
use urbanbot_core::Mailer;

const RELAY_TIMEOUT_SECS: u64 = 30;

pub struct MailRelay {
    client: Client,
    endpoint: String,
    api_token: Option<SecretString>,
    sender: String,
    recipient: String,
}

impl MailRelay {
    /// Returns `None` when no relay endpoint is configured; the caller
    /// wires in a `DisabledMailer` instead.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(endpoint) = config.relay_endpoint.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(RELAY_TIMEOUT_SECS))
            .build()?;

        Ok(Some(Self {
            client,
            endpoint,
            api_token: config.api_token.clone(),
            sender: config.sender.clone(),
            recipient: config.recipient.clone(),
        }))
    }

    fn payload(&self, subject: &str, body: &str) -> Value {
        json!({
            "from": self.sender,
            "to": self.recipient,
            "subject": subject,
            "text": body,
        })
    }
}

#[async_trait]
impl Mailer for MailRelay {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&self.payload(subject, body));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        request
            .send()
            .await
            .context("mail relay request failed")?
            .error_for_status()
            .context("mail relay rejected the message")?;

        info!(event_name = "mail.relayed", recipient = %self.recipient, "email relayed");
        Ok(())
    }
}

/// Stands in when no relay endpoint is configured: every send fails with
/// an actionable message instead of silently dropping the email.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _subject: &str, _body: &str) -> Result<()> {
        bail!("email relay is not configured; set email.relay_endpoint in urbanbot.toml")
    }
}
