use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::EmailConfig;
use crate::marketplace::notifications::{EmailTransport, OutboundEmail, SendError};

/// Transactional email over the provider's `POST /emails` endpoint.
#[derive(Clone)]
pub struct ResendTransport {
    client: Client,
    config: EmailConfig,
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl ResendTransport {
    pub fn new(config: EmailConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: EmailConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    async fn deliver(&self, email: OutboundEmail) -> Result<(), SendError> {
        let api_key = self.config.api_key()?;
        let url = format!("{}/emails", self.config.api_url.trim_end_matches('/'));
        let payload = EmailPayload {
            from: &self.config.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .header("Idempotency-Key", &email.idempotency_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SendError::Provider {
                status: None,
                message: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %email.to, template = %email.template, "email accepted by provider");
            return Ok(());
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|err| format!("unreadable error body: {err}"));
        Err(SendError::Provider {
            status: Some(status.as_u16()),
            message,
        })
    }
}
