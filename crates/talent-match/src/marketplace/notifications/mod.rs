//! Transactional email notifications.
//!
//! [`NotificationSender`] renders a template, derives the provider idempotency
//! key, and hands the message to an [`EmailTransport`]. State-change flows use
//! [`NotificationSender::dispatch`], which runs the send on a detached task so
//! a slow or failing provider never affects the triggering request.

pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::marketplace::domain::Locale;
pub use templates::{render, RenderedEmail, TemplateKey, TemplateVariables};

/// Fully rendered message handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub template: TemplateKey,
    pub locale: Locale,
    pub idempotency_key: String,
}

/// Provider-facing half of the notification pipeline.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn deliver(&self, email: OutboundEmail) -> Result<(), SendError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// Credentials are missing; raised before any network traffic.
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("email provider call failed (status {status:?}): {message}")]
    Provider { status: Option<u16>, message: String },
    #[error("email template failed to render: {0}")]
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub first_name: String,
}

/// One logical notification event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub template: TemplateKey,
    pub recipient: Recipient,
    pub locale: Locale,
    pub variables: TemplateVariables,
    /// Entity the event concerns, e.g. the talent id.
    pub entity_id: String,
    /// Distinguishes events of the same template for one entity, e.g. the new
    /// status and when it was written. Part of the idempotency key.
    pub event: String,
}

impl Notification {
    pub fn new(template: TemplateKey, recipient: Recipient, entity_id: impl Into<String>) -> Self {
        Self {
            template,
            recipient,
            locale: Locale::En,
            variables: TemplateVariables::new(),
            entity_id: entity_id.into(),
            event: String::new(),
        }
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn variable(mut self, name: &str, value: impl Into<String>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Hex SHA-256 over template, event, and entity id.
    pub fn idempotency_key(&self) -> String {
        idempotency_key(self.template, &self.event, &self.entity_id)
    }
}

pub fn idempotency_key(template: TemplateKey, event: &str, entity_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(template.label().as_bytes());
    hasher.update([0]);
    hasher.update(event.as_bytes());
    hasher.update([0]);
    hasher.update(entity_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Renders notifications and delivers them through the configured transport.
#[derive(Clone)]
pub struct NotificationSender {
    transport: Arc<dyn EmailTransport>,
}

impl NotificationSender {
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }

    pub fn compose(notification: &Notification) -> Result<OutboundEmail, SendError> {
        let (locale, rendered) = render(
            notification.template,
            notification.locale,
            &notification.recipient.first_name,
            &notification.variables,
        )
        .map_err(|err| SendError::Template(err.to_string()))?;
        Ok(OutboundEmail {
            to: notification.recipient.email.clone(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
            template: notification.template,
            locale,
            idempotency_key: notification.idempotency_key(),
        })
    }

    /// Sends inline and reports the typed outcome.
    pub async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let email = Self::compose(notification)?;
        self.transport.deliver(email).await
    }

    /// Launches the send on a detached task. Failures are logged and never
    /// retried. Callers on a request path must not await the handle; it is
    /// returned so in-process callers can wait for delivery when they need to.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let sender = self.clone();
        tokio::spawn(async move {
            match sender.send(&notification).await {
                Ok(()) => debug!(
                    template = %notification.template,
                    entity_id = %notification.entity_id,
                    "notification delivered"
                ),
                Err(SendError::Config(err)) => warn!(
                    template = %notification.template,
                    entity_id = %notification.entity_id,
                    error = %err,
                    "notification skipped: email provider not configured"
                ),
                Err(err) => warn!(
                    template = %notification.template,
                    entity_id = %notification.entity_id,
                    error = %err,
                    "notification delivery failed"
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        emails: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl EmailTransport for Capture {
        async fn deliver(&self, email: OutboundEmail) -> Result<(), SendError> {
            self.emails.lock().expect("capture mutex poisoned").push(email);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl EmailTransport for Broken {
        async fn deliver(&self, _email: OutboundEmail) -> Result<(), SendError> {
            Err(SendError::Provider {
                status: Some(502),
                message: "bad gateway".to_string(),
            })
        }
    }

    fn status_notification(status: &str) -> Notification {
        Notification::new(
            TemplateKey::TalentStatusChanged,
            Recipient {
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
            },
            "talent-1",
        )
        .event(status)
        .variable("status", status)
    }

    #[test]
    fn idempotency_key_is_deterministic_per_event() {
        let first = status_notification("interviewing").idempotency_key();
        let again = status_notification("interviewing").idempotency_key();
        let other = status_notification("training").idempotency_key();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.len(), 64);
        assert_ne!(
            idempotency_key(TemplateKey::TalentStatusChanged, "a", "bc"),
            idempotency_key(TemplateKey::TalentStatusChanged, "ab", "c"),
        );
    }

    #[tokio::test]
    async fn send_delivers_rendered_email() {
        let capture = Arc::new(Capture::default());
        let sender = NotificationSender::new(capture.clone());

        sender
            .send(&status_notification("interviewing"))
            .await
            .expect("send succeeds");

        let emails = capture.emails.lock().expect("capture mutex poisoned");
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "ada@example.com");
        assert_eq!(emails[0].template, TemplateKey::TalentStatusChanged);
        assert_eq!(emails[0].subject, "Your application status: Interviewing");
    }

    #[test]
    fn compose_renders_html_and_text_from_the_variables() {
        let email = NotificationSender::compose(&status_notification("pending_matching"))
            .expect("composes");
        assert_eq!(email.subject, "Your application status: Pending matching");
        assert!(email.html.contains("<p>Hi Ada,</p>"));
        assert!(email.text.starts_with("Hi Ada,\n\n"));
        assert_eq!(email.idempotency_key, status_notification("pending_matching").idempotency_key());
    }

    #[tokio::test]
    async fn dispatch_swallows_provider_failures() {
        let sender = NotificationSender::new(Arc::new(Broken));
        let handle = sender.dispatch(status_notification("matched"));
        handle.await.expect("dispatch task completes without panicking");
    }

    #[tokio::test]
    async fn send_returns_typed_provider_error() {
        let sender = NotificationSender::new(Arc::new(Broken));
        match sender.send(&status_notification("matched")).await {
            Err(SendError::Provider { status, .. }) => assert_eq!(status, Some(502)),
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
