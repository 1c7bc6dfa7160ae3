//! Email sending abstraction.
//!
//! Implement [`EmailSender`] to provide delivery for verification mail.
//! [`SmtpEmailSender`] relays through an SMTP server.

use crate::config::CoreConfig;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::{future::Future, time::Duration};
use thiserror::Error;

/// Error type for email sending operations.
#[derive(Debug, Clone, Error)]
pub enum EmailSendError {
    /// Sender or recipient is not a usable mailbox.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Failed to build or deliver the message.
    #[error("email delivery failed: {0}")]
    DeliveryError(String),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    SmtpError(String),
}

/// Trait for async email delivery.
///
/// The `()` implementation is a no-op that silently succeeds.
///
/// # Example
///
/// ```rust,ignore
/// use pasulol_core::{EmailSender, EmailSendError};
///
/// #[derive(Clone)]
/// struct MyEmailService { /* ... */ }
///
/// impl EmailSender for MyEmailService {
///     async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailSendError> {
///         Ok(())
///     }
/// }
/// ```
pub trait EmailSender: Send + Sync + Clone + 'static {
    /// Send one plain-text email and wait for the relay to accept it.
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), EmailSendError>> + Send;
}

/// No-op email sender.
impl EmailSender for () {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), EmailSendError> {
        Ok(())
    }
}

/// SMTP relay sender. Opens a fresh connection for every message.
#[derive(Debug, Clone)]
pub struct SmtpEmailSender {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    from: Mailbox,
    timeout: Duration,
}

impl SmtpEmailSender {
    /// Build a sender from the relay settings in config.
    pub fn from_config(config: &CoreConfig) -> Result<Self, EmailSendError> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| EmailSendError::InvalidAddress(format!("{}: {e}", config.smtp_from)))?;

        let credentials = match (&config.smtp_user, &config.smtp_password) {
            (Some(user), Some(password)) => Some(Credentials::new(user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            credentials,
            from,
            timeout: config.smtp_timeout,
        })
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailSendError> {
        let builder = match self.port {
            // Implicit TLS.
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
                .map_err(|e| EmailSendError::SmtpError(e.to_string()))?,
            // Local relays without TLS.
            25 => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| EmailSendError::SmtpError(e.to_string()))?,
        };

        let builder = builder.port(self.port).timeout(Some(self.timeout));
        let builder = match &self.credentials {
            Some(credentials) => builder.credentials(credentials.clone()),
            None => builder,
        };

        Ok(builder.build())
    }

    fn message_build(&self, to: &str, subject: &str, body: &str) -> Result<Message, EmailSendError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| EmailSendError::InvalidAddress(format!("{to}: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .map_err(|e| EmailSendError::DeliveryError(e.to_string()))
    }
}

impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailSendError> {
        let message = self.message_build(to, subject, body)?;
        let transport = self.transport()?;

        transport
            .send(message)
            .await
            .map_err(|e| EmailSendError::SmtpError(e.to_string()))?;

        tracing::debug!(host = %self.host, port = self.port, "email relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SmtpEmailSender {
        SmtpEmailSender::from_config(&CoreConfig::default()).unwrap()
    }

    #[test]
    fn from_config_rejects_unusable_sender_address() {
        let config = CoreConfig {
            smtp_from: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            SmtpEmailSender::from_config(&config),
            Err(EmailSendError::InvalidAddress(_))
        ));
    }

    #[test]
    fn from_config_keeps_credentials_only_when_complete() {
        let config = CoreConfig {
            smtp_user: Some("mailer".to_string()),
            smtp_password: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(SmtpEmailSender::from_config(&config).unwrap().credentials.is_some());
        assert!(sender().credentials.is_none());
    }

    #[test]
    fn message_build_rejects_bad_recipients() {
        assert!(matches!(
            sender().message_build("nobody", "Subject", "Body"),
            Err(EmailSendError::InvalidAddress(_))
        ));
        assert!(sender().message_build("a@x.com", "Subject", "Body").is_ok());
    }

    #[tokio::test]
    async fn unit_sender_always_succeeds() {
        assert!(().send("a@x.com", "Subject", "Body").await.is_ok());
    }
}
