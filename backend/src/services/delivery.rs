//! Report delivery by email.
//!
//! [`Mailer`] is the seam the report job sends through; [`SmtpMailer`] is the
//! production implementation on top of an implicit-TLS SMTP relay.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;

/// MIME type of XLSX workbooks.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A message ready to be sent to every recipient at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid email address '{address}': {message}")]
    Address { address: String, message: String },
    #[error("Failed to build message: {0}")]
    Message(String),
    #[error("SMTP error: {0}")]
    Transport(String),
    #[error("SMTP delivery timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message. An empty recipient list sends nothing.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

fn parse_address(value: &str) -> Result<Address, DeliveryError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| DeliveryError::Address {
            address: value.to_string(),
            message: e.to_string(),
        })
}

/// SMTP mailer authenticating as the configured sender.
pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    /// Build the MIME message: plain-text body plus the attachment, all
    /// recipients in one To header.
    pub fn build_message(&self, mail: &OutgoingMail) -> Result<Message, DeliveryError> {
        let from = Mailbox::new(
            Some(self.settings.sender_name.clone()),
            parse_address(&self.settings.user)?,
        );

        let mut builder = Message::builder().from(from).subject(mail.subject.as_str());
        for recipient in &mail.recipients {
            builder = builder.to(Mailbox::new(None, parse_address(recipient)?));
        }

        let content_type = ContentType::parse(&mail.attachment.content_type)
            .map_err(|e| DeliveryError::Message(e.to_string()))?;
        let attachment = MailAttachment::new(mail.attachment.filename.clone())
            .body(mail.attachment.bytes.clone(), content_type);

        builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|e| DeliveryError::Message(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.server)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.user.clone(),
                self.settings.password.clone(),
            ))
            .timeout(Some(self.settings.timeout))
            .build();
        Ok(transport)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        if mail.recipients.is_empty() {
            log::info!("No recipients for '{}', nothing sent", mail.subject);
            return Ok(());
        }

        let message = self.build_message(mail)?;
        let transport = self.transport()?;

        log::info!(
            "Sending '{}' to {} recipient(s) via {}:{}",
            mail.subject,
            mail.recipients.len(),
            self.settings.server,
            self.settings.port
        );

        match tokio::time::timeout(self.settings.timeout, transport.send(message)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DeliveryError::Transport(e.to_string())),
            Err(_) => Err(DeliveryError::Timeout(self.settings.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            server: "smtp.example.invalid".to_string(),
            port: 465,
            user: "reports@example.com".to_string(),
            password: "secret".to_string(),
            sender_name: "А-Айсберг".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    fn mail(recipients: &[&str]) -> OutgoingMail {
        OutgoingMail {
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            subject: "Ежедневный отчёт 2025-02-14".to_string(),
            body: "В приложении отчёт".to_string(),
            attachment: Attachment {
                filename: "report_2025-02-14.xlsx".to_string(),
                content_type: XLSX_CONTENT_TYPE.to_string(),
                bytes: b"PK\x03\x04fake".to_vec(),
            },
        }
    }

    #[test]
    fn test_build_message_headers_and_attachment() {
        let mailer = SmtpMailer::new(settings());
        let message = mailer
            .build_message(&mail(&["a@example.com", "b@example.com"]))
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(raw.contains("reports@example.com"));
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("report_2025-02-14.xlsx"));
        assert!(raw.contains(XLSX_CONTENT_TYPE));
        assert!(raw.contains("multipart/mixed"));

        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 2);
        assert_eq!(
            envelope.from().map(|a| a.to_string()),
            Some("reports@example.com".to_string())
        );
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mailer = SmtpMailer::new(settings());
        let err = mailer.build_message(&mail(&["not-an-address"])).unwrap_err();
        assert!(matches!(err, DeliveryError::Address { .. }));
    }

    #[test]
    fn test_build_message_rejects_bad_sender() {
        let mailer = SmtpMailer::new(SmtpSettings {
            user: "nobody".to_string(),
            ..settings()
        });
        let err = mailer.build_message(&mail(&["a@example.com"])).unwrap_err();
        assert!(matches!(err, DeliveryError::Address { .. }));
    }

    #[tokio::test]
    async fn test_empty_recipients_is_a_no_op() {
        // The relay host does not resolve; reaching it would fail.
        let mailer = SmtpMailer::new(settings());
        assert!(mailer.send(&mail(&[])).await.is_ok());
    }
}
