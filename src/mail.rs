//! Outgoing mail.
//!
//! The coordinator hands a rendered [`OutgoingMail`] to a [`MailTransport`].
//! [`SmtpMailer`] delivers it through an SMTP relay with lettre;
//! [`LogMailer`] only logs it (dry runs, hosts without a relay).

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, Message, SmtpTransport, Transport};
use std::time::Duration;
use thiserror::Error;
use update_watcher_config::{SmtpConfig, SmtpSecurity};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP relay is not configured")]
    NotConfigured,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Message build error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A fully rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub from: String,
    pub from_name: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
    /// Plain-text alternative
    pub text_body: Option<String>,
}

pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

/// Parse `"Name <addr>"` or a bare address.
fn parse_mailbox(value: &str) -> Result<Mailbox, MailError> {
    value
        .trim()
        .parse::<Mailbox>()
        .map_err(|_| MailError::InvalidAddress(value.to_string()))
}

/// Convert to a lettre [`Message`].
pub fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let from_name = mail.from_name.trim();
    let from = Mailbox::new(
        (!from_name.is_empty()).then(|| from_name.to_string()),
        parse_address(&mail.from)?,
    );

    let mut builder = Message::builder().from(from).subject(mail.subject.clone());
    for to in &mail.to {
        builder = builder.to(Mailbox::new(None, parse_address(to)?));
    }
    if let Some(reply_to) = mail.reply_to.as_deref().filter(|r| !r.trim().is_empty()) {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }
    builder = builder.date_now();

    let message = match &mail.text_body {
        Some(text) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(mail.html_body.clone()),
                ),
        )?,
        None => builder
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body.clone())?,
    };
    Ok(message)
}

/// SMTP delivery through a configured relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        if !config.is_configured() {
            return Err(MailError::NotConfigured);
        }
        let host = config.host.trim().to_string();

        let mut builder = SmtpTransport::builder_dangerous(&host)
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        builder = match config.security {
            SmtpSecurity::None => builder.tls(Tls::None),
            SmtpSecurity::StartTls => builder.tls(Tls::Required(TlsParameters::new(host.clone())?)),
            SmtpSecurity::Tls => builder.tls(Tls::Wrapper(TlsParameters::new(host.clone())?)),
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;
        self.transport.send(&message)?;
        log::info!("Sent \"{}\" to {}", mail.subject, mail.to.join(", "));
        Ok(())
    }
}

/// Logs mail instead of sending it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl MailTransport for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        // Still validates addresses so a dry run catches bad settings.
        build_message(mail)?;
        log::info!(
            "[dry run] Would send \"{}\" from {} to {}",
            mail.subject,
            mail.from,
            mail.to.join(", ")
        );
        log::debug!("[dry run] Body:\n{}", mail.html_body);
        Ok(())
    }
}
