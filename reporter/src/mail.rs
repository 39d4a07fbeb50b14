//! Report email composition and SMTP delivery.
//!
//! `build_message` assembles the multipart email carrying the chart;
//! `SmtpMailer` relays it over an authenticated STARTTLS session.

use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// File name the chart is attached under.
pub const ATTACHMENT_NAME: &str = "graph.png";

/// Errors that can occur while composing or delivering the report email.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A sender or recipient address is malformed.
    #[error("Invalid email address '{address}': {source}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Parser error.
        #[source]
        source: AddressError,
    },

    /// The message or its attachment could not be assembled.
    #[error("Failed to build email: {0}")]
    Build(String),

    /// Connecting, TLS, authentication or relay failed.
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Transport security for the SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpTls {
    /// Upgrade with STARTTLS before authenticating; fail if unavailable.
    #[default]
    StartTls,
    /// No encryption. Only for local test relays.
    Plaintext,
}

impl std::str::FromStr for SmtpTls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "none" | "plaintext" => Ok(Self::Plaintext),
            other => Err(format!("expected 'starttls' or 'none', got '{other}'")),
        }
    }
}

/// SMTP server and credentials.
#[derive(Clone)]
pub struct SmtpSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Transport security.
    pub tls: SmtpTls,
    /// Per-command timeout; `None` keeps lettre's default.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Envelope and text of the report email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    /// From address.
    pub sender: String,
    /// Caretaker address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl From<lettre::error::Error> for DeliveryError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Build(err.to_string())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|source| DeliveryError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// Builds the report email with the PNG chart attached.
///
/// The chart is sent as `image/png`, base64 encoded, with
/// `Content-Disposition: attachment`.
///
/// # Errors
///
/// Returns an error if an address is malformed or the message cannot be assembled.
pub fn build_message(settings: &EmailSettings, chart_png: Vec<u8>) -> Result<Message, DeliveryError> {
    let content_type =
        ContentType::parse("image/png").map_err(|e| DeliveryError::Build(e.to_string()))?;
    let attachment = Attachment::new(ATTACHMENT_NAME.to_string()).body(chart_png, content_type);

    let message = Message::builder()
        .from(mailbox(&settings.sender)?)
        .to(mailbox(&settings.recipient)?)
        .subject(&settings.subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(settings.body.clone()))
                .singlepart(attachment),
        )?;

    Ok(message)
}

/// Something that can deliver a composed email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers the message.
    async fn send(&self, message: Message) -> Result<(), DeliveryError>;
}

/// Delivers mail through an authenticated SMTP relay.
///
/// Every send opens its own session (connect, STARTTLS, AUTH, relay, QUIT) and
/// the connection is closed whether or not delivery succeeds.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    /// Creates a mailer for the given server.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS parameters for the host cannot be built.
    pub fn new(settings: &SmtpSettings) -> Result<Self, DeliveryError> {
        let builder = match settings.tls {
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?,
            SmtpTls::Plaintext => {
                tracing::warn!(host = %settings.host, "SMTP session is not encrypted");
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
        };

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(settings.timeout)
            .build();

        Ok(Self {
            transport,
            host: settings.host.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        let response = self.transport.send(message).await?;
        tracing::debug!(
            host = %self.host,
            code = %response.code(),
            "SMTP relay accepted message"
        );
        Ok(())
    }
}
