//! SMS provider client.
//!
//! The `SmsSender` trait is what the alert route talks to; `TwilioClient`
//! implements it against the Twilio Messages API.

use crate::config::TwilioConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::SmsMessage;
use thiserror::Error;

/// Errors that can occur while relaying an SMS.
#[derive(Debug, Error)]
pub enum SmsError {
    /// The request could not be sent or the response could not be read.
    #[error("SMS provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the message.
    #[error("SMS provider returned {status}: {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Provider-specific error code, if reported.
        code: Option<i64>,
        /// Provider error message.
        message: String,
    },
}

/// What the provider reports about an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsReceipt {
    /// Provider message identifier.
    pub sid: String,
    /// Recipient number as reported by the provider.
    pub to: String,
    /// Delivery status at acceptance time (e.g. "queued").
    #[serde(default)]
    pub status: Option<String>,
}

/// Something that can deliver an SMS.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Relays the message and returns the provider's receipt.
    async fn send(&self, message: &SmsMessage) -> Result<SmsReceipt, SmsError>;
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Twilio Messages API client.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: TwilioConfig) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("caretaker-api/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// URL of the Messages resource for the configured account.
    #[must_use]
    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send(&self, message: &SmsMessage) -> Result<SmsReceipt, SmsError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", message.to.as_str()),
                ("From", message.from.as_str()),
                ("Body", message.body.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<TwilioErrorBody>(&body).ok();
            let (code, message) = match parsed {
                Some(err) => (err.code, err.message.unwrap_or(body)),
                None => (None, body),
            };
            return Err(SmsError::Provider {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let receipt: SmsReceipt = response.json().await?;
        tracing::debug!(sid = %receipt.sid, to = %receipt.to, "SMS accepted by provider");
        Ok(receipt)
    }
}
