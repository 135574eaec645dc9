//! Outbound text messages.
//!
//! Customers receive one SMS after checkout with their total and a link to the stored receipt.
//! Phone numbers are normalised to `+1XXXXXXXXXX` before anything is sent; a number that does
//! not fit that shape is refused without a network call.

use crate::config::{with_trailing_slash, SmsConfig};
use crate::money::format_money;
use crate::{MandalError, MandalResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;

/// A phone number in `+1XXXXXXXXXX` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalises free-form input such as `(555) 123-4567` to `+15551234567`.
///
/// Non-digits are dropped; numbers not already starting with the country code `1` get `+1`
/// prepended, otherwise `+`.
///
/// # Errors
///
/// Returns `MandalError::InvalidPhoneNumber` unless the result is `+1` followed by ten digits.
pub fn format_phone_number(input: &str) -> MandalResult<PhoneNumber> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    let formatted = if digits.starts_with('1') {
        format!("+{digits}")
    } else {
        format!("+1{digits}")
    };

    if formatted.len() != 12 {
        return Err(MandalError::InvalidPhoneNumber(input.to_owned()));
    }
    Ok(PhoneNumber(formatted))
}

/// Text sent after a successful checkout; `currency_symbol` is the receipt's symbol.
pub fn receipt_message(currency_symbol: &str, total: Decimal, receipt_url: &str) -> String {
    format!(
        "Thank you for your purchase! Your total amount is {}. View your receipt here: {receipt_url}",
        format_money(currency_symbol, total)
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: PhoneNumber,
    pub body: String,
}

/// Provider acknowledgement of a sent message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SmsReceipt {
    #[serde(default)]
    pub sid: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("network error: {0}")]
    Network(String),
    #[error("messaging API rejected the request (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected messaging error: {0}")]
    Unexpected(String),
}

/// Port for sending text messages.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, message: &SmsMessage) -> Result<SmsReceipt, SmsError>;
}

/// Twilio-style HTTP sender: form-encoded `To`/`From`/`Body` with basic auth.
pub struct TwilioSender {
    client: Client,
    endpoint: Url,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSender {
    /// Build a sender with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Unexpected` if the HTTP client cannot be built or the endpoint URL
    /// cannot be derived from the base URL.
    pub fn new(config: &SmsConfig) -> Result<Self, SmsError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SmsError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        let endpoint = with_trailing_slash(config.base_url.clone())
            .join(&format!(
                "2010-04-01/Accounts/{}/Messages.json",
                config.account_sid
            ))
            .map_err(|e| SmsError::Unexpected(format!("invalid messaging endpoint: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(&self, message: &SmsMessage) -> Result<SmsReceipt, SmsError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", message.to.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", message.body.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if status != StatusCode::CREATED {
            return Err(map_status_error(status, body.as_ref()));
        }

        let receipt: SmsReceipt = serde_json::from_slice(body.as_ref()).unwrap_or_default();
        tracing::info!(to = %message.to, sid = ?receipt.sid, "sms sent");
        Ok(receipt)
    }
}

/// Sender used when no provider is configured: logs the message and reports success.
#[derive(Clone, Debug, Default)]
pub struct LogOnlySender;

#[async_trait]
impl SmsSender for LogOnlySender {
    async fn send(&self, message: &SmsMessage) -> Result<SmsReceipt, SmsError> {
        tracing::info!(to = %message.to, "sms not configured, message not sent: {}", message.body);
        Ok(SmsReceipt::default())
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn map_transport_error(error: reqwest::Error) -> SmsError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        SmsError::Network(error.to_string())
    } else {
        SmsError::Unexpected(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SmsError {
    let message = serde_json::from_slice::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_owned()
        });
    SmsError::Api {
        status: status.as_u16(),
        message,
    }
}
