//! UPI payment-link builder.
//!
//! Turns a donation amount and a payee id into a deep link of the form
//! `upi://pay?pa=<payee>&pn=<name>&am=<amount>&tn=<note>&cu=INR` that mobile payment apps open
//! via OS-level URL dispatch. Validation runs first and has no side effects; nothing is
//! formatted or rendered for a rejected request.
//!
//! A built [`PaymentLink`] can also be rendered as a QR code for scanning from a second device.

use crate::config::PaymentConfig;
use crate::error::PaymentError;
use crate::money::{format_amount, has_money_precision, round_money};
use crate::validation::{validate_note, validate_payee_id};
use crate::{MandalError, MandalResult};
use base64::{engine::general_purpose, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use qrcode::render::svg;
use qrcode::QrCode;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Default edge length of rendered QR codes, in pixels.
pub const DEFAULT_QR_SIZE: u32 = 200;

/// A request to pay `amount` to `payee_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub payee_id: String,
    pub payee_name: Option<String>,
    pub note: Option<String>,
}

/// Parses an amount typed into a form field.
///
/// # Errors
///
/// Returns `PaymentError::AmountInvalid` if the text is not a decimal number.
pub fn parse_amount(input: &str) -> Result<Decimal, PaymentError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .map_err(|_| PaymentError::AmountInvalid(format!("'{trimmed}' is not a number")))
}

/// Checks that `amount` is a positive, two-decimal value inside `[min, max]`.
///
/// # Errors
///
/// - `PaymentError::AmountInvalid` if the amount is zero, negative or has more than two
///   fractional digits.
/// - `PaymentError::AmountOutOfRange` if it lies outside the inclusive bounds.
pub fn validate_amount(amount: Decimal, min: Decimal, max: Decimal) -> Result<Decimal, PaymentError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::AmountInvalid(format!(
            "{amount} must be greater than zero"
        )));
    }
    if !has_money_precision(amount) {
        return Err(PaymentError::AmountInvalid(format!(
            "{amount} has more than two decimal places"
        )));
    }
    if amount < min || amount > max {
        return Err(PaymentError::AmountOutOfRange { amount, min, max });
    }
    Ok(round_money(amount))
}

/// A validated, formatted payment deep link.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PaymentLink {
    uri: String,
    payee_id: String,
    payee_name: Option<String>,
    amount: Decimal,
    currency: String,
    note: Option<String>,
}

impl PaymentLink {
    /// The deep-link URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn payee_id(&self) -> &str {
        &self.payee_id
    }

    pub fn payee_name(&self) -> Option<&str> {
        self.payee_name.as_deref()
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Renders the link as an SVG QR code with edges of at least `size` pixels.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::QrRender` if the URI is too long to encode.
    pub fn qr_svg(&self, size: u32) -> MandalResult<String> {
        let code =
            QrCode::new(self.uri.as_bytes()).map_err(|e| MandalError::QrRender(e.to_string()))?;
        Ok(code
            .render::<svg::Color<'_>>()
            .min_dimensions(size, size)
            .build())
    }

    /// Renders the QR code as a `data:` URI suitable for an `<img src>` attribute.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::QrRender` if the URI is too long to encode.
    pub fn qr_data_uri(&self, size: u32) -> MandalResult<String> {
        let svg = self.qr_svg(size)?;
        Ok(format!(
            "data:image/svg+xml;base64,{}",
            general_purpose::STANDARD.encode(svg)
        ))
    }
}

/// Builds UPI deep links within the configured bounds.
#[derive(Clone, Debug)]
pub struct UpiLinkBuilder {
    config: PaymentConfig,
}

impl UpiLinkBuilder {
    pub fn new(config: PaymentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Validates `request` and formats its deep link.
    ///
    /// The amount is checked first, then the payee id, then the optional note. Free-text
    /// fields (`pn`, `tn`) are percent-encoded; absent or blank ones are omitted.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaymentError`] encountered; no link is produced.
    pub fn build(&self, request: &PaymentRequest) -> Result<PaymentLink, PaymentError> {
        let amount = validate_amount(
            request.amount,
            self.config.min_amount(),
            self.config.max_amount(),
        )?;

        let payee_id = request.payee_id.trim();
        validate_payee_id(payee_id)?;

        let payee_name = non_blank(request.payee_name.as_deref());
        let note = non_blank(request.note.as_deref());
        if let Some(note) = note.as_deref() {
            validate_note(note)?;
        }

        let mut uri = format!("{}://pay?pa={}", self.config.scheme(), payee_id);
        if let Some(name) = payee_name.as_deref() {
            uri.push_str("&pn=");
            uri.extend(utf8_percent_encode(name, URI_COMPONENT));
        }
        uri.push_str("&am=");
        uri.push_str(&format_amount(amount));
        if let Some(note) = note.as_deref() {
            uri.push_str("&tn=");
            uri.extend(utf8_percent_encode(note, URI_COMPONENT));
        }
        uri.push_str("&cu=");
        uri.push_str(self.config.currency());

        tracing::debug!(payee = payee_id, %amount, "built payment link");

        Ok(PaymentLink {
            uri,
            payee_id: payee_id.to_owned(),
            payee_name,
            amount,
            currency: self.config.currency().to_owned(),
            note,
        })
    }

    /// Builds a donation link to the configured payee.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the amount or note is rejected.
    pub fn donation(&self, amount: Decimal, note: Option<String>) -> Result<PaymentLink, PaymentError> {
        self.build(&PaymentRequest {
            amount,
            payee_id: self.config.payee_id().to_owned(),
            payee_name: self.config.payee_name().map(str::to_owned),
            note,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
