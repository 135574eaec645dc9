//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! core never reads process-wide environment variables itself; callers hand in a lookup
//! function (usually `|key| std::env::var(key).ok()`), which keeps request handling and tests
//! independent of the process environment.

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_AMOUNT, DEFAULT_MIN_AMOUNT,
    DEFAULT_RECEIPT_BASE_URL, DEFAULT_TAX_RATE, DEFAULT_TWILIO_BASE_URL, ORDERS_DIR_NAME,
    RECEIPT_ADDRESS_WRAP, RECEIPT_ROWS_PER_PAGE, UPI_CURRENCY, UPI_SCHEME,
};
use crate::validation::{validate_payee_id, validate_scheme_safe_for_uri};
use crate::{MandalError, MandalResult};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Payee placeholder used when `UPI_PAYEE_ID` is not configured.
const FALLBACK_PAYEE_ID: &str = "mandal@upi";

/// Bounds and identity used when building UPI payment links.
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    payee_id: String,
    payee_name: Option<String>,
    min_amount: Decimal,
    max_amount: Decimal,
    scheme: String,
    currency: String,
}

impl PaymentConfig {
    /// Create a `PaymentConfig` with the default `upi` scheme and `INR` currency.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if the bounds are not `0 < min <= max`, and
    /// `MandalError::Payment` if the payee id is malformed.
    pub fn new(
        payee_id: impl Into<String>,
        payee_name: Option<String>,
        min_amount: Decimal,
        max_amount: Decimal,
    ) -> MandalResult<Self> {
        let payee_id = payee_id.into();
        validate_payee_id(&payee_id)?;

        if min_amount <= Decimal::ZERO {
            return Err(MandalError::InvalidInput(
                "minimum payment amount must be greater than zero".into(),
            ));
        }
        if min_amount > max_amount {
            return Err(MandalError::InvalidInput(format!(
                "minimum payment amount {min_amount} exceeds maximum {max_amount}"
            )));
        }

        Ok(Self {
            payee_id,
            payee_name: payee_name.filter(|n| !n.trim().is_empty()),
            min_amount,
            max_amount,
            scheme: UPI_SCHEME.into(),
            currency: UPI_CURRENCY.into(),
        })
    }

    /// Override the deep-link scheme (for example a test scheme).
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if the scheme contains characters that are not
    /// valid in a URI scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> MandalResult<Self> {
        let scheme = scheme.into();
        validate_scheme_safe_for_uri(&scheme)?;
        self.scheme = scheme;
        Ok(self)
    }

    pub fn payee_id(&self) -> &str {
        &self.payee_id
    }

    pub fn payee_name(&self) -> Option<&str> {
        self.payee_name.as_deref()
    }

    pub fn min_amount(&self) -> Decimal {
        self.min_amount
    }

    pub fn max_amount(&self) -> Decimal {
        self.max_amount
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

/// Organisation details printed at the top of every receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Organisation {
    pub name: String,
    pub address_lines: Vec<String>,
    pub phone: String,
    pub email: String,
}

impl Default for Organisation {
    fn default() -> Self {
        Self {
            name: "Sarvajanik Ganeshotsav Mandal".into(),
            address_lines: vec!["Main Road".into(), "Khatav, Maharashtra".into()],
            phone: "+91 00000 00000".into(),
            email: "contact@mandal.example".into(),
        }
    }
}

/// Layout and tax settings for receipt generation.
#[derive(Clone, Debug)]
pub struct ReceiptSettings {
    pub tax_rate: Decimal,
    pub currency_symbol: String,
    pub organisation: Organisation,
    pub rows_per_page: usize,
    pub address_wrap: usize,
    pub payment_terms: Vec<String>,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            currency_symbol: "$".into(),
            organisation: Organisation::default(),
            rows_per_page: RECEIPT_ROWS_PER_PAGE,
            address_wrap: RECEIPT_ADDRESS_WRAP,
            payment_terms: vec![
                "Payment Terms: Net 30".into(),
                "Please include invoice number with your payment".into(),
            ],
        }
    }
}

impl ReceiptSettings {
    /// Checks the tax rate and layout numbers.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if the tax rate is outside `[0, 1]` or a layout
    /// dimension is zero.
    pub fn validate(&self) -> MandalResult<()> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(MandalError::InvalidInput(format!(
                "tax rate must be between 0 and 1, got {}",
                self.tax_rate
            )));
        }
        if self.rows_per_page == 0 || self.address_wrap == 0 {
            return Err(MandalError::InvalidInput(
                "receipt rows per page and address wrap must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Credentials and endpoint of the SMS provider.
#[derive(Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub base_url: Url,
    pub timeout: Duration,
}

// Keep the auth token out of logs.
impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    events_file: Option<PathBuf>,
    payment: PaymentConfig,
    receipt: ReceiptSettings,
    sms: Option<SmsConfig>,
    receipt_base_url: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if the receipt settings are invalid or the receipt
    /// base URL is empty.
    pub fn new(
        data_dir: PathBuf,
        events_file: Option<PathBuf>,
        payment: PaymentConfig,
        receipt: ReceiptSettings,
        sms: Option<SmsConfig>,
        receipt_base_url: String,
    ) -> MandalResult<Self> {
        receipt.validate()?;

        let receipt_base_url = receipt_base_url.trim().trim_end_matches('/').to_owned();
        if receipt_base_url.is_empty() {
            return Err(MandalError::InvalidInput(
                "receipt base URL cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            events_file,
            payment,
            receipt,
            sms,
            receipt_base_url,
        })
    }

    /// Resolve configuration through a key lookup, usually the process environment.
    ///
    /// Recognised keys: `MANDAL_DATA_DIR`, `MANDAL_EVENTS_FILE`, `UPI_PAYEE_ID`,
    /// `UPI_PAYEE_NAME`, `UPI_MIN_AMOUNT`, `UPI_MAX_AMOUNT`, `RECEIPT_TAX_RATE`,
    /// `RECEIPT_CURRENCY_SYMBOL`, `MANDAL_ORG_NAME`, `MANDAL_ORG_ADDRESS` (lines separated by
    /// `|`), `MANDAL_ORG_PHONE`, `MANDAL_ORG_EMAIL`, `RECEIPT_BASE_URL`, `TWILIO_ACCOUNT_SID`,
    /// `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER`, `TWILIO_BASE_URL`, `HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` when a value is present but cannot be parsed, or
    /// when SMS settings are only partially provided.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MandalResult<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let data_dir = value("MANDAL_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        let events_file = value("MANDAL_EVENTS_FILE").map(PathBuf::from);

        let payee_id = value("UPI_PAYEE_ID").unwrap_or_else(|| {
            tracing::warn!("UPI_PAYEE_ID not set, using placeholder {FALLBACK_PAYEE_ID}");
            FALLBACK_PAYEE_ID.into()
        });
        let payment = PaymentConfig::new(
            payee_id,
            value("UPI_PAYEE_NAME"),
            decimal_from_env_value("UPI_MIN_AMOUNT", value("UPI_MIN_AMOUNT"), DEFAULT_MIN_AMOUNT)?,
            decimal_from_env_value("UPI_MAX_AMOUNT", value("UPI_MAX_AMOUNT"), DEFAULT_MAX_AMOUNT)?,
        )?;

        let mut receipt = ReceiptSettings {
            tax_rate: decimal_from_env_value(
                "RECEIPT_TAX_RATE",
                value("RECEIPT_TAX_RATE"),
                DEFAULT_TAX_RATE,
            )?,
            ..ReceiptSettings::default()
        };
        if let Some(symbol) = value("RECEIPT_CURRENCY_SYMBOL") {
            receipt.currency_symbol = symbol;
        }
        if let Some(name) = value("MANDAL_ORG_NAME") {
            receipt.organisation.name = name;
        }
        if let Some(address) = value("MANDAL_ORG_ADDRESS") {
            receipt.organisation.address_lines = address
                .split('|')
                .map(|line| line.trim().to_owned())
                .filter(|line| !line.is_empty())
                .collect();
        }
        if let Some(phone) = value("MANDAL_ORG_PHONE") {
            receipt.organisation.phone = phone;
        }
        if let Some(email) = value("MANDAL_ORG_EMAIL") {
            receipt.organisation.email = email;
        }

        let timeout_secs = value("HTTP_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    MandalError::InvalidInput(format!("HTTP_TIMEOUT_SECS is not a number: {e}"))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        let sms = sms_config_from_values(
            value("TWILIO_ACCOUNT_SID"),
            value("TWILIO_AUTH_TOKEN"),
            value("TWILIO_FROM_NUMBER"),
            value("TWILIO_BASE_URL"),
            Duration::from_secs(timeout_secs),
        )?;

        Self::new(
            PathBuf::from(data_dir),
            events_file,
            payment,
            receipt,
            sms,
            value("RECEIPT_BASE_URL").unwrap_or_else(|| DEFAULT_RECEIPT_BASE_URL.into()),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn orders_dir(&self) -> PathBuf {
        self.data_dir.join(ORDERS_DIR_NAME)
    }

    pub fn events_file(&self) -> Option<&Path> {
        self.events_file.as_deref()
    }

    pub fn payment(&self) -> &PaymentConfig {
        &self.payment
    }

    pub fn receipt(&self) -> &ReceiptSettings {
        &self.receipt
    }

    pub fn sms(&self) -> Option<&SmsConfig> {
        self.sms.as_ref()
    }

    /// Public URL of a stored order's receipt.
    pub fn receipt_url(&self, order_id: &str) -> String {
        format!("{}/{}/receipt", self.receipt_base_url, order_id)
    }
}

/// Parse a decimal setting from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn decimal_from_env_value(
    key: &str,
    value: Option<String>,
    default: Decimal,
) -> MandalResult<Decimal> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value
        .map(|v| {
            Decimal::from_str(&v)
                .map_err(|e| MandalError::InvalidInput(format!("{key} is not a decimal: {e}")))
        })
        .transpose()?;

    Ok(parsed.unwrap_or(default))
}

fn sms_config_from_values(
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
    base_url: Option<String>,
    timeout: Duration,
) -> MandalResult<Option<SmsConfig>> {
    match (account_sid, auth_token, from_number) {
        (None, None, None) => Ok(None),
        (Some(account_sid), Some(auth_token), Some(from_number)) => {
            let raw = base_url.unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.into());
            let base_url = Url::parse(&raw).map(with_trailing_slash).map_err(|e| {
                MandalError::InvalidInput(format!("TWILIO_BASE_URL is not a valid URL: {e}"))
            })?;
            Ok(Some(SmsConfig {
                account_sid,
                auth_token,
                from_number,
                base_url,
                timeout,
            }))
        }
        _ => Err(MandalError::InvalidInput(
            "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER must be set together"
                .into(),
        )),
    }
}

/// Makes `url` a directory URL so `Url::join` appends to its path instead of replacing the
/// last segment.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = CoreConfig::from_lookup(|_| None).unwrap();

        assert_eq!(cfg.data_dir(), Path::new(DEFAULT_DATA_DIR));
        assert_eq!(cfg.payment().max_amount(), DEFAULT_MAX_AMOUNT);
        assert_eq!(cfg.payment().min_amount(), DEFAULT_MIN_AMOUNT);
        assert_eq!(cfg.receipt().tax_rate, DEFAULT_TAX_RATE);
        assert!(cfg.sms().is_none());
        assert!(cfg.events_file().is_none());
    }

    #[test]
    fn values_override_defaults() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[
            ("MANDAL_DATA_DIR", "/srv/mandal"),
            ("UPI_PAYEE_ID", "ganesh.mandal@okbank"),
            ("UPI_MAX_AMOUNT", "5000"),
            ("RECEIPT_TAX_RATE", "0.18"),
            ("MANDAL_ORG_ADDRESS", "Line one | Line two"),
            ("RECEIPT_BASE_URL", "https://mandal.example/orders/"),
        ]))
        .unwrap();

        assert_eq!(cfg.orders_dir(), PathBuf::from("/srv/mandal/orders"));
        assert_eq!(cfg.payment().payee_id(), "ganesh.mandal@okbank");
        assert_eq!(cfg.payment().max_amount(), Decimal::new(5000, 0));
        assert_eq!(cfg.receipt().tax_rate, Decimal::new(18, 2));
        assert_eq!(
            cfg.receipt().organisation.address_lines,
            vec!["Line one".to_string(), "Line two".to_string()]
        );
        assert_eq!(
            cfg.receipt_url("abc"),
            "https://mandal.example/orders/abc/receipt"
        );
    }

    #[test]
    fn rejects_unparseable_amount() {
        let err = CoreConfig::from_lookup(lookup_from(&[("UPI_MAX_AMOUNT", "lots")])).unwrap_err();
        assert!(matches!(err, MandalError::InvalidInput(msg) if msg.contains("UPI_MAX_AMOUNT")));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = CoreConfig::from_lookup(lookup_from(&[
            ("UPI_MIN_AMOUNT", "500"),
            ("UPI_MAX_AMOUNT", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MandalError::InvalidInput(_)));
    }

    #[test]
    fn rejects_tax_rate_above_one() {
        let err =
            CoreConfig::from_lookup(lookup_from(&[("RECEIPT_TAX_RATE", "1.5")])).unwrap_err();
        assert!(matches!(err, MandalError::InvalidInput(msg) if msg.contains("tax rate")));
    }

    #[test]
    fn partial_sms_settings_are_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[("TWILIO_ACCOUNT_SID", "AC123")]))
            .unwrap_err();
        assert!(matches!(err, MandalError::InvalidInput(_)));
    }

    #[test]
    fn full_sms_settings_are_accepted_and_redacted_in_debug() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret-token"),
            ("TWILIO_FROM_NUMBER", "+15550001111"),
        ]))
        .unwrap();

        let sms = cfg.sms().unwrap();
        assert_eq!(sms.base_url.as_str(), "https://api.twilio.com/");
        assert!(!format!("{sms:?}").contains("secret-token"));
    }

    #[test]
    fn sms_base_url_path_gets_trailing_slash() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret-token"),
            ("TWILIO_FROM_NUMBER", "+15550001111"),
            ("TWILIO_BASE_URL", "https://gateway.example/twilio"),
        ]))
        .unwrap();

        assert_eq!(
            cfg.sms().unwrap().base_url.as_str(),
            "https://gateway.example/twilio/"
        );
    }

    #[test]
    fn payment_scheme_is_validated() {
        let payment =
            PaymentConfig::new("a@b", None, DEFAULT_MIN_AMOUNT, DEFAULT_MAX_AMOUNT).unwrap();
        assert!(payment.clone().with_scheme("upi-test").is_ok());
        assert!(payment.with_scheme("upi://evil").is_err());
    }
}
