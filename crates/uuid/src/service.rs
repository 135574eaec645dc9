//! Implementation of canonical order UUIDs and invoice numbers.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// Use this wrapper whenever you are:
/// - Accepting an order identifier from outside the core (CLI input, API path), or
/// - Deriving the sharded storage path for an order.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a new canonical UUID.
/// - [`ShardableUuid::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShardableUuid(Uuid);

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardableUuid {
    /// Generates a new random (v4) UUID in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// Hyphenated or uppercase forms are rejected rather than normalised.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is exactly 32 characters of `0-9a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` where `s1`/`s2` are the first two pairs of hex
    /// characters.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let (s1, rest) = canonical.split_at(2);
        let (s2, _) = rest.split_at(2);
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ShardableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ShardableUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardableUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShardableUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShardableUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShardableUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Receipt reference of the form `INV-NNNNNN`.
///
/// The six digits are the last six digits of the issue time in Unix milliseconds. This is a
/// display reference only; orders are keyed by [`ShardableUuid`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    const PREFIX: &'static str = "INV-";
    const DIGITS: usize = 6;

    /// Derives an invoice number from an issue timestamp.
    pub fn from_timestamp(issued_at: DateTime<Utc>) -> Self {
        let millis = issued_at.timestamp_millis().unsigned_abs() % 1_000_000;
        Self(format!("{}{:06}", Self::PREFIX, millis))
    }

    /// Parses a previously issued invoice number.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless the input is `INV-` followed by six digits.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let digits = input.strip_prefix(Self::PREFIX).ok_or_else(|| {
            UuidError::InvalidInput(format!("invoice number must start with INV-: '{input}'"))
        })?;
        if digits.len() != Self::DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UuidError::InvalidInput(format!(
                "invoice number must end with six digits: '{input}'"
            )));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for InvoiceNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for InvoiceNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        InvoiceNumber::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_generates_canonical_uuid() {
        let id = ShardableUuid::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(ShardableUuid::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let parsed = ShardableUuid::parse(canonical).unwrap();

        assert_eq!(parsed.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let result = ShardableUuid::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase_and_bad_length() {
        assert!(ShardableUuid::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(ShardableUuid::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(ShardableUuid::parse("550e8400e29b41d4a7164466554400000").is_err());
        assert!(ShardableUuid::parse("550e8400e29b41d4a716446655440zzz").is_err());
        assert!(ShardableUuid::parse("").is_err());
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let dir = id.sharded_dir(Path::new("/mandal_data/orders"));

        assert_eq!(
            dir,
            PathBuf::from("/mandal_data/orders/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: ShardableUuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_invoice_number_uses_last_six_millis_digits() {
        let issued = Utc.timestamp_millis_opt(1_726_000_123_456).unwrap();
        let invoice = InvoiceNumber::from_timestamp(issued);

        assert_eq!(invoice.as_str(), "INV-123456");
    }

    #[test]
    fn test_invoice_number_zero_pads() {
        let issued = Utc.timestamp_millis_opt(1_726_000_000_042).unwrap();
        assert_eq!(InvoiceNumber::from_timestamp(issued).as_str(), "INV-000042");
    }

    #[test]
    fn test_invoice_number_parse() {
        assert!(InvoiceNumber::parse("INV-004211").is_ok());
        assert!(InvoiceNumber::parse("INV-42").is_err());
        assert!(InvoiceNumber::parse("ORD-004211").is_err());
        assert!(InvoiceNumber::parse("INV-00421a").is_err());
    }
}
