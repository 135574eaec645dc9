//! # Mandal Core
//!
//! Business logic for the festival website: donation payment links, order receipts, the
//! photo catalog, upcoming events, order storage and the customer text message.
//!
//! This crate contains pure data operations and file management:
//! - UPI deep-link building and QR rendering ([`payment`])
//! - receipt totals and the paginated receipt document ([`receipt`])
//! - catalog search ([`catalog`]) and event listings ([`events`])
//! - sharded JSON order storage under the configured data directory ([`repositories`])
//! - SMS delivery ([`messaging`]) and the submit flow tying it together ([`checkout`])
//!
//! **No API concerns**: authentication and HTTP servers belong in `api-rest` and
//! `api-shared`.

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod messaging;
pub mod money;
pub mod payment;
pub mod receipt;
pub mod repositories;
pub mod validation;

pub use config::{CoreConfig, PaymentConfig, ReceiptSettings, SmsConfig};
pub use error::{MandalError, MandalResult, PaymentError};
pub use mandal_types::{EmailAddress, NonEmptyText, TextError};
pub use mandal_uuid::{InvoiceNumber, ShardableUuid};
