//! Order submission: receipt, storage and the customer text message.
//!
//! The steps run in a fixed order and stop at the first failure:
//! 1. normalise the customer's phone number (refused before anything is stored)
//! 2. compute the receipt
//! 3. save the `orders` row and its `order_items` rows
//! 4. send the receipt SMS
//!
//! A stored order is kept even when the message cannot be sent. A [`CheckoutService`] runs
//! at most one submission per customer phone number; different customers submit concurrently.

use crate::config::CoreConfig;
use crate::messaging::{
    format_phone_number, receipt_message, SmsError, SmsMessage, SmsReceipt, SmsSender,
};
use crate::receipt::{Order, Receipt, ReceiptGenerator};
use crate::repositories::{save_order, OrderRepository, SavedOrder};
use crate::{MandalError, ShardableUuid};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Display category of a checkout failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutErrorKind {
    Validation,
    NetworkOrApi,
    Unexpected,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("an order for this phone number is already being submitted")]
    SubmissionInProgress,
    #[error("{0}")]
    Validation(MandalError),
    #[error("failed to store order: {0}")]
    Storage(MandalError),
    #[error("order {order_id} was stored but the receipt message failed: {source}")]
    Messaging {
        order_id: ShardableUuid,
        #[source]
        source: SmsError,
    },
}

impl CheckoutError {
    pub fn kind(&self) -> CheckoutErrorKind {
        match self {
            CheckoutError::SubmissionInProgress | CheckoutError::Validation(_) => {
                CheckoutErrorKind::Validation
            }
            CheckoutError::Storage(_) => CheckoutErrorKind::Unexpected,
            CheckoutError::Messaging { source, .. } => match source {
                SmsError::Network(_) | SmsError::Api { .. } => CheckoutErrorKind::NetworkOrApi,
                SmsError::Unexpected(_) => CheckoutErrorKind::Unexpected,
            },
        }
    }

    /// Text suitable for showing next to the order form.
    pub fn user_message(&self) -> String {
        match self.kind() {
            CheckoutErrorKind::Validation => self.to_string(),
            CheckoutErrorKind::NetworkOrApi => format!("Network or API error: {self}"),
            CheckoutErrorKind::Unexpected => {
                "An unexpected error occurred. Please try again.".to_owned()
            }
        }
    }
}

/// Everything produced by a successful submission.
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    pub receipt: Receipt,
    pub saved: SavedOrder,
    pub receipt_url: String,
    pub sms: SmsReceipt,
}

pub struct CheckoutService {
    cfg: Arc<CoreConfig>,
    receipts: ReceiptGenerator,
    repo: Arc<dyn OrderRepository>,
    sms: Arc<dyn SmsSender>,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases one submitter's slot when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    submitter: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock_in_flight(self.in_flight).remove(&self.submitter);
    }
}

fn lock_in_flight(in_flight: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CheckoutService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        repo: Arc<dyn OrderRepository>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        let receipts = ReceiptGenerator::new(cfg.receipt().clone());
        Self {
            cfg,
            receipts,
            repo,
            sms,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn receipts(&self) -> &ReceiptGenerator {
        &self.receipts
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repo
    }

    /// True while any submission is running.
    pub fn is_busy(&self) -> bool {
        !lock_in_flight(&self.in_flight).is_empty()
    }

    /// True while a submission for `phone` (in any accepted format) is running.
    pub fn is_submitting(&self, phone: &str) -> bool {
        format_phone_number(phone)
            .is_ok_and(|phone| lock_in_flight(&self.in_flight).contains(phone.as_str()))
    }

    /// Submits `order` now.
    ///
    /// # Errors
    ///
    /// See [`CheckoutService::submit_at`].
    pub async fn submit(&self, order: &Order) -> Result<CheckoutOutcome, CheckoutError> {
        self.submit_at(order, Utc::now()).await
    }

    /// Submits `order` with the given issue time.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::Validation` for a bad phone number, item totals or tax settings
    /// - `CheckoutError::SubmissionInProgress` if an order for the same phone number is running
    /// - `CheckoutError::Storage` if the order could not be saved
    /// - `CheckoutError::Messaging` if the order was saved but the SMS failed
    pub async fn submit_at(
        &self,
        order: &Order,
        issued_at: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let phone =
            format_phone_number(order.customer().phone.as_str()).map_err(CheckoutError::Validation)?;
        let _guard = self.acquire(phone.as_str())?;

        let receipt = self
            .receipts
            .generate(order, issued_at)
            .map_err(CheckoutError::Validation)?;

        let saved = save_order(self.repo.as_ref(), &receipt).map_err(|e| {
            tracing::error!("failed to store order {}: {e}", receipt.invoice_number);
            CheckoutError::Storage(e)
        })?;

        let receipt_url = self.cfg.receipt_url(&saved.order.id.to_string());
        let message = SmsMessage {
            to: phone,
            body: receipt_message(
                &self.receipts.settings().currency_symbol,
                receipt.totals.total,
                &receipt_url,
            ),
        };
        let sms = self.sms.send(&message).await.map_err(|source| {
            tracing::error!(order_id = %saved.order.id, "receipt message failed: {source}");
            CheckoutError::Messaging {
                order_id: saved.order.id.clone(),
                source,
            }
        })?;

        Ok(CheckoutOutcome {
            receipt,
            saved,
            receipt_url,
            sms,
        })
    }

    fn acquire(&self, submitter: &str) -> Result<InFlightGuard<'_>, CheckoutError> {
        if !lock_in_flight(&self.in_flight).insert(submitter.to_owned()) {
            return Err(CheckoutError::SubmissionInProgress);
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            submitter: submitter.to_owned(),
        })
    }
}
