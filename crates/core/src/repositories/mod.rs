//! Order persistence.
//!
//! Two logical tables are kept per order:
//! - `orders`: one [`StoredOrder`] row with the customer, invoice number and totals
//! - `order_items`: the [`StoredOrderItem`] rows belonging to that order
//!
//! Both are inserted once per submission and never updated. [`OrderRepository`] is the port;
//! [`file::FileOrderRepository`] stores JSON under sharded directories and
//! [`memory::InMemoryOrderRepository`] keeps everything in process memory.
//!
//! [`save_order`] writes both tables as one unit: if the item rows cannot be written the
//! order row is removed again.

pub mod file;
pub mod memory;
mod shared;

use crate::receipt::{Customer, OrderItem, Receipt, ReceiptTotals};
use crate::{MandalError, MandalResult, ShardableUuid};
use chrono::{DateTime, Utc};
use mandal_uuid::InvoiceNumber;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An `orders` row before it has been assigned an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub invoice_number: InvoiceNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn from_receipt(receipt: &Receipt) -> Self {
        let customer = &receipt.customer;
        Self {
            invoice_number: receipt.invoice_number.clone(),
            customer_name: customer.name.to_string(),
            customer_email: customer.email.to_string(),
            customer_phone: customer.phone.to_string(),
            customer_address: customer.address.to_string(),
            subtotal: receipt.totals.subtotal,
            tax_rate: receipt.totals.tax_rate,
            tax: receipt.totals.tax,
            total_amount: receipt.totals.total,
            created_at: receipt.issued_at,
        }
    }

    fn into_stored(self, id: ShardableUuid) -> StoredOrder {
        StoredOrder {
            id,
            invoice_number: self.invoice_number,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            customer_address: self.customer_address,
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            tax: self.tax,
            total_amount: self.total_amount,
            created_at: self.created_at,
        }
    }
}

/// A row of the `orders` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: ShardableUuid,
    pub invoice_number: InvoiceNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl StoredOrder {
    /// Rebuilds the issued receipt from this row and its items.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::Text` or `MandalError::InvalidInput` if a stored field no longer
    /// passes validation.
    pub fn to_receipt(&self, items: &[StoredOrderItem]) -> MandalResult<Receipt> {
        let customer = Customer::new(
            &self.customer_name,
            &self.customer_email,
            &self.customer_phone,
            &self.customer_address,
        )?;
        let items = items
            .iter()
            .map(|row| OrderItem::new(&row.description, row.quantity, row.price))
            .collect::<MandalResult<Vec<_>>>()?;
        Ok(Receipt {
            invoice_number: self.invoice_number.clone(),
            issued_at: self.created_at,
            customer,
            items,
            totals: ReceiptTotals {
                subtotal: self.subtotal,
                tax_rate: self.tax_rate,
                tax: self.tax,
                total: self.total_amount,
            },
        })
    }
}

/// An `order_items` row before it is attached to an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrderItem {
    pub description: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl From<&OrderItem> for NewOrderItem {
    fn from(item: &OrderItem) -> Self {
        Self {
            description: item.description().to_owned(),
            quantity: item.quantity(),
            price: item.unit_price(),
        }
    }
}

impl NewOrderItem {
    fn into_stored(self, order_id: &ShardableUuid) -> MandalResult<StoredOrderItem> {
        let total = self
            .price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                MandalError::InvalidInput(format!(
                    "total for '{}' is too large",
                    self.description
                ))
            })?;
        Ok(StoredOrderItem {
            order_id: order_id.clone(),
            total,
            description: self.description,
            quantity: self.quantity,
            price: self.price,
        })
    }
}

/// A row of the `order_items` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrderItem {
    pub order_id: ShardableUuid,
    pub description: String,
    pub quantity: u32,
    pub price: Decimal,
    pub total: Decimal,
}

/// Storage port for orders and their items.
pub trait OrderRepository: Send + Sync {
    /// Inserts an `orders` row and returns it with its generated id.
    fn insert_order(&self, order: NewOrder) -> MandalResult<StoredOrder>;

    /// Inserts all `order_items` rows for `order_id` in one go.
    ///
    /// Items can be inserted once per order; a second call fails with
    /// `MandalError::OrderItemsAlreadyStored`.
    fn insert_items(
        &self,
        order_id: &ShardableUuid,
        items: Vec<NewOrderItem>,
    ) -> MandalResult<Vec<StoredOrderItem>>;

    /// Removes an order and anything stored with it.
    fn delete_order(&self, order_id: &ShardableUuid) -> std::io::Result<()>;

    fn get_order(&self, order_id: &ShardableUuid) -> MandalResult<StoredOrder>;

    /// Items of an order; empty if none were stored.
    fn order_items(&self, order_id: &ShardableUuid) -> MandalResult<Vec<StoredOrderItem>>;

    /// All stored orders, oldest first.
    fn list_orders(&self) -> MandalResult<Vec<StoredOrder>>;
}

/// An order and its items as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SavedOrder {
    pub order: StoredOrder,
    pub items: Vec<StoredOrderItem>,
}

/// Persists a receipt as one `orders` row plus its `order_items` rows.
///
/// # Errors
///
/// Returns the error of whichever insert failed. When the item insert fails the order row is
/// deleted again; if that cleanup also fails, returns `MandalError::CleanupAfterSaveFailed`
/// carrying both errors so the order can be removed by hand.
pub fn save_order(repo: &dyn OrderRepository, receipt: &Receipt) -> MandalResult<SavedOrder> {
    let order = repo.insert_order(NewOrder::from_receipt(receipt))?;
    let rows = receipt.items.iter().map(NewOrderItem::from).collect();

    match repo.insert_items(&order.id, rows) {
        Ok(items) => {
            tracing::info!(
                order_id = %order.id,
                invoice = %order.invoice_number,
                "stored order with {} items",
                items.len()
            );
            Ok(SavedOrder { order, items })
        }
        Err(save_error) => {
            tracing::warn!(order_id = %order.id, "item insert failed, removing order: {save_error}");
            if let Err(cleanup_error) = repo.delete_order(&order.id) {
                return Err(MandalError::CleanupAfterSaveFailed {
                    order_id: order.id.to_string(),
                    save_error: Box::new(save_error),
                    cleanup_error,
                });
            }
            Err(save_error)
        }
    }
}
