//! Orders, receipt totals and the fixed-layout receipt document.
//!
//! An [`Order`] is a customer plus a non-empty list of [`OrderItem`]s. The
//! [`ReceiptGenerator`] turns an order into a [`Receipt`] (invoice number, issue time and
//! [`ReceiptTotals`]) and renders it into a paginated plain-text [`ReceiptDocument`].
//!
//! ## Totals
//!
//! - item total = quantity × unit price (exact; prices carry at most two decimals)
//! - subtotal = Σ item totals (exact)
//! - tax = subtotal × tax rate, rounded half-even to two decimals
//! - total = subtotal + tax
//!
//! Because the subtotal is already exact at two decimals, `total` equals
//! `subtotal × (1 + tax rate)` rounded half-even to two decimals.

use crate::config::ReceiptSettings;
use crate::constants::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE};
use crate::money::{format_money, has_money_precision, round_money};
use crate::{EmailAddress, MandalError, MandalResult, NonEmptyText};
use chrono::{DateTime, Utc};
use mandal_uuid::InvoiceNumber;
use rust_decimal::Decimal;

/// Width of every rendered line.
const PAGE_WIDTH: usize = 72;
const DESCRIPTION_WIDTH: usize = 40;
const QUANTITY_WIDTH: usize = 8;
const PRICE_WIDTH: usize = 12;
/// Column where right-hand header details (invoice number, date) start.
const DETAILS_COLUMN: usize = 44;
/// Column where totals labels start.
const TOTALS_COLUMN: usize = 46;

/// One line of an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderItem {
    description: NonEmptyText,
    quantity: u32,
    unit_price: Decimal,
}

impl OrderItem {
    /// Creates an order line.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::Text` for a blank description and `MandalError::InvalidInput` if
    /// the quantity is outside `1..=MAX_ITEM_QUANTITY` or the unit price is negative, above
    /// `MAX_UNIT_PRICE` or finer than two decimals.
    pub fn new(description: impl AsRef<str>, quantity: u32, unit_price: Decimal) -> MandalResult<Self> {
        let description = NonEmptyText::new(description)?;
        if quantity == 0 {
            return Err(MandalError::InvalidInput(format!(
                "quantity for '{description}' must be at least 1"
            )));
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(MandalError::InvalidInput(format!(
                "quantity for '{description}' exceeds the maximum of {MAX_ITEM_QUANTITY}"
            )));
        }
        if unit_price < Decimal::ZERO {
            return Err(MandalError::InvalidInput(format!(
                "unit price for '{description}' cannot be negative"
            )));
        }
        if unit_price > MAX_UNIT_PRICE {
            return Err(MandalError::InvalidInput(format!(
                "unit price for '{description}' exceeds the maximum of {MAX_UNIT_PRICE}"
            )));
        }
        if !has_money_precision(unit_price) {
            return Err(MandalError::InvalidInput(format!(
                "unit price for '{description}' has more than two decimal places"
            )));
        }
        Ok(Self {
            description,
            quantity,
            unit_price: round_money(unit_price),
        })
    }

    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// quantity × unit price.
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Who the receipt is billed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Customer {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub phone: NonEmptyText,
    pub address: NonEmptyText,
}

impl Customer {
    /// Validates raw form fields into a `Customer`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::Text` if any field is blank or the email is malformed.
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
        phone: impl AsRef<str>,
        address: impl AsRef<str>,
    ) -> MandalResult<Self> {
        Ok(Self {
            name: NonEmptyText::new(name)?,
            email: EmailAddress::parse(email)?,
            phone: NonEmptyText::new(phone)?,
            address: NonEmptyText::new(address)?,
        })
    }
}

/// A customer and the lines they are ordering. Always holds at least one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    customer: Customer,
    items: Vec<OrderItem>,
}

impl Order {
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if `items` is empty.
    pub fn new(customer: Customer, items: Vec<OrderItem>) -> MandalResult<Self> {
        if items.is_empty() {
            return Err(MandalError::InvalidInput(
                "an order needs at least one item".into(),
            ));
        }
        Ok(Self { customer, items })
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn add_item(&mut self, item: OrderItem) {
        self.items.push(item);
    }

    /// Replaces the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::OrderItemOutOfBounds` if there is no such item.
    pub fn update_item(&mut self, index: usize, item: OrderItem) -> MandalResult<()> {
        let slot = self
            .items
            .get_mut(index)
            .ok_or(MandalError::OrderItemOutOfBounds(index))?;
        *slot = item;
        Ok(())
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::LastOrderItem` when only one item remains and
    /// `MandalError::OrderItemOutOfBounds` if there is no such item.
    pub fn remove_item(&mut self, index: usize) -> MandalResult<OrderItem> {
        if index >= self.items.len() {
            return Err(MandalError::OrderItemOutOfBounds(index));
        }
        if self.items.len() == 1 {
            return Err(MandalError::LastOrderItem);
        }
        Ok(self.items.remove(index))
    }
}

/// Computed money figures of a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ReceiptTotals {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl ReceiptTotals {
    /// Computes subtotal, tax and total for `items`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if `items` is empty, the tax rate is outside
    /// `[0, 1]` or the sums do not fit in a decimal.
    pub fn compute(items: &[OrderItem], tax_rate: Decimal) -> MandalResult<Self> {
        if items.is_empty() {
            return Err(MandalError::InvalidInput(
                "cannot compute totals for an empty item list".into(),
            ));
        }
        if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
            return Err(MandalError::InvalidInput(format!(
                "tax rate must be between 0 and 1, got {tax_rate}"
            )));
        }

        let too_large = || MandalError::InvalidInput("order total is too large".into());
        let subtotal = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total()))
            .map(round_money)
            .ok_or_else(too_large)?;
        let tax = subtotal
            .checked_mul(tax_rate)
            .map(round_money)
            .ok_or_else(too_large)?;
        let total = subtotal.checked_add(tax).ok_or_else(too_large)?;
        Ok(Self {
            subtotal,
            tax_rate,
            tax,
            total,
        })
    }

    /// Tax rate as a percentage label, for example `10` or `7.5`.
    pub fn tax_percent_label(&self) -> String {
        (self.tax_rate * Decimal::ONE_HUNDRED).normalize().to_string()
    }
}

/// An issued receipt: the order snapshot plus its reference and totals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub invoice_number: InvoiceNumber,
    pub issued_at: DateTime<Utc>,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub totals: ReceiptTotals,
}

/// A rendered, paginated receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptDocument {
    pages: Vec<String>,
}

impl ReceiptDocument {
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All pages joined with form-feed page breaks.
    pub fn to_text(&self) -> String {
        self.pages.join("\n\u{000C}\n")
    }
}

/// Produces receipts with fixed tax and layout settings.
#[derive(Clone, Debug)]
pub struct ReceiptGenerator {
    settings: ReceiptSettings,
}

impl ReceiptGenerator {
    pub fn new(settings: ReceiptSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReceiptSettings {
        &self.settings
    }

    /// Issues a receipt for `order` at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::InvalidInput` if the configured tax rate is invalid.
    pub fn generate(&self, order: &Order, issued_at: DateTime<Utc>) -> MandalResult<Receipt> {
        let totals = ReceiptTotals::compute(order.items(), self.settings.tax_rate)?;
        Ok(Receipt {
            invoice_number: InvoiceNumber::from_timestamp(issued_at),
            issued_at,
            customer: order.customer().clone(),
            items: order.items().to_vec(),
            totals,
        })
    }

    /// Lays the receipt out over as many pages as its items need.
    ///
    /// Page one carries the organisation and "Bill To" blocks; the totals block, payment terms
    /// and thank-you line appear on the last page only.
    pub fn render(&self, receipt: &Receipt) -> ReceiptDocument {
        let rows_per_page = self.settings.rows_per_page.max(1);
        let chunks: Vec<&[OrderItem]> = receipt.items.chunks(rows_per_page).collect();
        let page_count = chunks.len().max(1);

        let pages = chunks
            .iter()
            .enumerate()
            .map(|(index, items)| {
                let mut lines = self.title_lines();
                if index == 0 {
                    lines.extend(self.header_lines(receipt));
                } else {
                    lines.push(format!(
                        "Invoice: {} (continued)",
                        receipt.invoice_number
                    ));
                }
                lines.push(String::new());
                lines.extend(self.table_lines(items));
                if index + 1 == page_count {
                    lines.push(String::new());
                    lines.extend(self.totals_lines(&receipt.totals));
                    lines.push(String::new());
                    lines.extend(self.footer_lines());
                }
                lines.push(String::new());
                lines.push(centre(&format!("Page {} of {}", index + 1, page_count)));
                lines.join("\n")
            })
            .collect();

        ReceiptDocument { pages }
    }

    fn title_lines(&self) -> Vec<String> {
        let rule = "=".repeat(PAGE_WIDTH);
        vec![rule.clone(), centre("INVOICE"), rule]
    }

    fn header_lines(&self, receipt: &Receipt) -> Vec<String> {
        let org = &self.settings.organisation;
        let mut left = vec![org.name.clone()];
        left.extend(org.address_lines.iter().cloned());
        left.push(format!("Phone: {}", org.phone));
        left.push(format!("Email: {}", org.email));

        let right = [
            format!("Invoice: {}", receipt.invoice_number),
            format!("Date: {}", receipt.issued_at.format("%B %-d, %Y")),
        ];

        let mut lines: Vec<String> = left
            .iter()
            .enumerate()
            .map(|(i, l)| match right.get(i) {
                Some(r) => format!("{:<width$}{}", truncate(l, DETAILS_COLUMN - 1), r, width = DETAILS_COLUMN),
                None => l.clone(),
            })
            .collect();

        lines.push("-".repeat(PAGE_WIDTH));
        lines.push("Bill To:".into());
        lines.push(receipt.customer.name.to_string());
        lines.push(receipt.customer.email.to_string());
        lines.push(receipt.customer.phone.to_string());
        lines.extend(wrap_text(
            receipt.customer.address.as_str(),
            self.settings.address_wrap,
        ));
        lines
    }

    fn table_lines(&self, items: &[OrderItem]) -> Vec<String> {
        let symbol = &self.settings.currency_symbol;
        let mut lines = vec![
            format!(
                "{:<dw$}{:>qw$}{:>pw$}{:>pw$}",
                "Item Description",
                "Quantity",
                "Unit Price",
                "Total",
                dw = DESCRIPTION_WIDTH,
                qw = QUANTITY_WIDTH,
                pw = PRICE_WIDTH
            ),
            "-".repeat(PAGE_WIDTH),
        ];
        lines.extend(items.iter().map(|item| {
            format!(
                "{:<dw$}{:>qw$}{:>pw$}{:>pw$}",
                truncate(item.description(), DESCRIPTION_WIDTH - 1),
                item.quantity(),
                format_money(symbol, item.unit_price()),
                format_money(symbol, item.total()),
                dw = DESCRIPTION_WIDTH,
                qw = QUANTITY_WIDTH,
                pw = PRICE_WIDTH
            )
        }));
        lines
    }

    fn totals_lines(&self, totals: &ReceiptTotals) -> Vec<String> {
        let symbol = &self.settings.currency_symbol;
        let value_width = PAGE_WIDTH - TOTALS_COLUMN - 12;
        let row = |label: String, amount: Decimal| {
            format!(
                "{:indent$}{:<12}{:>vw$}",
                "",
                label,
                format_money(symbol, amount),
                indent = TOTALS_COLUMN,
                vw = value_width
            )
        };
        vec![
            row("Subtotal:".into(), totals.subtotal),
            row(format!("Tax ({}%):", totals.tax_percent_label()), totals.tax),
            format!("{:indent$}{}", "", "-".repeat(PAGE_WIDTH - TOTALS_COLUMN), indent = TOTALS_COLUMN),
            row("Total:".into(), totals.total),
        ]
    }

    fn footer_lines(&self) -> Vec<String> {
        let mut lines = self.settings.payment_terms.clone();
        lines.push(String::new());
        lines.push(centre("Thank you for your business!"));
        lines
    }
}

fn centre(text: &str) -> String {
    let len = text.chars().count();
    if len >= PAGE_WIDTH {
        return text.to_owned();
    }
    format!("{:pad$}{}", "", text, pad = (PAGE_WIDTH - len) / 2)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Greedy word wrap at `width` characters; words longer than a line are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }

        if current_len > 0 {
            lines.push(current);
        }
    }

    lines
}
