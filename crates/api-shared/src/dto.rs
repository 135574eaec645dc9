//! JSON request and response bodies of the Mandal APIs.
//!
//! Money values travel as decimal strings (for example `"22.00"`) so no precision is lost in
//! clients that parse JSON numbers as floats.

use mandal_core::catalog::CatalogEntry;
use mandal_core::events::Event;
use mandal_core::payment::PaymentLink;
use mandal_core::receipt::{Customer, Order, OrderItem, Receipt, ReceiptDocument, ReceiptTotals};
use mandal_core::repositories::{StoredOrder, StoredOrderItem};
use mandal_core::MandalResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    /// `validation`, `network_or_api` or `unexpected` for checkout failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentLinkReq {
    /// Amount as typed into the form, for example `"501"` or `"1001.50"`.
    #[schema(example = "501.00")]
    pub amount: String,
    /// Payee UPI id; defaults to the configured mandal account.
    #[serde(default)]
    pub payee_id: Option<String>,
    #[serde(default)]
    pub payee_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Also render the link as an SVG QR code.
    #[serde(default)]
    pub include_qr: bool,
    #[serde(default)]
    pub qr_size: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentLinkRes {
    #[schema(example = "upi://pay?pa=mandal@upi&am=501.00&cu=INR")]
    pub uri: String,
    #[schema(value_type = String, example = "501.00")]
    pub amount: Decimal,
    pub currency: String,
    pub payee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_svg: Option<String>,
    /// The same QR code as a `data:image/svg+xml;base64,...` URI for `<img src>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_data_uri: Option<String>,
}

impl PaymentLinkRes {
    /// Describes `link`, rendering its QR code at `qr_size` pixels when a size is given.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::QrRender` if the link cannot be encoded as a QR code.
    pub fn new(link: &PaymentLink, qr_size: Option<u32>) -> MandalResult<Self> {
        let (qr_svg, qr_data_uri) = match qr_size {
            Some(size) => (Some(link.qr_svg(size)?), Some(link.qr_data_uri(size)?)),
            None => (None, None),
        };
        Ok(Self {
            uri: link.uri().to_owned(),
            amount: link.amount(),
            currency: link.currency().to_owned(),
            payee_id: link.payee_id().to_owned(),
            payee_name: link.payee_name().map(str::to_owned),
            note: link.note().map(str::to_owned),
            qr_svg,
            qr_data_uri,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntryRes {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    #[schema(value_type = Option<String>)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl From<&CatalogEntry> for CatalogEntryRes {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            description: entry.description.clone(),
            image_url: entry.image_url.clone(),
            category: entry.category.clone(),
            price: entry.price,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListCatalogRes {
    pub entries: Vec<CatalogEntryRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRes {
    pub id: String,
    pub title: String,
    pub description: String,
    /// RFC 3339 timestamp.
    pub date: String,
    pub location: String,
    /// The event image, or the shared fallback picture.
    pub image_url: String,
}

impl From<&Event> for EventRes {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.to_rfc3339(),
            location: event.location.clone(),
            image_url: event.image_url_or_default().to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpcomingEventsRes {
    pub events: Vec<EventRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerReq {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItemReq {
    pub description: String,
    pub quantity: u32,
    #[schema(value_type = String, example = "10.00")]
    pub unit_price: Decimal,
}

/// An order as submitted by the order form; used for previews and checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderReq {
    pub customer: CustomerReq,
    pub items: Vec<OrderItemReq>,
}

impl OrderReq {
    /// Validates the submitted fields into a core [`Order`].
    ///
    /// # Errors
    ///
    /// Returns the core validation error for the first bad field.
    pub fn into_order(self) -> MandalResult<Order> {
        let customer = Customer::new(
            self.customer.name,
            self.customer.email,
            self.customer.phone,
            self.customer.address,
        )?;
        let items = self
            .items
            .into_iter()
            .map(|item| OrderItem::new(item.description, item.quantity, item.unit_price))
            .collect::<MandalResult<Vec<_>>>()?;
        Order::new(customer, items)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptTotalsRes {
    #[schema(value_type = String, example = "20.00")]
    pub subtotal: Decimal,
    #[schema(value_type = String, example = "0.10")]
    pub tax_rate: Decimal,
    #[schema(value_type = String, example = "2.00")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "22.00")]
    pub total: Decimal,
}

impl From<&ReceiptTotals> for ReceiptTotalsRes {
    fn from(totals: &ReceiptTotals) -> Self {
        Self {
            subtotal: totals.subtotal,
            tax_rate: totals.tax_rate,
            tax: totals.tax,
            total: totals.total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptRes {
    #[schema(example = "INV-123456")]
    pub invoice_number: String,
    pub issued_at: String,
    pub totals: ReceiptTotalsRes,
    /// Rendered receipt, one string per page.
    pub pages: Vec<String>,
}

impl ReceiptRes {
    pub fn new(receipt: &Receipt, document: &ReceiptDocument) -> Self {
        Self {
            invoice_number: receipt.invoice_number.to_string(),
            issued_at: receipt.issued_at.to_rfc3339(),
            totals: ReceiptTotalsRes::from(&receipt.totals),
            pages: document.pages().to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoredOrderRes {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub created_at: String,
}

impl From<&StoredOrder> for StoredOrderRes {
    fn from(order: &StoredOrder) -> Self {
        Self {
            id: order.id.to_string(),
            invoice_number: order.invoice_number.to_string(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_address: order.customer_address.clone(),
            subtotal: order.subtotal,
            tax: order.tax,
            total_amount: order.total_amount,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoredOrderItemRes {
    pub description: String,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

impl From<&StoredOrderItem> for StoredOrderItemRes {
    fn from(item: &StoredOrderItem) -> Self {
        Self {
            description: item.description.clone(),
            quantity: item.quantity,
            price: item.price,
            total: item.total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRes {
    pub order: StoredOrderRes,
    pub items: Vec<StoredOrderItemRes>,
    pub receipt_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_sid: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersRes {
    pub orders: Vec<StoredOrderRes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_req() -> OrderReq {
        OrderReq {
            customer: CustomerReq {
                name: "Asha Patil".into(),
                email: "asha@example.org".into(),
                phone: "(555) 123-4567".into(),
                address: "12 Temple Street".into(),
            },
            items: vec![OrderItemReq {
                description: "Modak box".into(),
                quantity: 2,
                unit_price: Decimal::new(1000, 2),
            }],
        }
    }

    #[test]
    fn order_req_converts_to_order() {
        let order = order_req().into_order().unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.customer().email.as_str(), "asha@example.org");
    }

    #[test]
    fn order_req_rejects_empty_items_and_bad_email() {
        let mut req = order_req();
        req.items.clear();
        assert!(req.into_order().is_err());

        let mut req = order_req();
        req.customer.email = "asha".into();
        assert!(req.into_order().is_err());
    }

    #[test]
    fn money_serialises_as_strings() {
        let json = serde_json::json!({
            "customer": {"name": "A", "email": "a@b.org", "phone": "5551234567", "address": "x"},
            "items": [{"description": "Flowers", "quantity": 1, "unit_price": "2.50"}]
        });
        let req: OrderReq = serde_json::from_value(json).unwrap();
        assert_eq!(req.items[0].unit_price, Decimal::new(250, 2));

        let out = serde_json::to_value(&req).unwrap();
        assert_eq!(out["items"][0]["unit_price"], "2.50");
    }

    fn donation_link() -> PaymentLink {
        let config = mandal_core::PaymentConfig::new(
            "ganesh.mandal@okbank",
            None,
            Decimal::ONE,
            Decimal::new(100_000, 0),
        )
        .unwrap();
        mandal_core::payment::UpiLinkBuilder::new(config)
            .donation(Decimal::new(501, 0), None)
            .unwrap()
    }

    #[test]
    fn payment_link_res_renders_qr_only_when_sized() {
        let link = donation_link();

        let plain = PaymentLinkRes::new(&link, None).unwrap();
        assert_eq!(plain.qr_svg, None);
        assert_eq!(plain.qr_data_uri, None);

        let with_qr = PaymentLinkRes::new(&link, Some(120)).unwrap();
        assert!(with_qr.qr_svg.unwrap().contains("<svg"));
        assert!(with_qr
            .qr_data_uri
            .unwrap()
            .starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn payment_link_req_defaults() {
        let req: PaymentLinkReq = serde_json::from_str(r#"{"amount":"501"}"#).unwrap();
        assert_eq!(req.payee_id, None);
        assert!(!req.include_qr);
    }
}
