//! Constants used throughout the mandal core crate.
//!
//! Defaults live here so the binaries, the REST layer and the tests agree on them.

use rust_decimal::Decimal;

/// Default directory for stored orders when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "mandal_data";

/// Directory name for order storage under the data directory.
pub const ORDERS_DIR_NAME: &str = "orders";

/// Filename of the `orders` row inside an order directory.
pub const ORDER_JSON_FILENAME: &str = "order.json";

/// Filename of the `order_items` rows inside an order directory.
pub const ORDER_ITEMS_JSON_FILENAME: &str = "items.json";

/// Deep-link scheme understood by UPI apps.
pub const UPI_SCHEME: &str = "upi";

/// Currency code sent in the `cu` parameter.
pub const UPI_CURRENCY: &str = "INR";

/// Smallest accepted payment, in rupees.
pub const DEFAULT_MIN_AMOUNT: Decimal = Decimal::ONE;

/// Largest accepted payment, in rupees.
pub const DEFAULT_MAX_AMOUNT: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Largest unit price accepted on an order line.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Largest quantity accepted on an order line.
pub const MAX_ITEM_QUANTITY: u32 = 10_000;

/// Receipt tax rate (10%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Item rows printed per receipt page.
pub const RECEIPT_ROWS_PER_PAGE: usize = 15;

/// Column at which the "Bill To" address is wrapped.
pub const RECEIPT_ADDRESS_WRAP: usize = 40;

/// Image shown for events without their own picture.
pub const DEFAULT_EVENT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1501281668745-f7f57925c3b4?w=800&auto=format&fit=crop";

/// Base URL of the SMS provider API.
pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Base URL under which receipts are linked from text messages.
pub const DEFAULT_RECEIPT_BASE_URL: &str = "http://localhost:3000/orders";

/// Request timeout for outbound HTTP calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
