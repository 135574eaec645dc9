use rust_decimal::Decimal;

/// Validation failures of the payment-link builder.
///
/// These carry the human-readable message shown next to the donation form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("amount is invalid: {0}")]
    AmountInvalid(String),
    #[error("{}", out_of_range_message(*amount, *min, *max))]
    AmountOutOfRange {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },
    #[error("payee id is invalid: {0}")]
    PayeeIdInvalid(String),
    #[error("note is invalid: {0}")]
    NoteInvalid(String),
}

fn out_of_range_message(amount: Decimal, min: Decimal, max: Decimal) -> String {
    if amount > max {
        format!("amount too large: {amount} exceeds the maximum of {max}")
    } else {
        format!("amount too small: {amount} is below the minimum of {min}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MandalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("invalid text: {0}")]
    Text(#[from] mandal_types::TextError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] mandal_uuid::UuidError),
    #[error("invalid phone number format, please use format: +1XXXXXXXXXX (got {0})")]
    InvalidPhoneNumber(String),
    #[error("an order must keep at least one item")]
    LastOrderItem,
    #[error("order item {0} does not exist")]
    OrderItemOutOfBounds(usize),
    #[error("failed to render QR code: {0}")]
    QrRender(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("items for order {0} were already stored")]
    OrderItemsAlreadyStored(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create order directory: {0}")]
    OrderDirCreation(std::io::Error),
    #[error(
        "saving order failed and cleanup also failed (order: {order_id}): save={save_error}; cleanup={cleanup_error}"
    )]
    CleanupAfterSaveFailed {
        order_id: String,
        #[source]
        save_error: Box<MandalError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to parse YAML at {path}: {source}")]
    YamlDeserialization {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type MandalResult<T> = std::result::Result<T, MandalError>;
