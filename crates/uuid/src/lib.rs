//! Order identifiers and sharded storage paths.
//!
//! Stored orders live under sharded directories derived from a UUID. To keep path derivation
//! deterministic, mandal uses a *canonical* UUID representation for storage identifiers:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`ShardableUuid`], a wrapper that guarantees the canonical format once constructed.
//! - [`InvoiceNumber`], the human-facing `INV-NNNNNN` reference printed on receipts.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, orders are stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `mandal_data/orders/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::{InvoiceNumber, ShardableUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
