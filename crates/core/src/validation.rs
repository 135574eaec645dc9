//! Input validation utilities.
//!
//! Checks applied to user-supplied values before they are embedded in a deep-link URI or sent
//! to an external service.

use crate::error::PaymentError;
use crate::{MandalError, MandalResult};

/// Longest accepted payee id (`local@handle`).
const MAX_PAYEE_ID_LEN: usize = 255;

/// Longest accepted free-text payment note.
pub const MAX_NOTE_LEN: usize = 80;

/// Validates a UPI payee id (virtual payment address).
///
/// The id must have the shape `local@handle`:
/// - exactly one `@`, with non-empty text on both sides
/// - local part limited to ASCII alphanumerics, `.`, `-` and `_`
/// - handle limited to ASCII alphanumerics, `.` and `-`
///
/// The restricted character set means the id can be embedded in the `pa` parameter without
/// percent-encoding.
///
/// # Errors
///
/// Returns `PaymentError::PayeeIdInvalid` describing the first rule the input breaks.
pub fn validate_payee_id(payee_id: &str) -> Result<(), PaymentError> {
    if payee_id.trim().is_empty() {
        return Err(PaymentError::PayeeIdInvalid(
            "payee id cannot be empty".into(),
        ));
    }

    if payee_id.len() > MAX_PAYEE_ID_LEN {
        return Err(PaymentError::PayeeIdInvalid(format!(
            "payee id exceeds maximum length of {} characters",
            MAX_PAYEE_ID_LEN
        )));
    }

    let mut parts = payee_id.split('@');
    let (Some(local), Some(handle), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PaymentError::PayeeIdInvalid(format!(
            "payee id must contain exactly one '@' (expected local@handle), got '{payee_id}'"
        )));
    };

    if local.is_empty() || handle.is_empty() {
        return Err(PaymentError::PayeeIdInvalid(format!(
            "payee id must have text on both sides of '@', got '{payee_id}'"
        )));
    }

    let local_ok = local
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'));
    let handle_ok = handle
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-'));

    if !local_ok || !handle_ok {
        return Err(PaymentError::PayeeIdInvalid(format!(
            "payee id contains invalid characters: '{payee_id}'"
        )));
    }

    Ok(())
}

/// Validates that a URI scheme is safe to place in front of `://`.
///
/// Follows RFC 3986: a letter followed by letters, digits, `+`, `-` or `.`.
///
/// # Errors
///
/// Returns `MandalError::InvalidInput` if the scheme is empty or contains other characters.
pub fn validate_scheme_safe_for_uri(scheme: &str) -> MandalResult<()> {
    let mut bytes = scheme.bytes();
    let Some(first) = bytes.next() else {
        return Err(MandalError::InvalidInput("scheme cannot be empty".into()));
    };

    let ok = first.is_ascii_alphabetic()
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));

    if !ok {
        return Err(MandalError::InvalidInput(format!(
            "scheme contains invalid characters: '{scheme}'"
        )));
    }

    Ok(())
}

/// Validates a free-text payment note.
///
/// Notes are percent-encoded before use, so only length and control characters are checked.
///
/// # Errors
///
/// Returns `PaymentError::NoteInvalid` if the note is too long or contains control characters.
pub fn validate_note(note: &str) -> Result<(), PaymentError> {
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(PaymentError::NoteInvalid(format!(
            "note exceeds maximum length of {} characters",
            MAX_NOTE_LEN
        )));
    }
    if note.chars().any(char::is_control) {
        return Err(PaymentError::NoteInvalid(
            "note cannot contain control characters".into(),
        ));
    }
    Ok(())
}
