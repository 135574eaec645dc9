//! Decimal money helpers.
//!
//! All amounts are `rust_decimal::Decimal` with two fractional digits. Rounding is
//! round-half-even (banker's rounding) so repeated tax calculations do not drift upwards.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits used for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds to two decimal places using round-half-even.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Returns true if `amount` has no more than two significant fractional digits.
pub fn has_money_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Formats an amount with exactly two fractional digits, for example `22.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Formats an amount with a currency symbol prefix, for example `$22.00`.
pub fn format_money(symbol: &str, amount: Decimal) -> String {
    format!("{symbol}{}", format_amount(amount))
}
