//! Conversion between decimal USD amounts and token minor units.
//!
//! Stablecoin amounts travel on-chain as integers in the token's smallest
//! unit (USDC uses 6 decimals, so `$0.0015` is `1500`). Conversion always
//! truncates toward zero: charging a payer even one unit more than the
//! quoted cost is a correctness bug, losing a fraction of a unit is not.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::PaymentError;

/// Converts a decimal USD amount into token minor units, truncating.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidAmount`] for negative amounts or amounts
/// too large to scale at the given number of decimals.
pub fn usd_to_minor(amount: Decimal, decimals: u8) -> Result<U256, PaymentError> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidAmount(format!(
            "amount must not be negative: {amount}"
        )));
    }
    let scale = Decimal::from(10u64.pow(u32::from(decimals)));
    let scaled = amount
        .checked_mul(scale)
        .ok_or_else(|| PaymentError::InvalidAmount(format!("amount out of range: {amount}")))?
        .trunc();
    let minor = scaled
        .to_u128()
        .ok_or_else(|| PaymentError::InvalidAmount(format!("amount out of range: {amount}")))?;
    Ok(U256::from(minor))
}

/// Converts token minor units back into a decimal USD amount, for
/// human-readable balance reads.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidAmount`] if the value exceeds the 96-bit
/// mantissa a [`Decimal`] can carry.
pub fn minor_to_usd(minor: U256, decimals: u8) -> Result<Decimal, PaymentError> {
    let raw = i128::try_from(minor)
        .map_err(|_| PaymentError::InvalidAmount(format!("balance out of range: {minor}")))?;
    Decimal::try_from_i128_with_scale(raw, u32::from(decimals))
        .map_err(|_| PaymentError::InvalidAmount(format!("balance out of range: {minor}")))
}
