//! Exact currency arithmetic for order lines and totals.
//!
//! Amounts are computed exactly with `rust_decimal`; rounding to cents happens
//! only when an amount is rendered for people.

use rust_decimal::prelude::*;

use super::errors::OrderError;

/// Currency precision used for presentation
const DECIMAL_PLACES: u32 = 2;

/// unit price x quantity, without rounding
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Result<Decimal, OrderError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| OrderError::InvalidInput(format!(
            "line amount overflows: {} x {}",
            unit_price, quantity
        )))
}

/// Exact sum of amounts
pub fn sum<I>(amounts: I) -> Result<Decimal, OrderError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| OrderError::InvalidInput("order total overflows".to_string()))
}

/// Round to cents, half away from zero
pub fn to_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Render with exactly two decimals, e.g. `13.5` -> `"13.50"`
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = to_currency(value);
    rounded.rescale(DECIMAL_PLACES);
    rounded.to_string()
}
