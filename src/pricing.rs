//! Pricing

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

/// Errors that can occur while pricing receipt lines.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// The amount does not fit in the money representation.
    #[error("amount overflow pricing {quantity} x {unit_price}")]
    Overflow {
        /// Unit price being multiplied
        unit_price: Decimal,
        /// Quantity being multiplied
        quantity: u32,
    },

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Price `quantity` units at `unit_price`, rounded half away from zero to the currency's
/// minor units.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the amount cannot be represented.
pub fn line_amount(
    unit_price: Decimal,
    quantity: u32,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    let overflow = || PricingError::Overflow {
        unit_price,
        quantity,
    };

    let minor_units = unit_price
        .checked_mul(Decimal::from(quantity))
        .and_then(|amount| amount.checked_mul(Decimal::new(100, 0)))
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(overflow)?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Sum line amounts, starting from zero in the given currency.
///
/// # Errors
///
/// Returns [`PricingError::Money`] on a currency mismatch or arithmetic overflow.
pub fn total_amount(
    amounts: impl IntoIterator<Item = Money<'static, Currency>>,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    let total = amounts
        .into_iter()
        .try_fold(Money::from_minor(0, currency), |acc, amount| acc.add(amount))?;

    Ok(total)
}

/// Format an amount with exactly two decimal places and no currency symbol (e.g. "303.30").
pub fn format_amount(amount: &Money<'_, Currency>) -> String {
    let minor_units = amount.to_minor_units();
    let abs_minor = minor_units.unsigned_abs();
    let major_units = abs_minor / 100;
    let fractional = abs_minor % 100;
    let sign = if minor_units < 0 { "-" } else { "" };

    format!("{sign}{major_units}.{fractional:02}")
}
