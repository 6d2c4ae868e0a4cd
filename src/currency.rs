//! Currencies

use rusty_money::iso::{AUD, CAD, CHF, Currency, DKK, EUR, GBP, NOK, NZD, SEK, USD};
use thiserror::Error;

/// Currency every stored and built-in price is denominated in.
pub const BASE_CURRENCY: &Currency = EUR;

/// Errors related to currency codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    /// The currency code is not one the receipt can display.
    #[error("Unknown currency code: {0}")]
    Unknown(String),
}

/// Parse an ISO currency code (e.g. "usd" or "USD") into a currency.
///
/// Only currencies with two minor digits are supported, since receipt amounts are always
/// shown to two decimal places.
///
/// # Errors
///
/// Returns [`CurrencyError::Unknown`] if the code is not recognised.
pub fn parse_currency(code: &str) -> Result<&'static Currency, CurrencyError> {
    let currency = match code.trim().to_ascii_uppercase().as_str() {
        "EUR" => EUR,
        "GBP" => GBP,
        "USD" => USD,
        "CHF" => CHF,
        "CAD" => CAD,
        "AUD" => AUD,
        "NZD" => NZD,
        "SEK" => SEK,
        "NOK" => NOK,
        "DKK" => DKK,
        _ => return Err(CurrencyError::Unknown(code.to_string())),
    };

    Ok(currency)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn base_currency_is_euro() {
        assert_eq!(BASE_CURRENCY.iso_alpha_code, "EUR");
    }

    #[test]
    fn parse_currency_is_case_insensitive() -> TestResult {
        assert_eq!(parse_currency("usd")?, USD);
        assert_eq!(parse_currency(" GBP ")?, GBP);

        Ok(())
    }

    #[test]
    fn parse_currency_rejects_unknown_codes() {
        let result = parse_currency("XYZ");

        assert_eq!(result, Err(CurrencyError::Unknown("XYZ".to_string())));
    }
}
