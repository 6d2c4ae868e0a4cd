//! Prices

use std::str::FromStr;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde_norway::Value;
use thiserror::Error;

/// Errors raised while validating a price at the boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    /// The value is not a number.
    #[error("Malformed price: {0}")]
    Malformed(String),

    /// The value is a number, but below zero.
    #[error("Negative price: {0}")]
    Negative(String),
}

/// Resolves a product code to a unit price in the base currency.
///
/// `None` means the product has no price, and carts drop such lines from the receipt.
pub trait PriceSource {
    /// Unit price for the given product code, if one exists.
    fn unit_price(&self, product_code: &str) -> Option<Decimal>;
}

impl<P: PriceSource + ?Sized> PriceSource for &P {
    fn unit_price(&self, product_code: &str) -> Option<Decimal> {
        (**self).unit_price(product_code)
    }
}

impl<P: PriceSource + ?Sized> PriceSource for Box<P> {
    fn unit_price(&self, product_code: &str) -> Option<Decimal> {
        (**self).unit_price(product_code)
    }
}

/// Built-in price list used when no external prices are supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrices;

impl PriceSource for DefaultPrices {
    fn unit_price(&self, product_code: &str) -> Option<Decimal> {
        match product_code {
            "apple" => Some(Decimal::new(100, 2)),
            "banana" => Some(Decimal::new(110, 2)),
            "kiwi" => Some(Decimal::new(300, 2)),
            _ => None,
        }
    }
}

/// In-memory price table that replaces the built-in list entirely.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: FxHashMap<String, Decimal>,
}

impl PriceTable {
    /// Create an empty price table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a price, consuming and returning the table.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the price is below zero.
    pub fn with_price(
        mut self,
        product_code: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, PriceError> {
        self.insert(product_code, price)?;

        Ok(self)
    }

    /// Set the price of a product, returning the previous price if there was one.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the price is below zero. The table is left unchanged.
    pub fn insert(
        &mut self,
        product_code: impl Into<String>,
        price: Decimal,
    ) -> Result<Option<Decimal>, PriceError> {
        let price = validate_price(price)?;

        Ok(self.prices.insert(product_code.into(), price))
    }

    /// Build a table from decimal prices, validating each one.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for the first price below zero.
    pub fn try_from_prices<K: Into<String>>(
        entries: impl IntoIterator<Item = (K, Decimal)>,
    ) -> Result<Self, PriceError> {
        entries
            .into_iter()
            .try_fold(Self::new(), |table, (product_code, price)| {
                table.with_price(product_code, price)
            })
    }

    /// Build a table from textual prices, validating each one.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] for the first price that is not a non-negative number.
    pub fn try_from_strs<'s>(
        entries: impl IntoIterator<Item = (&'s str, &'s str)>,
    ) -> Result<Self, PriceError> {
        entries
            .into_iter()
            .map(|(product_code, price)| Ok((product_code.to_string(), parse_price(price)?)))
            .collect::<Result<FxHashMap<_, _>, PriceError>>()
            .map(|prices| Self { prices })
    }

    /// Number of priced products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Check if the table has no prices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceSource for PriceTable {
    fn unit_price(&self, product_code: &str) -> Option<Decimal> {
        self.prices.get(product_code).copied()
    }
}

/// Parse a textual price (e.g. "1.10") into a non-negative decimal.
///
/// # Errors
///
/// Returns [`PriceError::Malformed`] if the string is not a number, or
/// [`PriceError::Negative`] if it is below zero.
pub fn parse_price(s: &str) -> Result<Decimal, PriceError> {
    let price = Decimal::from_str(s.trim()).map_err(|_err| PriceError::Malformed(s.to_string()))?;

    validate_price(price).map_err(|_err| PriceError::Negative(s.to_string()))
}

/// Check that a price is not below zero. Negative zero is accepted.
///
/// # Errors
///
/// Returns [`PriceError::Negative`] if the price is below zero.
pub fn validate_price(price: Decimal) -> Result<Decimal, PriceError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(PriceError::Negative(price.to_string()));
    }

    Ok(price)
}

/// Read a price out of a YAML value. `null` means "listed without a price".
pub(crate) fn price_from_yaml(value: &Value) -> Result<Option<Decimal>, PriceError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => parse_price(&number.to_string()).map(Some),
        Value::String(text) => parse_price(text).map(Some),
        other => Err(PriceError::Malformed(describe_yaml(other))),
    }
}

fn describe_yaml(value: &Value) -> String {
    serde_norway::to_string(value)
        .map(|yaml| yaml.trim().to_string())
        .unwrap_or_else(|_err| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn default_prices_cover_built_in_products() {
        let prices = DefaultPrices;

        assert_eq!(prices.unit_price("apple"), Some(Decimal::new(100, 2)));
        assert_eq!(prices.unit_price("banana"), Some(Decimal::new(110, 2)));
        assert_eq!(prices.unit_price("kiwi"), Some(Decimal::new(300, 2)));
    }

    #[test]
    fn default_prices_have_nothing_else() {
        assert_eq!(DefaultPrices.unit_price("shoes"), None);
        assert_eq!(DefaultPrices.unit_price("Apple"), None);
    }

    #[test]
    fn price_table_does_not_fall_back_to_defaults() -> TestResult {
        let table = PriceTable::new().with_price("banana", Decimal::new(150, 2))?;

        assert_eq!(table.unit_price("banana"), Some(Decimal::new(150, 2)));
        assert_eq!(table.unit_price("apple"), None);

        Ok(())
    }

    #[test]
    fn price_table_built_from_pairs() -> TestResult {
        let table = PriceTable::try_from_prices([
            ("pear", Decimal::new(75, 2)),
            ("plum", Decimal::new(40, 2)),
        ])?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.unit_price("plum"), Some(Decimal::new(40, 2)));

        Ok(())
    }

    #[test]
    fn price_table_insert_returns_previous_price() -> TestResult {
        let mut table = PriceTable::new();

        assert_eq!(table.insert("pear", Decimal::ONE)?, None);
        assert_eq!(table.insert("pear", Decimal::TWO)?, Some(Decimal::ONE));

        Ok(())
    }

    #[test]
    fn price_table_rejects_negative_prices() -> TestResult {
        let mut table = PriceTable::new().with_price("pear", Decimal::ONE)?;

        assert_eq!(
            table.insert("pear", Decimal::new(-250, 2)),
            Err(PriceError::Negative("-2.50".to_string()))
        );
        assert_eq!(table.unit_price("pear"), Some(Decimal::ONE));

        let result = PriceTable::try_from_prices([
            ("pear", Decimal::ONE),
            ("refund", Decimal::new(-250, 2)),
        ]);

        assert!(matches!(result, Err(PriceError::Negative(_))));

        Ok(())
    }

    #[test]
    fn validate_price_accepts_zero_and_negative_zero() -> TestResult {
        assert_eq!(validate_price(Decimal::ZERO)?, Decimal::ZERO);
        assert_eq!(validate_price(-Decimal::ZERO)?, Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn try_from_strs_validates_every_price() -> TestResult {
        let table = PriceTable::try_from_strs([("pear", "0.75"), ("plum", " 2 ")])?;

        assert_eq!(table.unit_price("plum"), Some(Decimal::TWO));

        let result = PriceTable::try_from_strs([("pear", "0.75"), ("plum", "cheap")]);

        assert_eq!(result.err(), Some(PriceError::Malformed("cheap".to_string())));

        Ok(())
    }

    #[test]
    fn parse_price_rejects_negative_amounts() {
        assert_eq!(
            parse_price("-1.00"),
            Err(PriceError::Negative("-1.00".to_string()))
        );
    }

    #[test]
    fn parse_price_accepts_zero() -> TestResult {
        assert_eq!(parse_price("0")?, Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn price_from_yaml_accepts_numbers_and_numeric_strings() -> TestResult {
        let number: Value = serde_norway::from_str("1.5")?;
        let text: Value = serde_norway::from_str("'2.25'")?;
        let null: Value = serde_norway::from_str("~")?;

        assert_eq!(price_from_yaml(&number)?, Some(Decimal::new(15, 1)));
        assert_eq!(price_from_yaml(&text)?, Some(Decimal::new(225, 2)));
        assert_eq!(price_from_yaml(&null)?, None);

        Ok(())
    }

    #[test]
    fn price_from_yaml_rejects_other_values() -> TestResult {
        let flag: Value = serde_norway::from_str("true")?;

        assert!(matches!(
            price_from_yaml(&flag),
            Err(PriceError::Malformed(_))
        ));

        Ok(())
    }
}
