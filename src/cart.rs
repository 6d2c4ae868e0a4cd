//! Cart

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    currency::BASE_CURRENCY,
    exchange::{CurrencyConverter, Unconverted},
    items::LineItem,
    prices::{DefaultPrices, PriceSource},
    pricing::{PricingError, line_amount, total_amount},
    receipt::{Receipt, ReceiptLine},
};

/// Errors related to adding items or pricing the cart.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// Product codes must contain something other than whitespace.
    #[error("Product code must not be empty")]
    EmptyProductCode,

    /// Items must be added at least once.
    #[error("Quantity for {0} must be at least 1")]
    InvalidQuantity(String),

    /// The accumulated quantity for a product does not fit in a `u32`.
    #[error("Quantity for {0} overflows")]
    QuantityOverflow(String),

    /// A line or the total could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Shopping cart.
///
/// Products keep the position they were first added at, and receipts list them in that order.
/// Prices come from exactly one [`PriceSource`]; the built-in [`DefaultPrices`] are used unless
/// another source is supplied with [`Cart::with_prices`].
#[derive(Debug)]
pub struct Cart<P: PriceSource = DefaultPrices, C: CurrencyConverter = Unconverted> {
    items: Vec<LineItem>,
    positions: FxHashMap<String, usize>,
    currency: &'static Currency,
    prices: P,
    converter: C,
}

impl Cart {
    /// Create an empty cart that displays amounts in the given currency.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            positions: FxHashMap::default(),
            currency,
            prices: DefaultPrices,
            converter: Unconverted,
        }
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(BASE_CURRENCY)
    }
}

impl<P: PriceSource, C: CurrencyConverter> Cart<P, C> {
    /// Replace the price source. The previous source is no longer consulted.
    pub fn with_prices<Q: PriceSource>(self, prices: Q) -> Cart<Q, C> {
        Cart {
            items: self.items,
            positions: self.positions,
            currency: self.currency,
            prices,
            converter: self.converter,
        }
    }

    /// Replace the converter used when the display currency is not the base currency.
    pub fn with_converter<D: CurrencyConverter>(self, converter: D) -> Cart<P, D> {
        Cart {
            items: self.items,
            positions: self.positions,
            currency: self.currency,
            prices: self.prices,
            converter,
        }
    }

    /// Add `quantity` of a product.
    ///
    /// A product seen for the first time goes to the end of the cart; adding it again only
    /// increases its quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the product code is blank, the quantity is zero, or the
    /// accumulated quantity would overflow.
    pub fn add_item(&mut self, product_code: &str, quantity: u32) -> Result<(), CartError> {
        if product_code.trim().is_empty() {
            return Err(CartError::EmptyProductCode);
        }

        if quantity == 0 {
            return Err(CartError::InvalidQuantity(product_code.to_string()));
        }

        if let Some(item) = self
            .positions
            .get(product_code)
            .and_then(|&idx| self.items.get_mut(idx))
        {
            let total = item
                .add_quantity(quantity)
                .ok_or_else(|| CartError::QuantityOverflow(product_code.to_string()))?;

            debug!(product_code, quantity, total, "increased cart quantity");

            return Ok(());
        }

        self.positions
            .insert(product_code.to_string(), self.items.len());
        self.items.push(LineItem::new(product_code, quantity));

        debug!(product_code, quantity, "added product to cart");

        Ok(())
    }

    /// Quantity of a product in the cart, if it has been added.
    pub fn quantity(&self, product_code: &str) -> Option<u32> {
        self.positions
            .get(product_code)
            .and_then(|&idx| self.items.get(idx))
            .map(LineItem::quantity)
    }

    /// Iterate over the line items in the order they were first added.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    /// Get the number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the display currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Get the price source of the cart.
    pub fn prices(&self) -> &P {
        &self.prices
    }

    /// Price every line and build the receipt.
    ///
    /// Products without a price are left off the receipt and contribute nothing to the
    /// total. A failed currency conversion falls back to the base currency amount.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Pricing`] if an amount is too large to represent.
    pub fn receipt(&self) -> Result<Receipt, CartError> {
        let mut lines = Vec::with_capacity(self.items.len());

        for item in &self.items {
            let Some(unit_price) = self.prices.unit_price(item.product_code()) else {
                debug!(
                    product_code = item.product_code(),
                    "no price found, leaving product off receipt"
                );

                continue;
            };

            let unit_price = self.display_price(unit_price);
            let amount = line_amount(unit_price, item.quantity(), self.currency)?;

            lines.push(ReceiptLine::new(
                item.product_code(),
                item.quantity(),
                amount,
            ));
        }

        let total = total_amount(lines.iter().map(ReceiptLine::amount), self.currency)?;

        Ok(Receipt::new(lines, total, self.currency))
    }

    /// Render the receipt as text: one line per priced product, then the total line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Pricing`] if an amount is too large to represent.
    pub fn render_receipt(&self) -> Result<Vec<String>, CartError> {
        Ok(self.receipt()?.to_lines())
    }

    fn display_price(&self, unit_price: Decimal) -> Decimal {
        if self.currency == BASE_CURRENCY {
            return unit_price;
        }

        match self
            .converter
            .convert(BASE_CURRENCY, self.currency, unit_price)
        {
            Ok(converted) if !converted.is_sign_negative() => converted,
            Ok(converted) => {
                warn!(
                    from = BASE_CURRENCY.iso_alpha_code,
                    to = self.currency.iso_alpha_code,
                    %converted,
                    "converter returned a negative amount, using base currency amount"
                );

                unit_price
            }
            Err(error) => {
                warn!(
                    from = BASE_CURRENCY.iso_alpha_code,
                    to = self.currency.iso_alpha_code,
                    %error,
                    "currency conversion failed, using base currency amount"
                );

                unit_price
            }
        }
    }
}
