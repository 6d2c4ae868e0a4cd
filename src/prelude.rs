//! Till prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError},
    catalog::{Catalog, CatalogError},
    currency::{BASE_CURRENCY, CurrencyError, parse_currency},
    exchange::{ConversionError, CurrencyConverter, ExchangeRates, TimeoutConverter, Unconverted},
    items::LineItem,
    prices::{DefaultPrices, PriceError, PriceSource, PriceTable, parse_price, validate_price},
    pricing::{PricingError, format_amount},
    receipt::{Receipt, ReceiptError, ReceiptLine},
};
