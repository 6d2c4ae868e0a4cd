//! Till
//!
//! Till is a small shopping cart and receipt engine. Line items are priced against a pluggable
//! price source, optionally converted into a display currency and rendered as an ordered receipt.

pub mod cart;
pub mod catalog;
pub mod cli;
pub mod currency;
pub mod exchange;
pub mod items;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod receipt;
