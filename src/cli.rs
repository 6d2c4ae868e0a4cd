//! Command line interface

use std::{io, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    cart::Cart,
    catalog::Catalog,
    currency::parse_currency,
    exchange::{CurrencyConverter, ExchangeRates, TimeoutConverter, Unconverted},
    prices::{DefaultPrices, PriceSource, parse_price},
};

/// Till: price a cart and manage a price catalog
#[derive(Debug, Parser)]
#[command(name = "till", version, about)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top level commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the receipt for a list of items
    Receipt(ReceiptArgs),

    /// Manage a catalog file
    Catalog(CatalogArgs),
}

/// Arguments for printing a receipt
#[derive(Debug, Args)]
pub struct ReceiptArgs {
    /// Catalog file to price items from, instead of the built-in prices
    #[arg(short, long, env = "TILL_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Currency to display amounts in
    #[arg(short = 'C', long, env = "TILL_CURRENCY", default_value = "EUR", value_parser = parse_currency)]
    pub currency: &'static Currency,

    /// Exchange rates file used when the display currency is not EUR
    #[arg(short, long, env = "TILL_RATES")]
    pub rates: Option<PathBuf>,

    /// Milliseconds to wait for each currency conversion
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Print a table instead of plain receipt lines
    #[arg(long)]
    pub table: bool,

    /// Items to add, as `code` or `code=quantity`
    #[arg(value_parser = ItemArg::from_str)]
    pub items: Vec<ItemArg>,
}

/// Arguments for catalog commands
#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Catalog file
    #[arg(short, long, env = "TILL_CATALOG")]
    pub file: PathBuf,

    /// Catalog action
    #[command(subcommand)]
    pub action: CatalogAction,
}

/// Catalog actions
#[derive(Debug, Subcommand)]
pub enum CatalogAction {
    /// Add a product, or overwrite its price
    Add {
        /// Product code
        product: String,

        /// Price in EUR
        #[arg(value_parser = parse_price)]
        price: Decimal,
    },

    /// Remove a product
    Remove {
        /// Product code
        product: String,
    },

    /// Change the price of an existing product
    Update {
        /// Product code
        product: String,

        /// Price in EUR
        #[arg(value_parser = parse_price)]
        price: Decimal,
    },

    /// Show the price of a product
    Get {
        /// Product code
        product: String,
    },

    /// List every product
    List,
}

/// Errors parsing an item argument
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemArgError {
    /// The quantity after `=` is not a positive whole number
    #[error("Invalid quantity in {0:?}, expected code=quantity")]
    InvalidQuantity(String),
}

/// A product code and quantity given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    /// Product code
    pub product_code: String,

    /// Quantity, 1 when omitted
    pub quantity: u32,
}

impl FromStr for ItemArg {
    type Err = ItemArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((product_code, quantity)) = s.split_once('=') else {
            return Ok(Self {
                product_code: s.to_string(),
                quantity: 1,
            });
        };

        let quantity = quantity
            .trim()
            .parse::<u32>()
            .map_err(|_err| ItemArgError::InvalidQuantity(s.to_string()))?;

        Ok(Self {
            product_code: product_code.trim().to_string(),
            quantity,
        })
    }
}

/// Run a parsed command, writing its output to `out`.
///
/// # Errors
///
/// Returns an error if any step of the command fails.
pub fn run(cli: Cli, out: impl io::Write) -> Result<()> {
    match cli.command {
        Command::Receipt(args) => run_receipt(&args, out),
        Command::Catalog(args) => run_catalog(args, out),
    }
}

/// Price the given items and write the receipt.
///
/// # Errors
///
/// Returns an error if the catalog or rates cannot be loaded, an item is invalid, or the
/// receipt cannot be written.
pub fn run_receipt(args: &ReceiptArgs, mut out: impl io::Write) -> Result<()> {
    let prices: Box<dyn PriceSource> = match &args.catalog {
        Some(path) => Box::new(
            Catalog::load(path)
                .with_context(|| format!("loading catalog from {}", path.display()))?,
        ),
        None => Box::new(DefaultPrices),
    };

    let converter: Box<dyn CurrencyConverter> = match &args.rates {
        Some(path) => Box::new(TimeoutConverter::new(
            ExchangeRates::load(path)
                .with_context(|| format!("loading rates from {}", path.display()))?,
            Duration::from_millis(args.timeout_ms),
        )),
        None => Box::new(Unconverted),
    };

    let mut cart = Cart::new(args.currency)
        .with_prices(prices)
        .with_converter(converter);

    for item in &args.items {
        cart.add_item(&item.product_code, item.quantity)?;
    }

    let receipt = cart.receipt()?;

    if args.table {
        receipt.write_table(&mut out)?;
    } else {
        writeln!(out, "{receipt}")?;
    }

    Ok(())
}

/// Run a catalog action and write its result.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or saved, or the product is missing.
pub fn run_catalog(args: CatalogArgs, mut out: impl io::Write) -> Result<()> {
    match args.action {
        CatalogAction::Add { product, price } => {
            let mut catalog = Catalog::open(&args.file)?;

            catalog.add([(product.clone(), price)])?;

            writeln!(out, "{product}: {price}")?;
        }
        CatalogAction::Remove { product } => {
            let mut catalog = Catalog::load(&args.file)?;

            catalog.remove(&product)?;

            writeln!(out, "removed {product}")?;
        }
        CatalogAction::Update { product, price } => {
            let mut catalog = Catalog::load(&args.file)?;

            catalog.update(&product, price)?;

            writeln!(out, "{product}: {price}")?;
        }
        CatalogAction::Get { product } => {
            let catalog = Catalog::load(&args.file)?;

            writeln!(out, "{product}: {}", display_price(catalog.get(&product)))?;
        }
        CatalogAction::List => {
            let catalog = Catalog::load(&args.file)?;

            for (product, price) in catalog.iter() {
                writeln!(out, "{product}: {}", display_price(price))?;
            }
        }
    }

    Ok(())
}

fn display_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| "no price".to_string(), |price| price.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    fn run_args(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("till").chain(args.iter().copied()))?;
        let mut out = Vec::new();

        run(cli, &mut out)?;

        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn item_arg_defaults_to_one() -> TestResult {
        let item: ItemArg = "apple".parse()?;

        assert_eq!(item.product_code, "apple");
        assert_eq!(item.quantity, 1);

        Ok(())
    }

    #[test]
    fn item_arg_reads_quantity() -> TestResult {
        let item: ItemArg = "kiwi=99".parse()?;

        assert_eq!(item.product_code, "kiwi");
        assert_eq!(item.quantity, 99);

        Ok(())
    }

    #[test]
    fn item_arg_rejects_bad_quantity() {
        let result = "kiwi=lots".parse::<ItemArg>();

        assert_eq!(
            result,
            Err(ItemArgError::InvalidQuantity("kiwi=lots".to_string()))
        );
    }

    #[test]
    fn receipt_with_built_in_prices() -> TestResult {
        let output = run_args(&[
            "receipt", "banana", "kiwi=99", "banana", "apple=3", "banana",
        ])?;

        assert_eq!(
            output,
            "banana - 3 - 3.30 EUR\nkiwi - 99 - 297.00 EUR\napple - 3 - 3.00 EUR\nTotal: 303.30 EUR\n"
        );

        Ok(())
    }

    #[test]
    fn receipt_converts_with_rates_file() -> TestResult {
        let dir = tempdir()?;
        let rates = dir.path().join("rates.yml");

        fs::write(&rates, "base: EUR\nrates:\n  USD: 1.10\n")?;

        let rates_arg = rates.to_string_lossy().to_string();
        let output = run_args(&["receipt", "-C", "USD", "-r", &rates_arg, "kiwi=2"])?;

        assert_eq!(output, "kiwi - 2 - 6.60 USD\nTotal: 6.60 USD\n");

        Ok(())
    }

    #[test]
    fn receipt_rejects_zero_quantity() {
        let result = run_args(&["receipt", "apple=0"]);

        assert!(result.is_err(), "zero quantity should be rejected");
    }

    #[test]
    fn receipt_names_missing_catalog_file() -> TestResult {
        let dir = tempdir()?;
        let file = dir.path().join("missing.yml");
        let file_arg = file.to_string_lossy().to_string();

        let error = run_args(&["receipt", "-c", &file_arg, "apple"])
            .err()
            .ok_or("missing catalog should fail")?;

        assert_eq!(
            error.to_string(),
            format!("loading catalog from {}", file.display())
        );

        Ok(())
    }

    #[test]
    fn catalog_commands_round_trip() -> TestResult {
        let dir = tempdir()?;
        let file = dir.path().join("prices.yml");
        let file_arg = file.to_string_lossy().to_string();

        run_args(&["catalog", "-f", &file_arg, "add", "pear", "0.75"])?;
        run_args(&["catalog", "-f", &file_arg, "add", "plum", "0.40"])?;
        run_args(&["catalog", "-f", &file_arg, "update", "pear", "0.80"])?;
        run_args(&["catalog", "-f", &file_arg, "remove", "plum"])?;

        assert_eq!(
            run_args(&["catalog", "-f", &file_arg, "list"])?,
            "pear: 0.80\n"
        );
        assert_eq!(
            run_args(&["catalog", "-f", &file_arg, "get", "plum"])?,
            "plum: no price\n"
        );

        let output = run_args(&["receipt", "-c", &file_arg, "pear=2", "apple"])?;

        assert_eq!(output, "pear - 2 - 1.60 EUR\nTotal: 1.60 EUR\n");

        Ok(())
    }

    #[test]
    fn catalog_update_of_missing_product_fails() -> TestResult {
        let dir = tempdir()?;
        let file = dir.path().join("prices.yml");
        let file_arg = file.to_string_lossy().to_string();

        run_args(&["catalog", "-f", &file_arg, "add", "pear", "0.75"])?;

        let result = run_args(&["catalog", "-f", &file_arg, "update", "plum", "1"]);

        assert!(result.is_err(), "updating a missing product should fail");

        Ok(())
    }
}
