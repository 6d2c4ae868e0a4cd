//! Catalog
//!
//! A flat-file price catalog. The file is a YAML mapping of product code to price:
//!
//! ```yaml
//! apple: 0.95
//! banana: "1.25"
//! discontinued: ~
//! ```
//!
//! Prices may be numbers or numeric strings. A `null` entry keeps the product listed without a
//! price, so carts leave it off receipts. Every mutation rewrites the whole file.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde_norway::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::prices::{PriceError, PriceSource, price_from_yaml, validate_price};

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading or writing the catalog file
    #[error("Failed to access catalog file {}: {source}", path.display())]
    Io {
        /// Catalog file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// YAML parsing or serialisation error
    #[error("Failed to parse catalog: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A catalog entry is not a usable price
    #[error("Malformed price for {product}: {source}")]
    MalformedPrice {
        /// Product code of the offending entry
        product: String,
        /// Why the price was rejected
        #[source]
        source: PriceError,
    },

    /// Product not found
    #[error("Product not found: {0}")]
    NotFound(String),
}

/// Product prices backed by a flat file.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    prices: BTreeMap<String, Option<Decimal>>,
}

impl Catalog {
    /// Start an empty catalog stored at `path`. Nothing is written until the first change.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prices: BTreeMap::new(),
        }
    }

    /// Load a catalog file. An empty file is an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an entry is not a
    /// non-negative number (or `null`).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;

        let prices = parse_prices(&contents)?;

        info!(path = %path.display(), count = prices.len(), "loaded catalog");

        Ok(Self { path, prices })
    }

    /// Load the catalog at `path`, or start an empty one if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();

        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "catalog file missing, starting empty");

            Ok(Self::create(path))
        }
    }

    /// Add or overwrite prices, then save.
    ///
    /// Every price is checked before anything changes, so a rejected batch leaves the catalog
    /// and its file untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MalformedPrice`] if a price is negative, or an error if the
    /// catalog cannot be saved.
    pub fn add(
        &mut self,
        entries: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Result<(), CatalogError> {
        let entries = entries
            .into_iter()
            .map(|(product, price)| checked_entry(product, price))
            .collect::<Result<Vec<_>, _>>()?;

        self.prices.extend(
            entries
                .into_iter()
                .map(|(product, price)| (product, Some(price))),
        );

        self.save()
    }

    /// Remove a product, then save. Returns the removed price, if it had one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the product is not in the catalog, or an error if
    /// the catalog cannot be saved.
    pub fn remove(&mut self, product: &str) -> Result<Option<Decimal>, CatalogError> {
        let removed = self
            .prices
            .remove(product)
            .ok_or_else(|| CatalogError::NotFound(product.to_string()))?;

        self.save()?;

        Ok(removed)
    }

    /// Change the price of an existing product, then save.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the product is not in the catalog,
    /// [`CatalogError::MalformedPrice`] if the price is negative, or an error if the catalog
    /// cannot be saved.
    pub fn update(&mut self, product: &str, price: Decimal) -> Result<(), CatalogError> {
        let (_, price) = checked_entry(product.to_string(), price)?;

        let entry = self
            .prices
            .get_mut(product)
            .ok_or_else(|| CatalogError::NotFound(product.to_string()))?;

        *entry = Some(price);

        self.save()
    }

    /// Price of a product, if it is listed with one.
    pub fn get(&self, product: &str) -> Option<Decimal> {
        self.prices.get(product).copied().flatten()
    }

    /// Check whether a product is listed, with or without a price.
    pub fn contains(&self, product: &str) -> bool {
        self.prices.contains_key(product)
    }

    /// Iterate over listed products in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<Decimal>)> {
        self.prices
            .iter()
            .map(|(product, price)| (product.as_str(), *price))
    }

    /// Number of listed products.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Check if the catalog lists no products.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole catalog to its file, replacing the previous contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be serialised or written.
    pub fn save(&self) -> Result<(), CatalogError> {
        let entries: BTreeMap<&str, Option<String>> = self
            .prices
            .iter()
            .map(|(product, price)| (product.as_str(), price.map(|price| price.to_string())))
            .collect();

        let yaml = serde_norway::to_string(&entries)?;
        let staging = staging_path(&self.path);

        let io_error = |source| CatalogError::Io {
            path: self.path.clone(),
            source,
        };

        fs::write(&staging, yaml).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;

        info!(path = %self.path.display(), count = self.prices.len(), "saved catalog");

        Ok(())
    }
}

impl PriceSource for Catalog {
    fn unit_price(&self, product_code: &str) -> Option<Decimal> {
        self.get(product_code)
    }
}

fn parse_prices(contents: &str) -> Result<BTreeMap<String, Option<Decimal>>, CatalogError> {
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: FxHashMap<String, Value> = serde_norway::from_str(contents)?;

    raw.into_iter()
        .map(|(product, value)| match price_from_yaml(&value) {
            Ok(price) => Ok((product, price)),
            Err(source) => Err(CatalogError::MalformedPrice { product, source }),
        })
        .collect()
}

fn checked_entry(product: String, price: Decimal) -> Result<(String, Decimal), CatalogError> {
    match validate_price(price) {
        Ok(price) => Ok((product, price)),
        Err(source) => Err(CatalogError::MalformedPrice { product, source }),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or(path.as_os_str()));
    name.push(".tmp");

    path.with_file_name(name)
}
