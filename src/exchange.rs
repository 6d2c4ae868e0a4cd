//! Currency conversion

use std::{
    fs, io,
    path::Path,
    sync::{
        Arc, mpsc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use serde::Deserialize;
use serde_norway::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    currency::{CurrencyError, parse_currency},
    prices::price_from_yaml,
};

/// Default time a [`TimeoutConverter`] waits for its inner converter.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur while converting an amount between currencies.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// No rate is known between the two currencies.
    #[error("No exchange rate from {from} to {to}")]
    MissingRate {
        /// Source currency code
        from: &'static str,
        /// Target currency code
        to: &'static str,
    },

    /// A configured rate is zero, negative or not a number.
    #[error("Invalid exchange rate for {0}")]
    InvalidRate(String),

    /// The converter is not able to answer at all.
    #[error("Currency conversion unavailable")]
    Unavailable,

    /// The converter did not answer in time.
    #[error("Currency conversion timed out after {0:?}")]
    Timeout(Duration),

    /// The converted amount does not fit in a decimal.
    #[error("Currency conversion overflow")]
    Overflow,

    /// The conversion worker thread could not be started.
    #[error("Failed to start conversion worker: {0}")]
    Spawn(#[source] io::Error),

    /// IO error reading a rates file
    #[error("Failed to read rates file: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing error
    #[error("Failed to parse rates file: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency in a rates file
    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// Converts an amount from one currency to another.
pub trait CurrencyConverter {
    /// Convert `amount` from `from` into `to`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if the amount cannot be converted.
    fn convert(
        &self,
        from: &'static Currency,
        to: &'static Currency,
        amount: Decimal,
    ) -> Result<Decimal, ConversionError>;
}

impl<C: CurrencyConverter + ?Sized> CurrencyConverter for &C {
    fn convert(
        &self,
        from: &'static Currency,
        to: &'static Currency,
        amount: Decimal,
    ) -> Result<Decimal, ConversionError> {
        (**self).convert(from, to, amount)
    }
}

impl<C: CurrencyConverter + ?Sized> CurrencyConverter for Box<C> {
    fn convert(
        &self,
        from: &'static Currency,
        to: &'static Currency,
        amount: Decimal,
    ) -> Result<Decimal, ConversionError> {
        (**self).convert(from, to, amount)
    }
}

impl<C: CurrencyConverter + ?Sized> CurrencyConverter for Arc<C> {
    fn convert(
        &self,
        from: &'static Currency,
        to: &'static Currency,
        amount: Decimal,
    ) -> Result<Decimal, ConversionError> {
        (**self).convert(from, to, amount)
    }
}

/// Converter with no rates at all. Every conversion is unavailable, so carts fall back to
/// base currency amounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconverted;

impl CurrencyConverter for Unconverted {
    fn convert(
        &self,
        _from: &'static Currency,
        _to: &'static Currency,
        _amount: Decimal,
    ) -> Result<Decimal, ConversionError> {
        Err(ConversionError::Unavailable)
    }
}

/// Fixed exchange rates relative to a base currency.
///
/// A rate of `1.08` for USD means one unit of the base currency buys 1.08 USD.
#[derive(Debug, Clone)]
pub struct ExchangeRates {
    base: &'static Currency,
    rates: FxHashMap<&'static str, Decimal>,
}

#[derive(Debug, Deserialize)]
struct RatesFile {
    base: String,

    #[serde(default)]
    rates: FxHashMap<String, Value>,
}

impl ExchangeRates {
    /// Create an empty rate table for the given base currency.
    #[must_use]
    pub fn new(base: &'static Currency) -> Self {
        Self {
            base,
            rates: FxHashMap::default(),
        }
    }

    /// Add a rate from the base currency to `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidRate`] if the rate is not strictly positive.
    pub fn with_rate(
        mut self,
        currency: &'static Currency,
        rate: Decimal,
    ) -> Result<Self, ConversionError> {
        if rate <= Decimal::ZERO {
            return Err(ConversionError::InvalidRate(
                currency.iso_alpha_code.to_string(),
            ));
        }

        self.rates.insert(currency.iso_alpha_code, rate);

        Ok(self)
    }

    /// Load rates from a YAML file of the form:
    ///
    /// ```yaml
    /// base: EUR
    /// rates:
    ///   USD: 1.08
    ///   GBP: "0.85"
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, names an unknown currency, or
    /// contains a rate that is not a positive number.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConversionError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let rates = Self::from_yaml(&contents)?;

        info!(
            path = %path.display(),
            base = rates.base.iso_alpha_code,
            count = rates.rates.len(),
            "loaded exchange rates"
        );

        Ok(rates)
    }

    /// Parse rates from YAML text. See [`ExchangeRates::load`] for the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed, names an unknown currency, or contains a
    /// rate that is not a positive number.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConversionError> {
        let file: RatesFile = serde_norway::from_str(yaml)?;
        let base = parse_currency(&file.base)?;

        file.rates
            .into_iter()
            .try_fold(Self::new(base), |rates, (code, value)| {
                let currency = parse_currency(&code)?;
                let rate = price_from_yaml(&value)
                    .ok()
                    .flatten()
                    .ok_or_else(|| ConversionError::InvalidRate(code.clone()))?;

                rates.with_rate(currency, rate)
            })
    }

    /// The currency rates are expressed against.
    #[must_use]
    pub fn base(&self) -> &'static Currency {
        self.base
    }

    fn rate(&self, currency: &'static Currency) -> Option<Decimal> {
        if currency == self.base {
            return Some(Decimal::ONE);
        }

        self.rates.get(currency.iso_alpha_code).copied()
    }
}

impl CurrencyConverter for ExchangeRates {
    fn convert(
        &self,
        from: &'static Currency,
        to: &'static Currency,
        amount: Decimal,
    ) -> Result<Decimal, ConversionError> {
        if from == to {
            return Ok(amount);
        }

        let missing = || ConversionError::MissingRate {
            from: from.iso_alpha_code,
            to: to.iso_alpha_code,
        };

        let from_rate = self.rate(from).ok_or_else(missing)?;
        let to_rate = self.rate(to).ok_or_else(missing)?;

        amount
            .checked_div(from_rate)
            .and_then(|base_amount| base_amount.checked_mul(to_rate))
            .ok_or(ConversionError::Overflow)
    }
}

/// Bounds the time spent waiting on another converter.
///
/// The inner converter runs on a worker thread, one per call. If it has not answered when the
/// timeout expires the conversion fails with [`ConversionError::Timeout`] and the worker is left
/// to finish on its own.
///
/// After the first timeout the converter is tripped: later calls fail with
/// [`ConversionError::Timeout`] straight away without starting a worker, so a hung inner
/// converter costs one timeout and one stuck thread rather than one per receipt line.
#[derive(Debug)]
pub struct TimeoutConverter<C> {
    inner: Arc<C>,
    timeout: Duration,
    tripped: AtomicBool,
}

impl<C> TimeoutConverter<C> {
    /// Wrap `inner`, waiting at most `timeout` for each conversion.
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
            tripped: AtomicBool::new(false),
        }
    }

    /// Wrap `inner` using [`DEFAULT_CONVERSION_TIMEOUT`].
    pub fn with_default_timeout(inner: C) -> Self {
        Self::new(inner, DEFAULT_CONVERSION_TIMEOUT)
    }

    /// How long each conversion may take.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check whether an earlier conversion timed out.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Relaxed)
    }
}

impl<C> CurrencyConverter for TimeoutConverter<C>
where
    C: CurrencyConverter + Send + Sync + 'static,
{
    fn convert(
        &self,
        from: &'static Currency,
        to: &'static Currency,
        amount: Decimal,
    ) -> Result<Decimal, ConversionError> {
        if self.is_tripped() {
            return Err(ConversionError::Timeout(self.timeout));
        }

        let (sender, receiver) = mpsc::sync_channel(1);
        let inner = Arc::clone(&self.inner);

        thread::Builder::new()
            .name("till-convert".to_string())
            .spawn(move || {
                if sender.send(inner.convert(from, to, amount)).is_err() {
                    debug!("conversion finished after the caller stopped waiting");
                }
            })
            .map_err(ConversionError::Spawn)?;

        match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.tripped.store(true, Ordering::Relaxed);

                warn!(
                    timeout = ?self.timeout,
                    "currency conversion timed out, skipping further conversions"
                );

                Err(ConversionError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ConversionError::Unavailable),
        }
    }
}
