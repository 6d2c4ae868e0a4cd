//! Receipt

use std::{fmt, io};

use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::pricing::format_amount;

/// Errors that can occur when writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// IO error
    #[error("Failed to write receipt: {0}")]
    Io(#[from] io::Error),
}

/// A priced line on a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    product_code: String,
    quantity: u32,
    amount: Money<'static, Currency>,
}

impl ReceiptLine {
    /// Create a new receipt line.
    pub fn new(
        product_code: impl Into<String>,
        quantity: u32,
        amount: Money<'static, Currency>,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
            amount,
        }
    }

    /// Product code for the line
    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    /// Quantity purchased
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Amount for the whole line (unit price times quantity)
    pub fn amount(&self) -> Money<'static, Currency> {
        self.amount
    }
}

impl fmt::Display for ReceiptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} {}",
            self.product_code,
            self.quantity,
            format_amount(&self.amount),
            self.amount.currency().iso_alpha_code
        )
    }
}

/// Rendered receipt for a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Priced lines, in the order products were first added
    lines: Vec<ReceiptLine>,

    /// Sum of all line amounts
    total: Money<'static, Currency>,

    /// Currency used for all monetary values
    currency: &'static Currency,
}

impl Receipt {
    /// Create a new receipt with the given details.
    pub fn new(
        lines: Vec<ReceiptLine>,
        total: Money<'static, Currency>,
        currency: &'static Currency,
    ) -> Self {
        Self {
            lines,
            total,
            currency,
        }
    }

    /// Priced lines
    pub fn lines(&self) -> &[ReceiptLine] {
        &self.lines
    }

    /// Total amount for all lines
    pub fn total(&self) -> Money<'static, Currency> {
        self.total
    }

    /// Currency used for all monetary values.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// The total line, e.g. `Total: 303.30 EUR`.
    pub fn total_line(&self) -> String {
        format!(
            "Total: {} {}",
            format_amount(&self.total),
            self.currency.iso_alpha_code
        )
    }

    /// Every receipt line as text, with the total line last.
    pub fn to_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(ToString::to_string)
            .chain([self.total_line()])
            .collect()
    }

    /// Writes the receipt as a table, for terminals.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written.
    pub fn write_table(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let code = self.currency.iso_alpha_code;
        let mut builder = Builder::default();

        builder.push_record(["Item", "Qty", "Amount"]);

        for line in &self.lines {
            builder.push_record([
                line.product_code.clone(),
                line.quantity.to_string(),
                format!("{} {code}", format_amount(&line.amount)),
            ]);
        }

        builder.push_record([
            "Total".to_string(),
            String::new(),
            format!("{} {code}", format_amount(&self.total)),
        ]);

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(1..3), Alignment::right());

        writeln!(out, "{table}")?;

        Ok(())
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }

        write!(f, "{}", self.total_line())
    }
}
