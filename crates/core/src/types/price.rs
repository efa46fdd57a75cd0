//! Price representation using decimal arithmetic.
//!
//! Amounts are always `rust_decimal::Decimal`; floats never touch money.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in a given currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (pesos, dollars).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display, e.g. `$59.900` (COP) or `$1,234.50` (USD).
    #[must_use]
    pub fn display(&self) -> String {
        let dp = self.currency_code.minor_units();
        let rounded = self
            .amount
            .abs()
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        let text = format!("{:.*}", dp as usize, rounded);
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let grouped = group_thousands(whole, self.currency_code.group_separator());
        let sign = if self.amount.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        if fraction.is_empty() {
            format!("{sign}{}{grouped}", self.currency_code.symbol())
        } else {
            format!(
                "{sign}{}{grouped}{}{fraction}",
                self.currency_code.symbol(),
                self.currency_code.decimal_separator()
            )
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// ISO 4217 currency codes the storefront can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Colombian peso, no minor units in everyday pricing.
    #[default]
    COP,
    USD,
}

impl CurrencyCode {
    /// Currency symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::COP | Self::USD => "$",
        }
    }

    /// Number of decimal places shown.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::COP => 0,
            Self::USD => 2,
        }
    }

    const fn group_separator(self) -> char {
        match self {
            Self::COP => '.',
            Self::USD => ',',
        }
    }

    const fn decimal_separator(self) -> char {
        match self {
            Self::COP => ',',
            Self::USD => '.',
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::COP => "COP",
            Self::USD => "USD",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COP" => Ok(Self::COP),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}
