//! Currency normalization
//!
//! All monetary values arrive as integer base units (gwei). Conversion to a
//! display currency is `amount / 1e9 * rate`; rounding happens only when a
//! value is formatted for output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base units (gwei) per whole native coin
pub const BASE_UNITS_PER_COIN: f64 = 1e9;

/// Code of the chain's native asset; its rate is always 1.0
pub const NATIVE_CURRENCY: &str = "ETH";

/// Display currency code such as `ETH`, `USD` or `EUR`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Codes are case-insensitive; stored upper-case
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    pub fn native() -> Self {
        Self(NATIVE_CURRENCY.to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_CURRENCY
    }

    /// Decimal places used for income figures in this currency
    pub fn income_decimals(&self) -> usize {
        if self.is_native() {
            4
        } else {
            2
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert a base-unit amount at `rate` display units per native coin
pub fn to_display(amount_base: i64, rate: f64) -> f64 {
    amount_base as f64 / BASE_UNITS_PER_COIN * rate
}

/// `"<value> <CUR>"` with a fixed number of decimals
pub fn format_amount(value: f64, decimals: usize, currency: &Currency) -> String {
    format!("{:.*} {}", decimals, value, currency)
}

/// Signed income figure: `+0.1234 ETH`, `-1.50 USD` or `0 EUR`
pub fn format_income(amount_base: i64, currency: &Currency, rate: f64) -> String {
    let value = to_display(amount_base, rate);
    let decimals = currency.income_decimals();
    match amount_base.signum() {
        1 => format!("+{:.*} {}", decimals, value, currency),
        -1 => format!("-{:.*} {}", decimals, value.abs(), currency),
        _ => format!("0 {}", currency),
    }
}
