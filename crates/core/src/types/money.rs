//! Money display formatting for storefront amounts.
//!
//! The backend reports amounts as JSON numbers in the shop's currency unit
//! (dollars, not cents). Prices are display-only on this layer - the backend
//! owns all price computation - so `Money` carries an `f64` and formats it
//! with two decimals, thousands grouping, and an optional currency symbol.

use serde::{Deserialize, Serialize};

/// A display amount in the shop currency.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub f64);

impl Money {
    /// Wrap a raw amount.
    #[must_use]
    pub const fn new(amount: f64) -> Self {
        Self(amount)
    }

    /// The raw amount.
    #[must_use]
    pub const fn amount(self) -> f64 {
        self.0
    }

    /// Format with a currency symbol prefix, e.g. `$1,234.50`.
    ///
    /// Negative amounts carry the sign ahead of the symbol (`-$12.30`).
    /// With an empty symbol this returns just the grouped number, matching
    /// the storefront fallback when no symbol is configured.
    #[must_use]
    pub fn format(self, symbol: &str) -> String {
        let sign = if self.0.is_sign_negative() && self.0 != 0.0 {
            "-"
        } else {
            ""
        };
        let number = group_thousands(self.0.abs());
        format!("{sign}{symbol}{number}")
    }
}

impl From<f64> for Money {
    fn from(amount: f64) -> Self {
        Self(amount)
    }
}

/// Format a non-negative amount with two decimals and `,` separators.
fn group_thousands(amount: f64) -> String {
    let fixed = format!("{amount:.2}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{grouped}.{frac_part}")
}
