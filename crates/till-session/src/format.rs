//! # Plain Money Formatter
//!
//! Renders [`Money`] as display text through `rusty_money`. This is the
//! only place amounts are rounded.
//!
//! ## Output Shapes
//! ```text
//! currency   international   output
//! ────────   ─────────────   ──────────────
//! USD        false           $1,234.50
//! USD        true            USD 1,234.50
//! EUR        false           €1.234,50
//! EUR        true            EUR 1.234,50
//! ```
//!
//! Digit grouping, the decimal separator and symbol placement come from
//! the ISO currency definition, not from the locale argument.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{iso::Currency, Findable, Money as CurrencyAmount};
use till_core::{Money, MoneyFormatter, PriceMode};

use crate::error::{SessionError, SessionResult};

/// Currency formatter backed by an ISO 4217 currency definition.
#[derive(Debug, Clone)]
pub struct PlainFormatter {
    currency: &'static Currency,
    price_mode: PriceMode,
}

impl PlainFormatter {
    /// Looks up `currency_code` (`"USD"`, `"EUR"`, ...).
    ///
    /// ## Errors
    /// [`SessionError::InvalidConfig`] for a code with no ISO definition.
    pub fn new(currency_code: &str, price_mode: PriceMode) -> SessionResult<Self> {
        let currency = Currency::find(currency_code).ok_or_else(|| {
            SessionError::InvalidConfig(format!("Unknown currency code: {currency_code}"))
        })?;
        Ok(PlainFormatter {
            currency,
            price_mode,
        })
    }

    pub fn currency_code(&self) -> &'static str {
        self.currency.iso_alpha_code
    }

    /// Rounds for display and converts cents to major units, at the
    /// currency's own number of decimals.
    pub fn major_units(&self, money: Money) -> Decimal {
        let rounded = money.rounded(self.price_mode).amount();
        let mut major = (rounded / self.price_mode.major_unit_divisor()).round_dp_with_strategy(
            self.currency.exponent,
            RoundingStrategy::MidpointAwayFromZero,
        );
        major.rescale(self.currency.exponent);
        major
    }
}

impl MoneyFormatter for PlainFormatter {
    fn format(&self, money: Money, _locale: &str, international: bool) -> String {
        let value = self.major_units(money);
        let sign = if value.is_sign_negative() && !value.is_zero() {
            "-"
        } else {
            ""
        };

        let symbolic = CurrencyAmount::from_decimal(value.abs(), self.currency).to_string();
        if !international {
            return format!("{sign}{symbolic}");
        }

        let number = symbolic.replacen(self.currency.symbol, "", 1);
        format!("{sign}{} {}", self.currency.iso_alpha_code, number.trim())
    }
}
