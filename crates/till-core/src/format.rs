//! # Money Formatting
//!
//! The core returns [`Money`] values only. Turning them into display
//! strings is a downstream step performed by a [`MoneyFormatter`];
//! `till-session` ships a plain implementation.

use crate::money::Money;

/// Renders money for display.
///
/// `international` asks for the ISO currency code instead of the local
/// symbol (`USD 1.07` rather than `$1.07`).
pub trait MoneyFormatter {
    fn format(&self, money: Money, locale: &str, international: bool) -> String;
}
