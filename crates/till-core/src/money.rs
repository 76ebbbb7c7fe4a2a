//! # Money Module
//!
//! Provides the `Money`, `TaxRate` and `Quantity` value types.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Proration compares running sums against the discount total. A single  │
//! │  stray ulp flips a `>` into a `<=` and moves tax between entries.      │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal, never rounded inside the core          │
//! │    32.10 × 0.1 = 3.210 exactly                                          │
//! │    rounding happens once, at the formatting boundary                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Modes
//! The same `Money` type carries both configurations:
//! - [`PriceMode::Decimal`]: amounts are major units (`1.07` = one dollar seven)
//! - [`PriceMode::Cents`]: amounts are integer minor units (`107`)
//!
//! The mode only matters when rounding for display (`Money::rounded`).
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use till_core::money::{Money, Quantity, TaxRate};
//!
//! let price = Money::from_minor(1099); // 10.99
//! let line = price.times(Quantity::from(3u32));
//! assert_eq!(line, Money::from_minor(3297));
//!
//! let tax = Money::from_minor(100).apply_rate(TaxRate::from_bps(700));
//! assert_eq!(tax.amount(), Decimal::new(7, 2));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::config::PriceMode;
use crate::error::{CoreError, CoreResult};
use crate::{MAX_AMOUNT, MAX_QUANTITY};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount with exact decimal arithmetic.
///
/// ## Design Decisions
/// - **Signed**: modifiers may carry negative price deltas
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **No implicit rounding**: `3.210` stays `3.210` until [`Money::rounded`]
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  unit_price ──┬──► entry price ──► entry subtotal ──► cart subtotal    │
/// │  price_delta ─┘                                          │              │
/// │                                                          ▼              │
/// │  coupons ──► discount total ──► tax proration ──► grand total          │
/// │  fees ──────────────────────────────────────────────────┘              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps a raw decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a major-unit amount from minor units (`1099` → `10.99`).
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).amount(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, 2))
    }

    /// Parses a decimal string such as `"32.10"`.
    ///
    /// Fails with [`CoreError::InvalidPrice`] when the text is not numeric.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let amount =
            Decimal::from_str(text.trim()).map_err(|_| CoreError::InvalidPrice(text.to_string()))?;
        Money::bounded(amount)
    }

    /// Wraps `amount`, failing with [`CoreError::InvalidPrice`] when its
    /// magnitude exceeds [`MAX_AMOUNT`].
    pub fn bounded(amount: Decimal) -> CoreResult<Self> {
        let money = Money(amount);
        if !money.is_within_bounds() {
            return Err(CoreError::InvalidPrice(format!(
                "{amount} (magnitude above {MAX_AMOUNT})"
            )));
        }
        Ok(money)
    }

    /// True when the magnitude is at most [`MAX_AMOUNT`].
    #[inline]
    pub fn is_within_bounds(&self) -> bool {
        self.0.abs() <= Decimal::from(MAX_AMOUNT)
    }

    /// Returns the raw decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if other < self {
            other
        } else {
            self
        }
    }

    /// Returns the larger of two amounts.
    #[inline]
    pub fn max(self, other: Money) -> Money {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Floors negative amounts at zero.
    #[inline]
    pub fn clamp_non_negative(self) -> Money {
        self.max(Money::zero())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::{Money, Quantity};
    ///
    /// let unit_price = Money::from_minor(299); // 2.99
    /// let line_total = unit_price.times(Quantity::from(3u32));
    /// assert_eq!(line_total, Money::from_minor(897));
    /// ```
    #[inline]
    pub fn times(self, qty: Quantity) -> Money {
        Money(self.0 * qty.value())
    }

    /// Multiplies money by a rate (tax rate or coupon fraction).
    ///
    /// The result keeps full precision; `1.00 × 0.07 = 0.0700`.
    #[inline]
    pub fn apply_rate(self, rate: TaxRate) -> Money {
        Money(self.0 * rate.fraction())
    }

    /// Multiplies money by a bare decimal factor.
    #[inline]
    pub fn scale(self, factor: Decimal) -> Money {
        Money(self.0 * factor)
    }

    /// Rounds for display under the configured price mode.
    ///
    /// ## Rounding Rules
    /// ```text
    /// PriceMode::Decimal  →  2 decimal places   3.215 → 3.22
    /// PriceMode::Cents    →  whole minor units  321.5 → 322
    /// ```
    /// Midpoints round away from zero. This is the only rounding point in
    /// the crate and is meant for formatters.
    pub fn rounded(self, mode: PriceMode) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(mode.scale(), RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Canonical text used by the identity hasher (`1.0` and `1.00` agree).
    pub(crate) fn canonical(&self) -> String {
        self.0.normalize().to_string()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering. Currency symbols are a formatter concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate as a decimal fraction (`0.07` = 7%).
///
/// ## Basis Points
/// `TaxRate::from_bps(825)` is kept for callers that store rates the way
/// receipt printers do: 1 basis point = 0.01% = 1/10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(#[ts(type = "string")] Decimal);

impl TaxRate {
    /// Creates a tax rate from a fraction, rejecting values outside `0..=1`.
    pub fn from_fraction(fraction: Decimal) -> CoreResult<Self> {
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(CoreError::InvalidTaxRate(fraction.to_string()));
        }
        Ok(TaxRate(fraction))
    }

    /// Creates a tax rate from basis points.
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        TaxRate(Decimal::new(i64::from(bps), 4))
    }

    /// Returns the rate as a fraction.
    #[inline]
    pub const fn fraction(&self) -> Decimal {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub(crate) fn canonical(&self) -> String {
        self.0.normalize().to_string()
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A non-negative line quantity.
///
/// Whether fractional quantities are accepted is a cart configuration
/// concern (`PricingConfig::fractional_quantities`); the type itself only
/// guarantees the value is not negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(#[ts(type = "string")] Decimal);

impl Quantity {
    /// Creates a quantity, failing with [`CoreError::InvalidQuantity`] when
    /// negative or above [`MAX_QUANTITY`].
    pub fn new(value: Decimal) -> CoreResult<Self> {
        if value < Decimal::ZERO {
            return Err(CoreError::InvalidQuantity(value.to_string()));
        }
        let qty = Quantity(value);
        if !qty.is_within_bounds() {
            return Err(CoreError::InvalidQuantity(format!(
                "{value} (more than {MAX_QUANTITY})"
            )));
        }
        Ok(qty)
    }

    /// True when the value is at most [`MAX_QUANTITY`].
    #[inline]
    pub fn is_within_bounds(&self) -> bool {
        self.0 <= Decimal::from(MAX_QUANTITY)
    }

    /// One unit.
    #[inline]
    pub const fn one() -> Self {
        Quantity(Decimal::ONE)
    }

    /// Zero units.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(Decimal::ZERO)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True when the quantity has no fractional part.
    #[inline]
    pub fn is_whole(&self) -> bool {
        self.0.fract().is_zero()
    }

    /// Adds two quantities.
    #[inline]
    pub fn plus(self, other: Quantity) -> Quantity {
        Quantity(self.0 + other.0)
    }

    /// Subtracts `other`, returning `None` when the result would not stay
    /// above zero.
    pub fn checked_reduce(self, other: Quantity) -> Option<Quantity> {
        let remaining = self.0 - other.0;
        if remaining > Decimal::ZERO {
            Some(Quantity(remaining))
        } else {
            None
        }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::one()
    }
}

impl From<u32> for Quantity {
    fn from(units: u32) -> Self {
        Quantity(Decimal::from(units))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_minor() {
        assert_eq!(Money::from_minor(1099).amount(), dec!(10.99));
        assert_eq!(Money::from_minor(-550).amount(), dec!(-5.50));
    }

    #[test]
    fn test_amounts_beyond_bounds_are_rejected() {
        assert!(Money::bounded(dec!(1_000_000_000_000)).is_ok());
        assert!(Money::bounded(dec!(-1_000_000_000_000)).is_ok());
        assert!(matches!(
            Money::bounded(dec!(1_000_000_000_000.01)),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            Money::parse("79228162514264337593543950335"),
            Err(CoreError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_quantity_upper_bound() {
        assert!(Quantity::new(dec!(1_000_000)).is_ok());
        assert!(matches!(
            Quantity::new(dec!(1_000_001)),
            Err(CoreError::InvalidQuantity(_))
        ));
        assert!(!Quantity::from(u32::MAX).is_within_bounds());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("32.10").unwrap(), Money::new(dec!(32.10)));
        assert_eq!(Money::parse(" 7 ").unwrap(), Money::new(dec!(7)));
        assert!(matches!(
            Money::parse("ten"),
            Err(CoreError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_display_is_plain_decimal() {
        assert_eq!(Money::new(dec!(10.99)).to_string(), "10.99");
        assert_eq!(Money::new(dec!(-5.5)).to_string(), "-5.5");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(dec!(10.00));
        let b = Money::new(dec!(5.00));

        assert_eq!(a + b, Money::new(dec!(15)));
        assert_eq!(a - b, Money::new(dec!(5)));
        assert_eq!(-b, Money::new(dec!(-5)));
        assert_eq!(a.times(Quantity::from(3u32)), Money::new(dec!(30)));

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total, Money::new(dec!(20)));
    }

    #[test]
    fn test_rate_keeps_precision() {
        let subtotal = Money::new(dec!(32.10));
        let discount = subtotal.scale(dec!(0.1));
        assert_eq!(discount, Money::new(dec!(3.21)));

        let tax = Money::new(dec!(1.00)).apply_rate(TaxRate::from_bps(700));
        assert_eq!(tax.amount(), dec!(0.07));
    }

    #[test]
    fn test_rounding_only_on_request() {
        let raw = Money::new(dec!(3.215));
        assert_eq!(raw.amount(), dec!(3.215));
        assert_eq!(raw.rounded(PriceMode::Decimal), Money::new(dec!(3.22)));
        assert_eq!(
            Money::new(dec!(321.5)).rounded(PriceMode::Cents),
            Money::new(dec!(322))
        );
        assert_eq!(
            Money::new(dec!(-0.005)).rounded(PriceMode::Decimal),
            Money::new(dec!(-0.01))
        );
    }

    #[test]
    fn test_min_max_clamp() {
        let small = Money::new(dec!(1));
        let large = Money::new(dec!(2));
        assert_eq!(small.min(large), small);
        assert_eq!(small.max(large), large);
        assert_eq!(Money::new(dec!(-3)).clamp_non_negative(), Money::zero());
    }

    #[test]
    fn test_canonical_ignores_trailing_zeros() {
        assert_eq!(
            Money::new(dec!(1.0)).canonical(),
            Money::new(dec!(1.00)).canonical()
        );
    }

    #[test]
    fn test_tax_rate_bounds() {
        assert!(TaxRate::from_fraction(dec!(0.07)).is_ok());
        assert!(TaxRate::from_fraction(dec!(1)).is_ok());
        assert!(TaxRate::from_fraction(dec!(1.5)).is_err());
        assert!(TaxRate::from_fraction(dec!(-0.01)).is_err());
        assert_eq!(TaxRate::from_bps(825).fraction(), dec!(0.0825));
    }

    #[test]
    fn test_quantity() {
        assert!(Quantity::new(dec!(-1)).is_err());
        assert!(Quantity::new(dec!(0)).unwrap().is_zero());
        assert!(Quantity::new(dec!(2)).unwrap().is_whole());
        assert!(!Quantity::new(dec!(1.5)).unwrap().is_whole());

        let three = Quantity::from(3u32);
        assert_eq!(
            three.checked_reduce(Quantity::from(1u32)),
            Some(Quantity::from(2u32))
        );
        assert_eq!(three.checked_reduce(Quantity::from(3u32)), None);
        assert_eq!(three.checked_reduce(Quantity::from(5u32)), None);
    }
}
