//! # Pricing Configuration
//!
//! Numeric policies that change how a cart computes and validates.
//! Loading these from files or the environment is a `till-session`
//! concern; this module only defines the values and their defaults.
//!
//! ## Policies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price_mode              decimal | cents   (display rounding scale)     │
//! │  fractional_quantities   false             (1.5 kg allowed when true)   │
//! │  allow_multiple_coupons  false             (adding replaces when false) │
//! │  default_tax_rate        0                 (rate for Cart::entry)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::TaxRate;

// =============================================================================
// Price Mode
// =============================================================================

/// How monetary amounts are denominated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceMode {
    /// Amounts are major units with two decimal places (`10.99`).
    #[default]
    Decimal,
    /// Amounts are integer minor units (`1099`).
    Cents,
}

impl PriceMode {
    /// Decimal places kept when rounding for display.
    pub const fn scale(&self) -> u32 {
        match self {
            PriceMode::Decimal => 2,
            PriceMode::Cents => 0,
        }
    }

    /// Factor that converts a stored amount into major units.
    pub fn major_unit_divisor(&self) -> Decimal {
        match self {
            PriceMode::Decimal => Decimal::ONE,
            PriceMode::Cents => Decimal::ONE_HUNDRED,
        }
    }
}

impl std::fmt::Display for PriceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceMode::Decimal => write!(f, "decimal"),
            PriceMode::Cents => write!(f, "cents"),
        }
    }
}

impl std::str::FromStr for PriceMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "decimal" | "major" => Ok(PriceMode::Decimal),
            "cents" | "minor" | "integer" => Ok(PriceMode::Cents),
            other => Err(CoreError::Validation(
                crate::error::ValidationError::NotAllowed {
                    field: "price_mode".to_string(),
                    value: other.to_string(),
                    allowed: vec!["decimal".to_string(), "cents".to_string()],
                },
            )),
        }
    }
}

// =============================================================================
// Pricing Configuration
// =============================================================================

/// Cart-wide pricing policies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Denomination of every amount in the cart.
    #[serde(default)]
    pub price_mode: PriceMode,

    /// Accept quantities with a fractional part.
    #[serde(default)]
    pub fractional_quantities: bool,

    /// Keep every added coupon instead of replacing the set.
    #[serde(default)]
    pub allow_multiple_coupons: bool,

    /// Tax rate given to entries created through `Cart::entry`.
    #[serde(default)]
    pub default_tax_rate: TaxRate,
}

impl PricingConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        TaxRate::from_fraction(self.default_tax_rate.fraction())?;
        Ok(())
    }
}
