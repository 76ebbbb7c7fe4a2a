//! # Coupons
//!
//! Closed set of coupon kinds with a shared eligibility gate and cap.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Coupon Discount Pipeline                           │
//! │                                                                         │
//! │  can_apply ──── minimum subtotal ──── validity window                  │
//! │      │  fails → 0 (Quiet) or CouponIneligible / CouponExpired (Strict) │
//! │      ▼                                                                  │
//! │  raw amount                                                             │
//! │  ├── Fixed       min(value − already_discounted, available)            │
//! │  └── Percentage  percentage_base × value, at most available            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  max_discount ── cap, or CouponMaxDiscountExceeded (Strict)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached: every call recomputes from the basis it is handed,
//! so percentage coupons track the live subtotal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_code, validate_fraction};

// =============================================================================
// Check Mode
// =============================================================================

/// How eligibility violations are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Speculative check: violations yield `false` / zero discount.
    #[default]
    Quiet,
    /// Asserted check: violations are errors.
    Strict,
}

// =============================================================================
// Coupon Kind
// =============================================================================

/// The discount rule of a coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponKind {
    /// Flat amount off, capped by the price it is applied against.
    Fixed { value: Money },
    /// Fraction of the subtotal (0.1 = 10%).
    Percentage { value: Decimal },
}

/// Amounts a discount is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountBasis {
    /// Subtotal compared with `minimum_subtotal`.
    pub eligibility_subtotal: Money,
    /// Amount a percentage coupon takes its fraction of.
    pub percentage_base: Money,
    /// Most that can still be discounted.
    pub available: Money,
    pub now: DateTime<Utc>,
}

impl DiscountBasis {
    /// Basis where eligibility, percentage base and availability are the
    /// same amount.
    pub fn uniform(amount: Money, now: DateTime<Utc>) -> Self {
        DiscountBasis {
            eligibility_subtotal: amount,
            percentage_base: amount,
            available: amount,
            now,
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A discount code held by the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    code: String,
    kind: CouponKind,
    applies_at_cart_level: bool,
    /// Sum of entry discounts currently bound to this code.
    #[serde(default)]
    already_discounted: Money,
    #[serde(default)]
    minimum_subtotal: Option<Money>,
    #[serde(default)]
    maximum_discount: Option<Money>,
    #[serde(default)]
    valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    description: Option<String>,
}

impl Coupon {
    fn with_kind(code: impl Into<String>, kind: CouponKind) -> Self {
        Coupon {
            code: code.into(),
            kind,
            applies_at_cart_level: true,
            already_discounted: Money::zero(),
            minimum_subtotal: None,
            maximum_discount: None,
            valid_from: None,
            valid_until: None,
            description: None,
        }
    }

    /// Flat amount off.
    pub fn fixed(code: impl Into<String>, value: Money) -> Self {
        Self::with_kind(code, CouponKind::Fixed { value })
    }

    /// Fraction of the subtotal off.
    pub fn percentage(code: impl Into<String>, value: Decimal) -> Self {
        Self::with_kind(code, CouponKind::Percentage { value })
    }

    pub fn with_minimum_subtotal(mut self, minimum: Money) -> Self {
        self.minimum_subtotal = Some(minimum);
        self
    }

    pub fn with_maximum_discount(mut self, cap: Money) -> Self {
        self.maximum_discount = Some(cap);
        self
    }

    pub fn valid_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Binds the coupon to individual entries instead of the whole cart.
    pub fn for_entry(mut self) -> Self {
        self.applies_at_cart_level = false;
        self
    }

    /// Checks the code and the kind's value.
    pub fn validate(&self) -> CoreResult<()> {
        validate_code("code", &self.code)?;
        match &self.kind {
            CouponKind::Fixed { value } if value.is_negative() => {
                Err(CoreError::InvalidPrice(value.to_string()))
            }
            CouponKind::Fixed { value } => Money::bounded(value.amount()).map(|_| ()),
            CouponKind::Percentage { value } => Ok(validate_fraction("value", *value)?),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> &CouponKind {
        &self.kind
    }

    pub fn applies_at_cart_level(&self) -> bool {
        self.applies_at_cart_level
    }

    pub fn already_discounted(&self) -> Money {
        self.already_discounted
    }

    pub fn minimum_subtotal(&self) -> Option<Money> {
        self.minimum_subtotal
    }

    pub fn maximum_discount(&self) -> Option<Money> {
        self.maximum_discount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `"10%"` for percentages, the plain amount for fixed coupons.
    pub fn display_value(&self) -> String {
        match &self.kind {
            CouponKind::Fixed { value } => value.to_string(),
            CouponKind::Percentage { value } => {
                format!("{}%", (value * Decimal::ONE_HUNDRED).normalize())
            }
        }
    }

    pub(crate) fn record_discount(&mut self, amount: Money) {
        self.already_discounted += amount;
    }

    pub(crate) fn release_discount(&mut self, amount: Money) {
        self.already_discounted = (self.already_discounted - amount).clamp_non_negative();
    }

    // =========================================================================
    // Eligibility
    // =========================================================================

    /// Minimum subtotal and validity window.
    ///
    /// ## Errors (Strict only)
    /// - [`CoreError::CouponIneligible`] when `subtotal` is below the minimum
    /// - [`CoreError::CouponExpired`] when `now` is outside the window
    pub fn can_apply(&self, subtotal: Money, now: DateTime<Utc>, mode: CheckMode) -> CoreResult<bool> {
        if let Some(minimum) = self.minimum_subtotal {
            if subtotal < minimum {
                return reject(
                    mode,
                    CoreError::CouponIneligible {
                        reason: format!(
                            "You must have at least a total of {minimum} to use this coupon"
                        ),
                    },
                );
            }
        }

        if let Some(from) = self.valid_from {
            if now < from {
                return reject(
                    mode,
                    CoreError::CouponExpired {
                        reason: format!("This coupon is not valid until {}", from.to_rfc3339()),
                    },
                );
            }
        }

        if let Some(until) = self.valid_until {
            if now > until {
                return reject(
                    mode,
                    CoreError::CouponExpired {
                        reason: format!("This coupon expired on {}", until.to_rfc3339()),
                    },
                );
            }
        }

        Ok(true)
    }

    /// Applies the coupon's cap to `proposed`.
    ///
    /// A missing or zero cap, or one above `proposed`, leaves `proposed`
    /// unchanged. Otherwise the cap wins (Quiet) or the call fails (Strict).
    pub fn max_discount(&self, proposed: Money, mode: CheckMode) -> CoreResult<Money> {
        let cap = self.maximum_discount.unwrap_or_default();
        if cap.is_zero() || cap > proposed {
            return Ok(proposed);
        }
        match mode {
            CheckMode::Quiet => Ok(cap),
            CheckMode::Strict => Err(CoreError::CouponMaxDiscountExceeded { cap }),
        }
    }

    /// Percentage of `line`, kept within the line and capped quietly.
    /// `None` for fixed coupons, whose bound amount does not follow the line.
    pub(crate) fn percentage_of(&self, line: Money) -> Option<Money> {
        match &self.kind {
            CouponKind::Percentage { value } => {
                let line = line.clamp_non_negative();
                let raw = line.scale(*value).min(line);
                Some(self.max_discount(raw, CheckMode::Quiet).unwrap_or(raw))
            }
            CouponKind::Fixed { .. } => None,
        }
    }

    fn raw_discount(&self, basis: &DiscountBasis) -> Money {
        let available = basis.available.clamp_non_negative();
        match &self.kind {
            CouponKind::Fixed { value } => (*value - self.already_discounted)
                .min(available)
                .clamp_non_negative(),
            CouponKind::Percentage { value } => basis
                .percentage_base
                .scale(*value)
                .min(available)
                .clamp_non_negative(),
        }
    }

    // =========================================================================
    // Discount
    // =========================================================================

    /// Discount in quiet mode: ineligible coupons give zero, the cap clamps.
    pub fn discount(&self, basis: &DiscountBasis) -> Money {
        match self.can_apply(basis.eligibility_subtotal, basis.now, CheckMode::Quiet) {
            Ok(true) => {
                let raw = self.raw_discount(basis);
                self.max_discount(raw, CheckMode::Quiet).unwrap_or(raw)
            }
            _ => Money::zero(),
        }
    }

    /// Discount in strict mode: every violation is an error.
    pub fn try_discount(&self, basis: &DiscountBasis) -> CoreResult<Money> {
        self.can_apply(basis.eligibility_subtotal, basis.now, CheckMode::Strict)?;
        self.max_discount(self.raw_discount(basis), CheckMode::Strict)
    }
}

fn reject(mode: CheckMode, error: CoreError) -> CoreResult<bool> {
    match mode {
        CheckMode::Quiet => Ok(false),
        CheckMode::Strict => Err(error),
    }
}
