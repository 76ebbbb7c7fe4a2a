//! # Totals Aggregator
//!
//! Read-only view over a [`Cart`] at a fixed instant. Nothing here
//! mutates the cart, and nothing is cached: each call recomputes from the
//! current entries, fees and coupons.
//!
//! ## Tax After Discount
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Cart Discount Proration (insertion order)              │
//! │                                                                         │
//! │  D = discount_total()                                                  │
//! │                                                                         │
//! │  entries:   [    A: 5     ][    B: 5     ]                             │
//! │  D = 7:     [ ███████████ ][ ████ |      ]                             │
//! │              fully covered   2 of B  3 of B taxed                      │
//! │                                                                         │
//! │  consumed ≥ D            → full tax on the entry                       │
//! │  consumed + subtotal > D → tax on (subtotal − (D − consumed))          │
//! │  otherwise               → entry fully covered, no tax                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The first check is `>=` and the second is strict `>`. An entry that is
//! exactly consumed by the discount owes no tax.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::coupon::DiscountBasis;
use crate::money::{Money, Quantity};

/// Snapshot of every cart total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    /// Entries before cart-level discounts.
    pub sub_total: Money,
    /// Cart-level coupon discounts.
    pub discount_total: Money,
    /// Fee amounts without tax.
    pub fee_total: Money,
    /// Entry tax after discount proration, plus fee tax.
    pub tax_total: Money,
    /// `sub_total − discount_total + fee_total + tax_total`.
    pub total: Money,
    pub entry_count: u32,
    pub quantity_total: Quantity,
}

/// Totals over one cart, evaluated at `now`.
#[derive(Debug, Clone, Copy)]
pub struct Totals<'a> {
    cart: &'a Cart,
    now: DateTime<Utc>,
}

impl<'a> Totals<'a> {
    pub fn new(cart: &'a Cart, now: DateTime<Utc>) -> Self {
        Totals { cart, now }
    }

    /// Sum of entry subtotals without any discount.
    fn gross(&self) -> Money {
        self.cart.entries().iter().map(|e| e.subtotal(false)).sum()
    }

    /// Discount granted by each cart-level coupon, in insertion order.
    ///
    /// Each coupon can only take what earlier coupons left of the
    /// entry-discounted subtotal.
    pub fn coupon_discounts(&self) -> Vec<(&'a str, Money)> {
        let gross = self.gross();
        let mut available: Money = self.cart.entries().iter().map(|e| e.subtotal(true)).sum();
        let mut discounts = Vec::new();

        for coupon in self.cart.coupons().iter().filter(|c| c.applies_at_cart_level()) {
            let amount = coupon.discount(&DiscountBasis {
                eligibility_subtotal: gross,
                percentage_base: gross,
                available,
                now: self.now,
            });
            available -= amount;
            discounts.push((coupon.code(), amount));
        }
        discounts
    }

    /// Sum of cart-level coupon discounts.
    pub fn discount_total(&self) -> Money {
        self.coupon_discounts().into_iter().map(|(_, amount)| amount).sum()
    }

    /// Entry subtotals, minus entry and cart-level discounts when
    /// `with_discount`.
    pub fn sub_total(&self, with_discount: bool) -> Money {
        let entries: Money = self
            .cart
            .entries()
            .iter()
            .map(|e| e.subtotal(with_discount))
            .sum();
        if with_discount {
            entries - self.discount_total()
        } else {
            entries
        }
    }

    /// Fee amounts, with each taxable fee's tax when `with_tax`.
    pub fn fee_totals(&self, with_tax: bool) -> Money {
        self.cart.fees().map(|fee| fee.total(with_tax)).sum()
    }

    /// Entry tax after prorating the cart discount, plus fee tax.
    pub fn tax_total(&self) -> Money {
        let discount = self.discount_total();
        let mut consumed = Money::zero();
        let mut tax = Money::zero();

        for entry in self.cart.entries() {
            if consumed >= discount {
                tax += entry.tax();
                continue;
            }

            let subtotal = entry.subtotal(false);
            if consumed + subtotal > discount {
                let remaining = discount - consumed;
                tax += entry.tax_on(subtotal - remaining);
            }
            consumed += subtotal;
        }

        tax + self.cart.fees().map(|fee| fee.tax()).sum::<Money>()
    }

    /// `sub_total(with_discount) + fee_totals(false) + tax_total()` (tax only
    /// when `with_tax`).
    pub fn total(&self, with_discount: bool, with_tax: bool) -> Money {
        let tax = if with_tax {
            self.tax_total()
        } else {
            Money::zero()
        };
        self.sub_total(with_discount) + self.fee_totals(false) + tax
    }

    pub fn summary(&self) -> CartTotals {
        let sub_total = self.sub_total(false);
        let discount_total = self.discount_total();
        let fee_total = self.fee_totals(false);
        let tax_total = self.tax_total();

        CartTotals {
            sub_total,
            discount_total,
            fee_total,
            tax_total,
            total: self.total(true, true),
            entry_count: u32::try_from(self.cart.entry_count()).unwrap_or(u32::MAX),
            quantity_total: self.cart.quantity_total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
