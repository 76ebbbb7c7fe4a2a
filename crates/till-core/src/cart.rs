//! # Cart Aggregate
//!
//! The aggregate root: ordered entries, fees by name, coupons by code.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cart Operations                                    │
//! │                                                                         │
//! │  add_entry ──────► same identity, not distinct? ──yes──► qty += n      │
//! │                           │ no                                          │
//! │                           └──────────────────────────► push row        │
//! │                                                                         │
//! │  update_entry ───► update_field + rehash (rows never merge here)       │
//! │                                                                         │
//! │  decrement ──────► qty − n > 0 ? reduce : remove row                   │
//! │                                                                         │
//! │  add_coupon ─────► single-coupon mode clears the coupon set first      │
//! │                                                                         │
//! │  remove_coupon ──► unbind entry discounts, then drop the coupon        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! The cart owns every entry, modifier, fee and coupon by value. It
//! performs no I/O and emits no events; callers persist and notify after
//! each mutation (see `till-session`).
//!
//! ## Invariants
//! - No row has quantity zero
//! - Non-distinct rows have pairwise different identities after `add_entry`
//! - A coupon's `already_discounted` equals the sum of entry discounts
//!   bound to its code

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::PricingConfig;
use crate::coupon::{CheckMode, Coupon, DiscountBasis};
use crate::entry::CartEntry;
use crate::error::{CoreError, CoreResult};
use crate::fee::Fee;
use crate::identity::{unique_random_identity, IdentityHash};
use crate::money::{Money, Quantity};
use crate::totals::Totals;
use crate::validation::check_quantity;

// =============================================================================
// Operation Results
// =============================================================================

/// Outcome of [`Cart::add_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedEntry {
    /// Identity of the row that now holds the entry.
    pub hash: IdentityHash,
    /// True when the entry was folded into an existing row.
    pub merged: bool,
}

/// Outcome of an edit that may drop the row.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryChange {
    /// The row is still in the cart under this identity.
    Updated(IdentityHash),
    /// The row reached quantity zero and was removed.
    Removed(CartEntry),
}

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Session instance key the cart is stored under.
    instance: String,
    #[serde(default)]
    config: PricingConfig,
    #[serde(default)]
    entries: Vec<CartEntry>,
    #[serde(default)]
    fees: BTreeMap<String, Fee>,
    /// Insertion order decides the order cart-level discounts are taken.
    #[serde(default)]
    coupons: Vec<Coupon>,
}

impl Cart {
    /// Creates an empty cart with default pricing policies.
    pub fn new(instance: impl Into<String>) -> Self {
        Cart {
            instance: instance.into(),
            config: PricingConfig::default(),
            entries: Vec::new(),
            fees: BTreeMap::new(),
            coupons: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: PricingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Builds an entry carrying the cart's default tax rate.
    pub fn entry(
        &self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        unit_price: Money,
    ) -> CartEntry {
        CartEntry::new(identifier, display_name, unit_price).with_tax_rate(self.config.default_tax_rate)
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Adds an entry, merging it into an identical row when allowed.
    ///
    /// ## Behavior
    /// - Non-distinct entry with the identity of an existing non-distinct
    ///   row: that row's quantity grows by the entry's quantity
    /// - Otherwise: appended; distinct lines get a fresh random identity
    ///   if theirs is already taken
    ///
    /// ## Errors
    /// - [`CoreError::InvalidQuantity`] for a zero quantity, a fractional one
    ///   when the cart does not allow them, or a merge past the row limit
    /// - [`CoreError::InvalidPrice`] for an amount out of range anywhere in
    ///   the entry's tree
    pub fn add_entry(&mut self, mut entry: CartEntry) -> CoreResult<AddedEntry> {
        if entry.quantity().is_zero() {
            return Err(CoreError::InvalidQuantity(
                "0 (an added entry needs a positive quantity)".to_string(),
            ));
        }
        check_quantity(entry.quantity(), self.config.fractional_quantities)?;
        entry.check_amounts()?;

        if entry.is_distinct_line() {
            if entry.identity().is_empty() || self.contains(entry.identity()) {
                let fresh = unique_random_identity(|candidate| self.contains(candidate));
                entry.set_identity(fresh);
            }
        } else {
            entry.rehash();
            let existing = self
                .entries
                .iter()
                .position(|row| !row.is_distinct_line() && row.identity() == entry.identity());

            if let Some(index) = existing {
                let merged = self.entries[index].quantity().plus(entry.quantity());
                check_quantity(merged, self.config.fractional_quantities)?;
                self.entries[index].add_quantity(entry.quantity());
                self.refresh_discount(index);

                let row = &self.entries[index];
                debug!(
                    instance = %self.instance,
                    hash = %row.identity(),
                    quantity = %row.quantity(),
                    "Merged entry into existing row"
                );
                return Ok(AddedEntry {
                    hash: row.identity().clone(),
                    merged: true,
                });
            }
        }

        let hash = entry.identity().clone();
        debug!(instance = %self.instance, hash = %hash, "Appended entry");
        self.entries.push(entry);
        Ok(AddedEntry {
            hash,
            merged: false,
        })
    }

    /// Looks up a row by identity.
    pub fn get_entry(&self, hash: &IdentityHash) -> Option<&CartEntry> {
        self.entries.iter().find(|row| row.identity() == hash)
    }

    /// Looks up a row by the string form of its identity.
    pub fn find(&self, hash: &str) -> Option<&CartEntry> {
        self.entries.iter().find(|row| row.identity().as_str() == hash)
    }

    pub fn entry_by_index(&self, index: usize) -> Option<&CartEntry> {
        self.entries.get(index)
    }

    pub fn contains(&self, hash: &IdentityHash) -> bool {
        self.get_entry(hash).is_some()
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of every row's quantity.
    pub fn quantity_total(&self) -> Quantity {
        self.entries
            .iter()
            .fold(Quantity::zero(), |total, row| total.plus(row.quantity()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, hash: &IdentityHash) -> CoreResult<usize> {
        self.entries
            .iter()
            .position(|row| row.identity() == hash)
            .ok_or_else(|| CoreError::EntryNotFound(hash.to_string()))
    }

    /// Writes one field of a row by name.
    ///
    /// The row is re-keyed in place; if its new identity equals another
    /// row's, the two are NOT merged. Setting the quantity to zero removes
    /// the row.
    pub fn update_entry(&mut self, hash: &IdentityHash, key: &str, value: Value) -> CoreResult<EntryChange> {
        let index = self.position(hash)?;
        self.entries[index].update_field(key, value, &self.config)?;
        self.settle(index)
    }

    /// Edits a row through a closure, then re-keys it.
    ///
    /// An edit that leaves an amount or the quantity out of range is rolled
    /// back and reported.
    pub fn with_entry_mut<R>(
        &mut self,
        hash: &IdentityHash,
        edit: impl FnOnce(&mut CartEntry) -> R,
    ) -> CoreResult<(R, EntryChange)> {
        let index = self.position(hash)?;
        let before = self.entries[index].clone();
        let entry = &mut self.entries[index];
        let result = edit(entry);
        entry.rehash();

        let checked = entry
            .check_amounts()
            .and_then(|()| check_quantity(entry.quantity(), self.config.fractional_quantities));
        if let Err(e) = checked {
            self.entries[index] = before;
            return Err(e);
        }
        Ok((result, self.settle(index)?))
    }

    /// Removes the first row with `hash`. Absent rows are not an error.
    pub fn remove_entry(&mut self, hash: &IdentityHash) -> Option<CartEntry> {
        let index = self.entries.iter().position(|row| row.identity() == hash)?;
        Some(self.take_entry(index))
    }

    /// Lowers a row's quantity by `amount`, removing the row when nothing
    /// would be left.
    pub fn decrement(&mut self, hash: &IdentityHash, amount: Quantity) -> CoreResult<EntryChange> {
        check_quantity(amount, self.config.fractional_quantities)?;
        let index = self.position(hash)?;

        match self.entries[index].quantity().checked_reduce(amount) {
            Some(remaining) => {
                self.entries[index].set_quantity(remaining, &self.config)?;
                self.settle(index)
            }
            None => Ok(EntryChange::Removed(self.take_entry(index))),
        }
    }

    /// Drops a zero-quantity row, otherwise brings its bound discount in
    /// line with the row.
    fn settle(&mut self, index: usize) -> CoreResult<EntryChange> {
        if self.entries[index].quantity().is_zero() {
            return Ok(EntryChange::Removed(self.take_entry(index)));
        }
        self.refresh_discount(index);
        Ok(EntryChange::Updated(self.entries[index].identity().clone()))
    }

    /// Re-derives the discount bound to a row from its live subtotal.
    ///
    /// ```text
    /// percentage coupon   line × value, within the line, capped
    /// fixed coupon        unchanged, clamped to the line
    /// ```
    /// The coupon's `already_discounted` moves by the same difference.
    fn refresh_discount(&mut self, index: usize) {
        let entry = &mut self.entries[index];
        let code = match entry.applied_coupon() {
            Some(code) => code.to_string(),
            None => return,
        };

        let line = entry.subtotal(false).clamp_non_negative();
        let current = entry.discount_amount();
        let coupon = self.coupons.iter_mut().find(|c| c.code() == code);
        let target = coupon
            .as_ref()
            .and_then(|c| c.percentage_of(line))
            .unwrap_or_else(|| current.min(line));
        if target == current {
            return;
        }

        entry.apply_discount(&code, target);
        if let Some(coupon) = coupon {
            coupon.release_discount(current);
            coupon.record_discount(target);
        }
        debug!(
            instance = %self.instance,
            code = %code,
            from = %current,
            to = %target,
            "Refreshed entry discount"
        );
    }

    fn take_entry(&mut self, index: usize) -> CartEntry {
        let mut entry = self.entries.remove(index);
        self.release_entry_discount(&mut entry);
        debug!(instance = %self.instance, hash = %entry.identity(), "Removed entry");
        entry
    }

    fn release_entry_discount(&mut self, entry: &mut CartEntry) {
        if let Some(code) = entry.applied_coupon().map(str::to_string) {
            let released = entry.clear_discount();
            if let Some(coupon) = self.coupons.iter_mut().find(|c| c.code() == code) {
                coupon.release_discount(released);
            }
        }
    }

    /// Drops every row. Fees and coupons stay.
    pub fn empty(&mut self) {
        for coupon in &mut self.coupons {
            let bound = coupon.already_discounted();
            coupon.release_discount(bound);
        }
        self.entries.clear();
        debug!(instance = %self.instance, "Emptied cart");
    }

    /// Drops rows, fees and coupons.
    pub fn destroy(&mut self) {
        self.entries.clear();
        self.fees.clear();
        self.coupons.clear();
        debug!(instance = %self.instance, "Destroyed cart");
    }

    // =========================================================================
    // Fees
    // =========================================================================

    /// Inserts or replaces a fee by name, returning the replaced one.
    pub fn add_fee(&mut self, fee: Fee) -> CoreResult<Option<Fee>> {
        fee.validate()?;
        Ok(self.fees.insert(fee.name.clone(), fee))
    }

    pub fn remove_fee(&mut self, name: &str) -> Option<Fee> {
        self.fees.remove(name)
    }

    pub fn fee(&self, name: &str) -> Option<&Fee> {
        self.fees.get(name)
    }

    pub fn fees(&self) -> impl Iterator<Item = &Fee> {
        self.fees.values()
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Adds a coupon, returning every coupon it displaced.
    ///
    /// ## Behavior
    /// - Single-coupon mode: all existing coupons are removed first
    /// - Multi-coupon mode: a coupon with the same code is replaced in place
    ///
    /// Entry discounts bound to a displaced coupon are unbound.
    pub fn add_coupon(&mut self, coupon: Coupon) -> CoreResult<Vec<Coupon>> {
        coupon.validate()?;

        let displaced_codes: Vec<String> = self
            .coupons
            .iter()
            .filter(|c| !self.config.allow_multiple_coupons || c.code() == coupon.code())
            .map(|c| c.code().to_string())
            .collect();

        let mut displaced = Vec::with_capacity(displaced_codes.len());
        let mut slot = None;
        for code in &displaced_codes {
            self.unbind_coupon(code);
            if let Some(index) = self.coupons.iter().position(|c| c.code() == code) {
                slot.get_or_insert(index);
                displaced.push(self.coupons.remove(index));
            }
        }

        debug!(
            instance = %self.instance,
            code = %coupon.code(),
            displaced = displaced.len(),
            "Added coupon"
        );
        match slot {
            Some(index) if self.config.allow_multiple_coupons => self.coupons.insert(index, coupon),
            _ => self.coupons.push(coupon),
        }
        Ok(displaced)
    }

    /// Unbinds entry discounts referencing `code`, then removes the coupon.
    pub fn remove_coupon(&mut self, code: &str) -> Option<Coupon> {
        self.unbind_coupon(code);
        let index = self.coupons.iter().position(|c| c.code() == code)?;
        Some(self.coupons.remove(index))
    }

    fn unbind_coupon(&mut self, code: &str) {
        for entry in &mut self.entries {
            if entry.applied_coupon() == Some(code) {
                entry.clear_discount();
            }
        }
        if let Some(coupon) = self.coupons.iter_mut().find(|c| c.code() == code) {
            let bound = coupon.already_discounted();
            coupon.release_discount(bound);
        }
    }

    pub fn coupon(&self, code: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|c| c.code() == code)
    }

    pub fn coupons(&self) -> &[Coupon] {
        &self.coupons
    }

    /// Binds an entry-level coupon to a row.
    ///
    /// The discount is computed against the row's undiscounted subtotal;
    /// eligibility is checked strictly against the cart subtotal, the cap
    /// clamps quietly. A discount already on the row is released first.
    ///
    /// ## Errors
    /// - [`CoreError::CouponNotFound`] / [`CoreError::EntryNotFound`]
    /// - [`CoreError::CouponIneligible`] for a cart-level coupon, or when
    ///   the minimum subtotal is not met
    /// - [`CoreError::CouponExpired`] outside the validity window
    pub fn apply_coupon_to_entry(
        &mut self,
        hash: &IdentityHash,
        code: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Money> {
        let coupon_index = self
            .coupons
            .iter()
            .position(|c| c.code() == code)
            .ok_or_else(|| CoreError::CouponNotFound(code.to_string()))?;
        let entry_index = self.position(hash)?;

        if self.coupons[coupon_index].applies_at_cart_level() {
            return Err(CoreError::CouponIneligible {
                reason: format!("Coupon {code} applies to the whole cart"),
            });
        }

        let entry = &self.entries[entry_index];
        let mut candidate = self.coupons[coupon_index].clone();
        if entry.applied_coupon() == Some(code) {
            candidate.release_discount(entry.discount_amount());
        }

        let line = entry.subtotal(false).clamp_non_negative();
        let cart_subtotal: Money = self.entries.iter().map(|row| row.subtotal(false)).sum();
        candidate.can_apply(cart_subtotal, now, CheckMode::Strict)?;
        let amount = candidate.discount(&DiscountBasis {
            eligibility_subtotal: cart_subtotal,
            percentage_base: line,
            available: line,
            now,
        });

        let mut entry = self.entries.remove(entry_index);
        self.release_entry_discount(&mut entry);
        entry.apply_discount(code, amount);
        self.entries.insert(entry_index, entry);
        self.coupons[coupon_index].record_discount(amount);

        debug!(instance = %self.instance, code, amount = %amount, "Applied coupon to entry");
        Ok(amount)
    }

    /// Releases the discount bound to a row, returning its amount.
    pub fn remove_entry_coupon(&mut self, hash: &IdentityHash) -> CoreResult<Money> {
        let index = self.position(hash)?;
        let mut entry = self.entries.remove(index);
        let released = entry.discount_amount();
        self.release_entry_discount(&mut entry);
        self.entries.insert(index, entry);
        Ok(released)
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Totals evaluated now.
    pub fn totals(&self) -> Totals<'_> {
        Totals::new(self, Utc::now())
    }

    /// Totals evaluated at `now` (coupon validity windows).
    pub fn totals_at(&self, now: DateTime<Utc>) -> Totals<'_> {
        Totals::new(self, now)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
