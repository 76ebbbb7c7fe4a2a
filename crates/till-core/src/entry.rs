//! # Cart Entry
//!
//! One purchasable row: quantity, unit price, tax policy, option bag,
//! modifier tree and entry-level discount state.
//!
//! ## Entry Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Entry Price Flow                                 │
//! │                                                                         │
//! │  unit_price ─────┐                                                      │
//! │                  ├──► price (per unit) ──► × quantity ──► subtotal      │
//! │  Σ modifier ─────┘         │                                  │         │
//! │  (per unit)                ▼                                  ▼         │
//! │                  × (1 + tax_rate)                  − discount_amount    │
//! │                  when taxable                      (with_discount)      │
//! │                                                                         │
//! │  modifiers_total = Σ modifier.price × entry quantity                   │
//! │  modifiers scale with the OWNING entry's quantity, not their own       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every successful mutation recomputes the identity hash, even for
//! fields that do not participate in it. Distinct-line entries keep their
//! random identity for their whole life.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::CatalogResolver;
use crate::config::PricingConfig;
use crate::error::{CoreError, CoreResult};
use crate::identity::{compute_identity, random_identity, EntryFingerprint, IdentityHash};
use crate::modifier::Modifier;
use crate::money::{Money, Quantity, TaxRate};
use crate::options::OptionBag;
use crate::validation::{
    check_quantity, coerce_price, coerce_quantity, coerce_tax_rate, coerce_taxable,
    validate_display_name,
};

// =============================================================================
// Cart Entry
// =============================================================================

/// A purchasable line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    /// External catalog key.
    identifier: String,
    display_name: String,
    quantity: Quantity,
    unit_price: Money,
    taxable: bool,
    tax_rate: TaxRate,
    #[serde(default)]
    options: OptionBag,
    /// Never merges with another row, even when content-identical.
    #[serde(default)]
    distinct_line: bool,
    #[serde(default)]
    modifiers: Vec<Modifier>,
    #[serde(default)]
    identity: IdentityHash,
    /// Code of the entry-level coupon discounting this row.
    #[serde(default)]
    applied_coupon: Option<String>,
    #[serde(default)]
    discount: Money,
}

impl CartEntry {
    /// Creates a taxable entry with quantity 1 and a zero tax rate.
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>, unit_price: Money) -> Self {
        let mut entry = CartEntry {
            identifier: identifier.into(),
            display_name: display_name.into(),
            quantity: Quantity::one(),
            unit_price,
            taxable: true,
            tax_rate: TaxRate::zero(),
            options: OptionBag::new(),
            distinct_line: false,
            modifiers: Vec::new(),
            identity: IdentityHash::default(),
            applied_coupon: None,
            discount: Money::zero(),
        };
        entry.rehash();
        entry
    }

    /// Creates an entry from a catalog record.
    ///
    /// ## Errors
    /// [`CoreError::ModelNotFound`] when the resolver does not know `identifier`.
    pub fn from_catalog(
        catalog: &dyn CatalogResolver,
        identifier: &str,
        quantity: Quantity,
    ) -> CoreResult<Self> {
        let record = catalog
            .resolve(identifier)
            .ok_or_else(|| CoreError::ModelNotFound(identifier.to_string()))?;

        Ok(CartEntry::new(identifier, record.display_name, record.unit_price)
            .taxable(record.taxable)
            .with_tax_rate(record.tax_rate)
            .with_quantity(quantity))
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self.rehash();
        self
    }

    pub fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self.rehash();
        self
    }

    pub fn taxable(mut self, taxable: bool) -> Self {
        self.taxable = taxable;
        self.rehash();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.set(key, value);
        self.rehash();
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self.rehash();
        self
    }

    /// Marks the entry as a distinct line and gives it a random identity.
    pub fn distinct_line(mut self) -> Self {
        self.distinct_line = true;
        self.identity = random_identity();
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn is_taxable(&self) -> bool {
        self.taxable
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn options(&self) -> &OptionBag {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn is_distinct_line(&self) -> bool {
        self.distinct_line
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn identity(&self) -> &IdentityHash {
        &self.identity
    }

    pub fn applied_coupon(&self) -> Option<&str> {
        self.applied_coupon.as_deref()
    }

    pub fn discount_amount(&self) -> Money {
        self.discount
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Validates and writes a field by name, then recomputes the identity.
    ///
    /// ## Well-Known Fields
    /// ```text
    /// quantity          numeric, ≥ 0, whole unless fractional allowed
    /// price/unit_price  numeric                       → InvalidPrice
    /// taxable           boolean-coercible             → InvalidTaxableValue
    /// tax/tax_rate      numeric fraction in 0..=1     → InvalidTaxRate
    /// name              non-empty string              → Validation
    /// id/identifier     string or number              → Validation
    /// anything else     stored in the option bag
    /// ```
    /// On error the entry is left unchanged.
    pub fn update_field(&mut self, key: &str, value: Value, config: &PricingConfig) -> CoreResult<()> {
        match key {
            "quantity" | "qty" => {
                self.quantity = coerce_quantity(&value, config.fractional_quantities)?;
            }
            "price" | "unit_price" => self.unit_price = coerce_price(&value)?,
            "taxable" => self.taxable = coerce_taxable(&value)?,
            "tax" | "tax_rate" => self.tax_rate = coerce_tax_rate(&value)?,
            "name" | "display_name" => {
                let name = text_value("name", &value)?;
                validate_display_name(&name)?;
                self.display_name = name;
            }
            "id" | "identifier" => self.identifier = text_value("identifier", &value)?,
            _ => {
                self.options.set(key, value);
            }
        }
        self.rehash();
        Ok(())
    }

    /// Checks every amount in the tree against [`MAX_AMOUNT`](crate::MAX_AMOUNT):
    /// the unit price, each modifier delta and every nested entry.
    ///
    /// ## Errors
    /// [`CoreError::InvalidPrice`] naming the first amount out of range.
    pub fn check_amounts(&self) -> CoreResult<()> {
        Money::bounded(self.unit_price.amount())?;
        for modifier in &self.modifiers {
            Money::bounded(modifier.price_delta().amount())?;
            for nested in modifier.nested_entries() {
                nested.check_amounts()?;
            }
        }
        Ok(())
    }

    /// Sets the quantity directly, honoring the fractional policy.
    pub fn set_quantity(&mut self, quantity: Quantity, config: &PricingConfig) -> CoreResult<()> {
        check_quantity(quantity, config.fractional_quantities)?;
        self.quantity = quantity;
        self.rehash();
        Ok(())
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.set(key, value);
        self.rehash();
    }

    pub fn remove_option(&mut self, key: &str) -> Option<Value> {
        let removed = self.options.remove(key);
        self.rehash();
        removed
    }

    pub fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
        self.rehash();
    }

    pub fn remove_modifier(&mut self, index: usize) -> CoreResult<Modifier> {
        if index >= self.modifiers.len() {
            return Err(CoreError::ModifierNotFound { index });
        }
        let removed = self.modifiers.remove(index);
        self.rehash();
        Ok(removed)
    }

    /// Edits a modifier in place, then re-derives both digests.
    pub fn with_modifier_mut<R>(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut Modifier) -> R,
    ) -> CoreResult<R> {
        let modifier = self
            .modifiers
            .get_mut(index)
            .ok_or(CoreError::ModifierNotFound { index })?;
        let result = edit(modifier);
        modifier.rehash();
        self.rehash();
        Ok(result)
    }

    pub(crate) fn add_quantity(&mut self, quantity: Quantity) {
        self.quantity = self.quantity.plus(quantity);
        self.rehash();
    }

    pub(crate) fn apply_discount(&mut self, code: &str, amount: Money) {
        self.applied_coupon = Some(code.to_string());
        self.discount = amount;
        self.rehash();
    }

    pub(crate) fn clear_discount(&mut self) -> Money {
        let released = self.discount;
        self.applied_coupon = None;
        self.discount = Money::zero();
        self.rehash();
        released
    }

    pub(crate) fn set_identity(&mut self, identity: IdentityHash) {
        self.identity = identity;
    }

    /// Re-derives the identity hash. Distinct lines keep their token.
    pub(crate) fn rehash(&mut self) {
        if self.distinct_line {
            if self.identity.is_empty() {
                self.identity = random_identity();
            }
            return;
        }
        self.identity = compute_identity(
            EntryFingerprint {
                identifier: &self.identifier,
                display_name: &self.display_name,
                unit_price: self.unit_price,
                taxable: self.taxable,
                tax_rate: self.tax_rate,
                options: &self.options,
            },
            self.modifiers.iter().map(Modifier::identity),
        );
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Per-unit sum of taxable modifiers (taxed-only view).
    fn taxable_modifiers_per_unit(&self) -> Money {
        self.modifiers
            .iter()
            .filter(|m| m.is_taxable())
            .map(|m| m.price(true))
            .sum()
    }

    /// Sum of modifier prices, scaled by this entry's quantity.
    ///
    /// With `taxed_only`, non-taxable modifiers and non-taxable nested
    /// entries are skipped. With `with_tax`, the entry's tax rate is added
    /// on the taxable modifier portion.
    pub fn modifiers_total(&self, with_tax: bool, taxed_only: bool) -> Money {
        let per_unit: Money = self
            .modifiers
            .iter()
            .filter(|m| !taxed_only || m.is_taxable())
            .map(|m| m.price(taxed_only))
            .sum();
        let total = per_unit.times(self.quantity);

        if !with_tax {
            return total;
        }

        let taxable = self.taxable_modifiers_per_unit().times(self.quantity);
        total + taxable.apply_rate(self.tax_rate)
    }

    /// Per-unit price: unit price plus every modifier's contribution,
    /// times `(1 + tax_rate)` when `with_tax` and the entry is taxable.
    pub fn price(&self, with_tax: bool) -> Money {
        let modifiers: Money = self.modifiers.iter().map(|m| m.price(false)).sum();
        let base = self.unit_price + modifiers;

        if with_tax && self.taxable {
            base + base.apply_rate(self.tax_rate)
        } else {
            base
        }
    }

    /// `price(false) × quantity`, minus the entry discount when requested.
    pub fn subtotal(&self, with_discount: bool) -> Money {
        let gross = self.price(false).times(self.quantity);
        if with_discount {
            gross - self.discount
        } else {
            gross
        }
    }

    /// The part of the line subject to tax: the unit price when the entry
    /// is taxable plus taxable modifiers, times quantity.
    pub fn taxable_base(&self) -> Money {
        let unit = if self.taxable {
            self.unit_price
        } else {
            Money::zero()
        };
        (unit + self.taxable_modifiers_per_unit()).times(self.quantity)
    }

    /// Tax owed on `base` of this line's undiscounted subtotal.
    ///
    /// ```text
    /// tax_on(base) = min(base − discount_amount, taxable_base) × tax_rate
    /// ```
    /// clamped at zero.
    pub fn tax_on(&self, base: Money) -> Money {
        (base - self.discount)
            .clamp_non_negative()
            .min(self.taxable_base())
            .clamp_non_negative()
            .apply_rate(self.tax_rate)
    }

    /// Full tax for this line with no cart-level discount applied.
    pub fn tax(&self) -> Money {
        self.tax_on(self.subtotal(false))
    }
}

/// Accepts strings and numbers as text; anything else is a validation error.
fn text_value(field: &str, value: &Value) -> CoreResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(crate::error::ValidationError::NotAllowed {
            field: field.to_string(),
            value: other.to_string(),
            allowed: vec!["string".to_string(), "number".to_string()],
        }
        .into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
