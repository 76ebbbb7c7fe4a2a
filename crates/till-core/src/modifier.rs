//! # Modifier Tree
//!
//! Priced add-ons attached to a cart entry. A modifier can carry full
//! nested entries (a meal deal's drink, a bundle's components), and each
//! nested entry owns its own modifiers.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartEntry ──owns──► Vec<Modifier> ──owns──► Vec<CartEntry> ──► ...    │
//! │                                                                         │
//! │  Children are held by value. No parent pointers, no shared handles:    │
//! │  a cycle cannot be expressed, and cloning an entry deep-copies its     │
//! │  whole tree.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations go through methods that recompute the modifier's identity
//! hash before returning, so a parent entry always sees current digests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::CartEntry;
use crate::error::{CoreError, CoreResult};
use crate::identity::{compute_modifier_identity, IdentityHash};
use crate::money::Money;
use crate::options::OptionBag;
use crate::validation::{coerce_price, coerce_taxable};

/// A priced add-on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    price_delta: Money,
    taxable: bool,
    #[serde(default)]
    options: OptionBag,
    #[serde(default)]
    nested_entries: Vec<CartEntry>,
    #[serde(default)]
    identity: IdentityHash,
}

impl Modifier {
    /// Creates a taxable modifier with the given price delta.
    pub fn new(price_delta: Money) -> Self {
        let mut modifier = Modifier {
            price_delta,
            taxable: true,
            options: OptionBag::new(),
            nested_entries: Vec::new(),
            identity: IdentityHash::default(),
        };
        modifier.rehash();
        modifier
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.set(key, value);
        self.rehash();
        self
    }

    pub fn taxable(mut self, taxable: bool) -> Self {
        self.taxable = taxable;
        self.rehash();
        self
    }

    pub fn with_entry(mut self, entry: CartEntry) -> Self {
        self.nested_entries.push(entry);
        self.rehash();
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn price_delta(&self) -> Money {
        self.price_delta
    }

    pub fn is_taxable(&self) -> bool {
        self.taxable
    }

    pub fn options(&self) -> &OptionBag {
        &self.options
    }

    pub fn nested_entries(&self) -> &[CartEntry] {
        &self.nested_entries
    }

    pub fn identity(&self) -> &IdentityHash {
        &self.identity
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    pub fn set_price_delta(&mut self, price_delta: Money) {
        self.price_delta = price_delta;
        self.rehash();
    }

    pub fn set_taxable(&mut self, taxable: bool) {
        self.taxable = taxable;
        self.rehash();
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

    /// Validates and writes a field by name.
    ///
    /// `price`/`price_delta` must be numeric ([`CoreError::InvalidPrice`]),
    /// `taxable` must be boolean-coercible ([`CoreError::InvalidTaxableValue`]).
    /// Any other key is stored in the option bag.
    pub fn update_field(&mut self, key: &str, value: Value) -> CoreResult<()> {
        match key {
            "price" | "price_delta" => self.price_delta = coerce_price(&value)?,
            "taxable" => self.taxable = coerce_taxable(&value)?,
            _ => {
                self.options.set(key, value);
            }
        }
        self.rehash();
        Ok(())
    }

    pub fn add_entry(&mut self, entry: CartEntry) {
        self.nested_entries.push(entry);
        self.rehash();
    }

    pub fn remove_entry(&mut self, index: usize) -> Option<CartEntry> {
        if index >= self.nested_entries.len() {
            return None;
        }
        let removed = self.nested_entries.remove(index);
        self.rehash();
        Some(removed)
    }

    /// Edits a nested entry in place, then re-derives both digests.
    pub fn with_entry_mut<R>(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut CartEntry) -> R,
    ) -> CoreResult<R> {
        let entry = self
            .nested_entries
            .get_mut(index)
            .ok_or_else(|| CoreError::EntryNotFound(format!("nested entry #{index}")))?;
        let result = edit(entry);
        entry.rehash();
        self.rehash();
        Ok(result)
    }

    pub(crate) fn rehash(&mut self) {
        self.identity = compute_modifier_identity(
            self.price_delta,
            self.taxable,
            &self.options,
            self.nested_entries.iter().map(CartEntry::identity),
        );
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Per-unit price contribution of this modifier.
    ///
    /// ## Rules
    /// ```text
    /// price = price_delta
    ///       + Σ nested.price(without tax)      for each nested entry
    ///         (skipping non-taxable nested entries when taxed_only)
    /// ```
    /// A nested entry contributes its per-unit price; its own quantity is
    /// not applied. Only the owning entry's quantity scales the modifier.
    pub fn price(&self, taxed_only: bool) -> Money {
        let nested: Money = self
            .nested_entries
            .iter()
            .filter(|entry| !taxed_only || entry.is_taxable())
            .map(|entry| entry.price(false))
            .sum();
        self.price_delta + nested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Quantity;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn drink(price: Money, taxable: bool) -> CartEntry {
        CartEntry::new("drink", "Soda", price).taxable(taxable)
    }

    #[test]
    fn test_price_starts_from_delta() {
        let modifier = Modifier::new(Money::new(dec!(1.50)));
        assert_eq!(modifier.price(false), Money::new(dec!(1.50)));

        let discount = Modifier::new(Money::new(dec!(-0.25)));
        assert_eq!(discount.price(false), Money::new(dec!(-0.25)));
    }

    #[test]
    fn test_price_includes_nested_entries() {
        let modifier = Modifier::new(Money::new(dec!(1)))
            .with_entry(drink(Money::new(dec!(2)), true))
            .with_entry(drink(Money::new(dec!(3)), false).with_quantity(Quantity::from(2u32)));

        assert_eq!(modifier.price(false), Money::new(dec!(6)));
        assert_eq!(modifier.price(true), Money::new(dec!(3)));
    }

    #[test]
    fn test_nested_quantity_does_not_scale_price() {
        let nested = drink(Money::new(dec!(2)), true).with_quantity(Quantity::from(3u32));
        let modifier = Modifier::new(Money::new(dec!(1))).with_entry(nested.clone());

        assert_eq!(nested.price(false), Money::new(dec!(2)));
        assert_eq!(modifier.price(false), Money::new(dec!(3)));

        let owner = CartEntry::new("meal", "Meal", Money::new(dec!(5)))
            .with_quantity(Quantity::from(2u32))
            .with_modifier(modifier);
        assert_eq!(owner.subtotal(false), Money::new(dec!(16)));
    }

    #[test]
    fn test_nested_modifiers_recurse() {
        let inner = Modifier::new(Money::new(dec!(0.50)));
        let nested = drink(Money::new(dec!(2)), true).with_modifier(inner);
        let outer = Modifier::new(Money::zero()).with_entry(nested);

        assert_eq!(outer.price(false), Money::new(dec!(2.50)));
    }

    #[test]
    fn test_update_field_validates_and_rehashes() {
        let mut modifier = Modifier::new(Money::new(dec!(1)));
        let before = modifier.identity().clone();

        modifier.update_field("price", json!("2.25")).unwrap();
        assert_eq!(modifier.price_delta(), Money::new(dec!(2.25)));
        assert_ne!(modifier.identity(), &before);

        let after_price = modifier.identity().clone();
        assert!(matches!(
            modifier.update_field("price", json!("free")),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            modifier.update_field("taxable", json!("perhaps")),
            Err(CoreError::InvalidTaxableValue(_))
        ));
        assert_eq!(modifier.identity(), &after_price);
        assert_eq!(modifier.price_delta(), Money::new(dec!(2.25)));

        modifier.update_field("topping", json!("olives")).unwrap();
        assert_eq!(modifier.options().get("topping"), Some(&json!("olives")));
    }

    #[test]
    fn test_identity_changes_with_nested_entries() {
        let plain = Modifier::new(Money::new(dec!(1)));
        let with_drink = plain.clone().with_entry(drink(Money::new(dec!(2)), true));
        assert_ne!(plain.identity(), with_drink.identity());

        let mut edited = with_drink.clone();
        edited
            .with_entry_mut(0, |entry| entry.set_option("ice", false))
            .unwrap();
        assert_ne!(edited.identity(), with_drink.identity());

        assert!(edited.with_entry_mut(5, |_| ()).is_err());
    }

    #[test]
    fn test_remove_entry() {
        let mut modifier =
            Modifier::new(Money::new(dec!(1))).with_entry(drink(Money::new(dec!(2)), true));
        assert!(modifier.remove_entry(3).is_none());
        assert!(modifier.remove_entry(0).is_some());
        assert!(modifier.nested_entries().is_empty());
        assert_eq!(modifier.identity(), Modifier::new(Money::new(dec!(1))).identity());
    }
}
