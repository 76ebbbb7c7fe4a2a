//! # Cart Session
//!
//! One load → mutate → notify → store cycle per call, with the store and
//! event sink passed in explicitly. Nothing here is global: two sessions
//! with different instance keys never see each other's carts.
//!
//! ## Operation Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CartSession::add_entry(entry)                        │
//! │                                                                         │
//! │  store.load(key) ──► None? Cart::new(key) ──► cart.add_entry(entry)    │
//! │                                                    │                    │
//! │                                                    ▼                    │
//! │                        events.notify(EntryAdded) ──► store.store(key)   │
//! │                                                                         │
//! │  A failed mutation stores nothing and emits nothing.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Calls for the same key from several threads are not serialized here;
//! the store decides (both bundled stores are last-writer-wins).

use chrono::{DateTime, Utc};
use serde_json::Value;
use till_core::{
    AddedEntry, Cart, CartEntry, CartEvent, CartTotals, Coupon, EntryChange, EventSink, Fee,
    IdentityHash, Money, PricingConfig, Quantity,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::store::CartStore;

/// Instance key used when the caller has no session of its own.
pub const DEFAULT_INSTANCE: &str = "default";

/// Generates a fresh instance key (UUID v4).
pub fn generate_instance_key() -> String {
    Uuid::new_v4().to_string()
}

/// Cart operations bound to one instance key.
#[derive(Debug)]
pub struct CartSession<S: CartStore, E: EventSink> {
    instance: String,
    config: PricingConfig,
    store: S,
    events: E,
}

impl<S: CartStore, E: EventSink> CartSession<S, E> {
    pub fn new(instance: impl Into<String>, config: PricingConfig, store: S, events: E) -> Self {
        CartSession {
            instance: instance.into(),
            config,
            store,
            events,
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Loads the stored cart, or a new empty one. The session's pricing
    /// config always wins over the stored one.
    fn load(&self) -> SessionResult<Cart> {
        let cart = match self.store.load(&self.instance)? {
            Some(cart) => cart,
            None => {
                debug!(instance = %self.instance, "Starting new cart");
                Cart::new(self.instance.clone())
            }
        };
        Ok(cart.with_config(self.config.clone()))
    }

    fn commit(&self, cart: &Cart, events: impl IntoIterator<Item = CartEvent>) -> SessionResult<()> {
        for event in events {
            self.events.notify(&event);
        }
        self.store.store(&self.instance, cart)
    }

    fn change_event(cart: &Cart, change: &EntryChange) -> Option<CartEvent> {
        match change {
            EntryChange::Updated(hash) => cart.get_entry(hash).cloned().map(CartEvent::EntryUpdated),
            EntryChange::Removed(entry) => Some(CartEvent::EntryRemoved(entry.clone())),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the current cart.
    pub fn cart(&self) -> SessionResult<Cart> {
        self.load()
    }

    pub fn totals(&self) -> SessionResult<CartTotals> {
        self.totals_at(Utc::now())
    }

    pub fn totals_at(&self, now: DateTime<Utc>) -> SessionResult<CartTotals> {
        Ok(self.load()?.totals_at(now).summary())
    }

    // =========================================================================
    // Entries
    // =========================================================================

    pub fn add_entry(&self, entry: CartEntry) -> SessionResult<AddedEntry> {
        let mut cart = self.load()?;
        let added = cart.add_entry(entry)?;
        let event = cart
            .get_entry(&added.hash)
            .cloned()
            .map(CartEvent::EntryAdded);
        self.commit(&cart, event)?;
        Ok(added)
    }

    pub fn update_entry(&self, hash: &IdentityHash, key: &str, value: Value) -> SessionResult<EntryChange> {
        let mut cart = self.load()?;
        let change = cart.update_entry(hash, key, value)?;
        self.commit(&cart, Self::change_event(&cart, &change))?;
        Ok(change)
    }

    /// Removes a row. Absent rows are a no-op: nothing is emitted or stored.
    pub fn remove_entry(&self, hash: &IdentityHash) -> SessionResult<Option<CartEntry>> {
        let mut cart = self.load()?;
        let removed = cart.remove_entry(hash);
        if let Some(entry) = &removed {
            self.commit(&cart, [CartEvent::EntryRemoved(entry.clone())])?;
        }
        Ok(removed)
    }

    pub fn decrement(&self, hash: &IdentityHash, amount: Quantity) -> SessionResult<EntryChange> {
        let mut cart = self.load()?;
        let change = cart.decrement(hash, amount)?;
        self.commit(&cart, Self::change_event(&cart, &change))?;
        Ok(change)
    }

    // =========================================================================
    // Fees
    // =========================================================================

    pub fn add_fee(&self, fee: Fee) -> SessionResult<()> {
        let mut cart = self.load()?;
        cart.add_fee(fee.clone())?;
        self.commit(&cart, [CartEvent::FeeAdded(fee)])
    }

    pub fn remove_fee(&self, name: &str) -> SessionResult<Option<Fee>> {
        let mut cart = self.load()?;
        let removed = cart.remove_fee(name);
        if let Some(fee) = &removed {
            self.commit(&cart, [CartEvent::FeeRemoved(fee.clone())])?;
        }
        Ok(removed)
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Adds a coupon. Every displaced coupon is reported as removed
    /// before the addition.
    pub fn add_coupon(&self, coupon: Coupon) -> SessionResult<()> {
        let mut cart = self.load()?;
        let displaced = cart.add_coupon(coupon.clone())?;
        let events = displaced
            .into_iter()
            .map(CartEvent::CouponRemoved)
            .chain(std::iter::once(CartEvent::CouponAdded(coupon)));
        self.commit(&cart, events)
    }

    pub fn remove_coupon(&self, code: &str) -> SessionResult<Option<Coupon>> {
        let mut cart = self.load()?;
        let removed = cart.remove_coupon(code);
        if let Some(coupon) = &removed {
            self.commit(&cart, [CartEvent::CouponRemoved(coupon.clone())])?;
        }
        Ok(removed)
    }

    pub fn apply_coupon_to_entry(&self, hash: &IdentityHash, code: &str) -> SessionResult<Money> {
        self.apply_coupon_to_entry_at(hash, code, Utc::now())
    }

    pub fn apply_coupon_to_entry_at(
        &self,
        hash: &IdentityHash,
        code: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<Money> {
        let mut cart = self.load()?;
        let amount = cart.apply_coupon_to_entry(hash, code, now)?;
        let entry = cart
            .get_entry(hash)
            .cloned()
            .ok_or_else(|| SessionError::Core(till_core::CoreError::EntryNotFound(hash.to_string())))?;
        self.commit(&cart, [CartEvent::EntryUpdated(entry)])?;
        Ok(amount)
    }

    // =========================================================================
    // Whole Cart
    // =========================================================================

    /// Drops every row; fees and coupons stay.
    pub fn empty(&self) -> SessionResult<()> {
        let mut cart = self.load()?;
        cart.empty();
        self.commit(&cart, [CartEvent::CartEmptied])
    }

    /// Drops the cart and removes it from the store.
    pub fn destroy(&self) -> SessionResult<()> {
        let mut cart = self.load()?;
        cart.destroy();
        self.events.notify(&CartEvent::CartDestroyed);
        self.store.destroy(&self.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingEvents;
    use crate::store::{JsonFileStore, MemoryStore};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use till_core::{CoreError, TaxRate};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn soda() -> CartEntry {
        CartEntry::new("sku-soda", "Soda", Money::new(dec!(1.00))).with_tax_rate(TaxRate::from_bps(700))
    }

    fn session<'a>(
        store: &'a MemoryStore,
        events: &'a RecordingEvents,
    ) -> CartSession<&'a MemoryStore, &'a RecordingEvents> {
        CartSession::new(DEFAULT_INSTANCE, PricingConfig::default(), store, events)
    }

    #[test]
    fn test_add_entry_persists_and_notifies() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);

        let added = session.add_entry(soda()).unwrap();
        session.add_entry(soda()).unwrap();

        let cart = store.load(DEFAULT_INSTANCE).unwrap().unwrap();
        assert_eq!(cart.get_entry(&added.hash).unwrap().quantity(), Quantity::from(2u32));
        assert_eq!(events.names(), vec!["entryAdded", "entryAdded"]);

        let totals = session.totals_at(now()).unwrap();
        assert_eq!(totals.total, Money::new(dec!(2.14)));
    }

    #[test]
    fn test_failed_mutation_stores_nothing() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);
        let added = session.add_entry(soda()).unwrap();
        events.clear();

        let err = session
            .update_entry(&added.hash, "price", json!("free"))
            .unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::InvalidPrice(_))));
        assert!(events.events().is_empty());
        assert_eq!(
            store.load(DEFAULT_INSTANCE).unwrap().unwrap().entries()[0].unit_price(),
            Money::new(dec!(1.00))
        );
    }

    #[test]
    fn test_update_and_decrement_events() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);
        let added = session.add_entry(soda()).unwrap();

        let change = session.update_entry(&added.hash, "quantity", json!(3)).unwrap();
        assert_eq!(change, EntryChange::Updated(added.hash.clone()));

        session.decrement(&added.hash, Quantity::one()).unwrap();
        let change = session.decrement(&added.hash, Quantity::from(2u32)).unwrap();
        assert!(matches!(change, EntryChange::Removed(_)));

        assert_eq!(
            events.names(),
            vec!["entryAdded", "entryUpdated", "entryUpdated", "entryRemoved"]
        );
        assert!(session.cart().unwrap().is_empty());
    }

    #[test]
    fn test_remove_absent_entry_is_silent() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);

        assert!(session.remove_entry(&IdentityHash::from("nope")).unwrap().is_none());
        assert!(events.events().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_coupon_replacement_events() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);

        session.add_coupon(Coupon::fixed("A", Money::new(dec!(1)))).unwrap();
        session.add_coupon(Coupon::fixed("B", Money::new(dec!(2)))).unwrap();
        assert_eq!(
            events.names(),
            vec!["couponAdded", "couponRemoved", "couponAdded"]
        );

        let cart = session.cart().unwrap();
        assert_eq!(cart.coupons().len(), 1);
        assert!(cart.coupon("B").is_some());

        assert!(session.remove_coupon("B").unwrap().is_some());
        assert!(session.remove_coupon("B").unwrap().is_none());
    }

    #[test]
    fn test_entry_coupon_and_fees() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);

        let added = session
            .add_entry(soda().with_quantity(Quantity::from(10u32)))
            .unwrap();
        session
            .add_coupon(Coupon::fixed("TWO", Money::new(dec!(2))).for_entry())
            .unwrap();
        let amount = session
            .apply_coupon_to_entry_at(&added.hash, "TWO", now())
            .unwrap();
        assert_eq!(amount, Money::new(dec!(2)));

        session
            .add_fee(Fee::new("delivery", Money::new(dec!(3))))
            .unwrap();
        let totals = session.totals_at(now()).unwrap();
        assert_eq!(totals.sub_total, Money::new(dec!(10)));
        // 8 discounted + 0.56 tax + 3 fee
        assert_eq!(totals.total, Money::new(dec!(11.56)));

        assert!(session.remove_fee("delivery").unwrap().is_some());
        assert_eq!(events.names().last(), Some(&"feeRemoved"));
    }

    #[test]
    fn test_empty_and_destroy() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let session = session(&store, &events);
        session.add_entry(soda()).unwrap();
        session.add_fee(Fee::new("bag", Money::new(dec!(0.10)))).unwrap();

        session.empty().unwrap();
        let cart = session.cart().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.fees().count(), 1);

        session.destroy().unwrap();
        assert!(store.load(DEFAULT_INSTANCE).unwrap().is_none());
        assert_eq!(events.names().last(), Some(&"cartDestroyed"));
    }

    #[test]
    fn test_instances_are_isolated() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let first = CartSession::new(generate_instance_key(), PricingConfig::default(), &store, &events);
        let second = CartSession::new(generate_instance_key(), PricingConfig::default(), &store, &events);
        assert_ne!(first.instance(), second.instance());

        first.add_entry(soda()).unwrap();
        assert!(second.cart().unwrap().is_empty());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_session_config_applies_to_stored_cart() {
        let store = MemoryStore::new();
        let events = RecordingEvents::new();
        let strict = session(&store, &events);
        let half = Quantity::new(dec!(0.5)).unwrap();
        assert!(strict.add_entry(soda().with_quantity(half)).is_err());

        let deli = CartSession::new(
            DEFAULT_INSTANCE,
            PricingConfig {
                fractional_quantities: true,
                ..PricingConfig::default()
            },
            &store,
            &events,
        );
        assert!(deli.add_entry(soda().with_quantity(half)).is_ok());
    }

    #[test]
    fn test_json_store_survives_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let events = RecordingEvents::new();
        let added = {
            let session = CartSession::new(
                "till-1",
                PricingConfig::default(),
                JsonFileStore::new(dir.path()),
                &events,
            );
            session.add_entry(soda()).unwrap()
        };

        let reopened = CartSession::new(
            "till-1",
            PricingConfig::default(),
            JsonFileStore::new(dir.path()),
            &events,
        );
        let cart = reopened.cart().unwrap();
        assert_eq!(cart.get_entry(&added.hash).map(|e| e.display_name()), Some("Soda"));
    }
}
