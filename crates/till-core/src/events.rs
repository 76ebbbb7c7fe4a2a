//! # Cart Events
//!
//! Named notifications emitted after a cart mutation. Delivery is
//! fire-and-forget: a sink cannot fail the operation that produced the
//! event, and a cart with no sink behaves identically.

use serde::{Deserialize, Serialize};

use crate::coupon::Coupon;
use crate::entry::CartEntry;
use crate::fee::Fee;

/// A cart mutation, carrying the affected entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum CartEvent {
    EntryAdded(CartEntry),
    EntryRemoved(CartEntry),
    EntryUpdated(CartEntry),
    CouponAdded(Coupon),
    CouponRemoved(Coupon),
    FeeAdded(Fee),
    FeeRemoved(Fee),
    CartEmptied,
    CartDestroyed,
}

impl CartEvent {
    /// Wire name of the event (`entryAdded`, `cartEmptied`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            CartEvent::EntryAdded(_) => "entryAdded",
            CartEvent::EntryRemoved(_) => "entryRemoved",
            CartEvent::EntryUpdated(_) => "entryUpdated",
            CartEvent::CouponAdded(_) => "couponAdded",
            CartEvent::CouponRemoved(_) => "couponRemoved",
            CartEvent::FeeAdded(_) => "feeAdded",
            CartEvent::FeeRemoved(_) => "feeRemoved",
            CartEvent::CartEmptied => "cartEmptied",
            CartEvent::CartDestroyed => "cartDestroyed",
        }
    }
}

/// Receives cart events.
pub trait EventSink {
    fn notify(&self, event: &CartEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl EventSink for NoopEvents {
    fn notify(&self, _event: &CartEvent) {}
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn notify(&self, event: &CartEvent) {
        (**self).notify(event)
    }
}
