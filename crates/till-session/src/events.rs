//! # Event Sinks
//!
//! [`EventSink`] implementations. Both are fire-and-forget: they never
//! return errors to the cart operation that emitted the event.

use std::sync::Mutex;
use till_core::{CartEvent, EventSink};
use tracing::{info, warn};

/// Logs every cart event at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn notify(&self, event: &CartEvent) {
        match event {
            CartEvent::EntryAdded(entry)
            | CartEvent::EntryRemoved(entry)
            | CartEvent::EntryUpdated(entry) => info!(
                event = event.name(),
                hash = %entry.identity(),
                identifier = entry.identifier(),
                quantity = %entry.quantity(),
                "Cart event"
            ),
            CartEvent::CouponAdded(coupon) | CartEvent::CouponRemoved(coupon) => info!(
                event = event.name(),
                code = coupon.code(),
                value = %coupon.display_value(),
                "Cart event"
            ),
            CartEvent::FeeAdded(fee) | CartEvent::FeeRemoved(fee) => info!(
                event = event.name(),
                fee = %fee.name,
                amount = %fee.amount,
                "Cart event"
            ),
            CartEvent::CartEmptied | CartEvent::CartDestroyed => {
                info!(event = event.name(), "Cart event")
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<CartEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of the recorded events.
    pub fn events(&self) -> Vec<CartEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Names of the recorded events (`entryAdded`, ...).
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(CartEvent::name).collect()
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl EventSink for RecordingEvents {
    fn notify(&self, event: &CartEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(_) => warn!(event = event.name(), "Event recorder poisoned, dropping event"),
        }
    }
}
