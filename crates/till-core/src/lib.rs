//! # till-core: Pure Cart Pricing for Till
//!
//! This crate holds every pricing rule of the Till shopping cart as pure
//! data and functions: entries, modifiers, coupons, fees, tax and totals.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Caller (web handler, POS UI, CLI)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-session (collaborators)                    │   │
//! │  │    CartSession: load ──► mutate ──► notify ──► store           │   │
//! │  │    TillConfig • CartStore • TracingEvents • PlainFormatter      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   entry   │  │  coupon   │  │  totals   │  │   │
//! │  │   │  Money    │  │ CartEntry │  │  Coupon   │  │  Totals   │  │   │
//! │  │   │  TaxRate  │  │ Modifier  │  │   Fee     │  │ proration │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO FORMATTING • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money, TaxRate and Quantity on exact decimals
//! - [`options`] - Option bags attached to entries and modifiers
//! - [`identity`] - Identity hashing for merge/lookup
//! - [`entry`] / [`modifier`] - The entry and modifier tree
//! - [`coupon`] / [`fee`] - Discounts and flat charges
//! - [`cart`] - The aggregate root
//! - [`totals`] - Subtotal, discount, tax and total
//! - [`events`] / [`catalog`] / [`format`] - Collaborator contracts
//! - [`config`] - Cart-wide pricing policies
//! - [`error`] / [`validation`] - Error types and field coercion
//!
//! ## Design Principles
//!
//! 1. **Exact Money**: Decimal arithmetic, no floats, no rounding until display
//! 2. **No I/O**: Persistence, notification and formatting are collaborators
//! 3. **Owned Trees**: Entries own modifiers own entries; no back-references
//! 4. **Explicit Errors**: Field writes fail typed and leave state untouched
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use till_core::{Cart, CartEntry, Money, TaxRate};
//!
//! let mut cart = Cart::new("default");
//! let soda = CartEntry::new("sku-soda", "Soda", Money::new(Decimal::new(100, 2)))
//!     .with_tax_rate(TaxRate::from_bps(700));
//! cart.add_entry(soda).unwrap();
//!
//! // $1.00 at 7% = $1.07
//! assert_eq!(cart.totals().total(true, true), Money::new(Decimal::new(107, 2)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod config;
pub mod coupon;
pub mod entry;
pub mod error;
pub mod events;
pub mod fee;
pub mod format;
pub mod identity;
pub mod modifier;
pub mod money;
pub mod options;
pub mod totals;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{AddedEntry, Cart, EntryChange};
pub use catalog::{CatalogRecord, CatalogResolver, StaticCatalog};
pub use config::{PriceMode, PricingConfig};
pub use coupon::{CheckMode, Coupon, CouponKind, DiscountBasis};
pub use entry::CartEntry;
pub use error::{CoreError, CoreResult, ValidationError};
pub use events::{CartEvent, EventSink, NoopEvents};
pub use fee::Fee;
pub use format::MoneyFormatter;
pub use identity::IdentityHash;
pub use modifier::Modifier;
pub use money::{Money, Quantity, TaxRate};
pub use options::OptionBag;
pub use totals::{CartTotals, Totals};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of an entry display name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of a coupon code or fee name.
///
/// ## Business Reason
/// Codes are typed at a register or pasted from a receipt; anything longer
/// is a paste error.
pub const MAX_CODE_LENGTH: usize = 50;

/// Largest absolute unit price, price delta, fee or coupon amount (major
/// units) a cart accepts.
///
/// ## Business Reason
/// Keeps `price × quantity` and the sums over a cart far inside the range
/// of `Decimal`, so pricing arithmetic never overflows.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Largest quantity a single row can hold.
pub const MAX_QUANTITY: i64 = 1_000_000;
