//! # till-session: Cart Collaborators for Till
//!
//! Everything `till-core` deliberately leaves out: configuration files,
//! persistence, event delivery and display formatting, plus the
//! [`CartSession`] that strings them together.
//!
//! ## Module Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        till-session Modules                             │
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐   │
//! │  │   config    │  │   store     │  │   events    │  │   format    │   │
//! │  │ TillConfig  │  │ CartStore   │  │ Tracing...  │  │ PlainFmt    │   │
//! │  │ TOML + env  │  │ Memory/JSON │  │ Recording.. │  │ rusty-money │   │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └─────────────┘   │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │ session: CartSession<S: CartStore, E: EventSink>                  │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use till_core::{CartEntry, Money, MoneyFormatter};
//! use till_session::{CartSession, MemoryStore, TillConfig, TracingEvents};
//!
//! let config = TillConfig::default();
//! let session = CartSession::new("register-1", config.pricing.clone(), MemoryStore::new(), TracingEvents);
//!
//! session
//!     .add_entry(CartEntry::new("sku-1", "Coffee", Money::new(Decimal::new(350, 2))))
//!     .unwrap();
//!
//! let totals = session.totals().unwrap();
//! let text = config
//!     .formatter()
//!     .unwrap()
//!     .format(totals.total, &config.format.locale, false);
//! assert_eq!(text, "$3.50");
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod session;
pub mod store;

pub use config::{FormatSettings, StoreSettings, TillConfig};
pub use error::{SessionError, SessionResult};
pub use events::{RecordingEvents, TracingEvents};
pub use format::PlainFormatter;
pub use session::{generate_instance_key, CartSession, DEFAULT_INSTANCE};
pub use store::{CartStore, JsonFileStore, MemoryStore};
