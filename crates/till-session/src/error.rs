//! # Session Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Storage     │  │     Cart Logic          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Io             │  │  Core(CoreError)        │ │
//! │  │  ConfigSave...  │  │  Json           │  │                         │ │
//! │  │  TomlDe/TomlSer │  │  InvalidKey     │  │                         │ │
//! │  │                 │  │  StorePoisoned  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use till_core::CoreError;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures of the collaborator layer.
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Cart Logic
    // =========================================================================
    /// Error raised by the pricing core.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Config file is not valid TOML for this schema.
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Config could not be rendered as TOML.
    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored cart is not valid JSON for this schema.
    #[error("Cart serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Instance key cannot be used as a storage key.
    #[error("Invalid instance key: {0:?}")]
    InvalidInstanceKey(String),

    /// A thread panicked while holding the store lock.
    #[error("Cart store lock poisoned")]
    StorePoisoned,
}
