//! # Cart Stores
//!
//! Persistence collaborators. A store maps an instance key to the last
//! cart written under it; it never interprets the cart.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryStore    Mutex<HashMap<key, Cart>>     tests, single process    │
//! │  JsonFileStore  <dir>/<key>.json              survives restarts        │
//! │                                                                         │
//! │  Concurrent writers to the same key: last writer wins.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use till_core::Cart;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};

/// Loads and stores carts by instance key.
pub trait CartStore {
    /// Returns the cart stored under `key`, if any.
    fn load(&self, key: &str) -> SessionResult<Option<Cart>>;

    /// Replaces whatever is stored under `key`.
    fn store(&self, key: &str, cart: &Cart) -> SessionResult<()>;

    /// Forgets `key`. Absent keys are not an error.
    fn destroy(&self, key: &str) -> SessionResult<()>;
}

impl<T: CartStore + ?Sized> CartStore for &T {
    fn load(&self, key: &str) -> SessionResult<Option<Cart>> {
        (**self).load(key)
    }

    fn store(&self, key: &str, cart: &Cart) -> SessionResult<()> {
        (**self).store(key, cart)
    }

    fn destroy(&self, key: &str) -> SessionResult<()> {
        (**self).destroy(key)
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    carts: Mutex<HashMap<String, Cart>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored carts.
    pub fn len(&self) -> SessionResult<usize> {
        Ok(self.carts.lock().map_err(|_| SessionError::StorePoisoned)?.len())
    }

    pub fn is_empty(&self) -> SessionResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl CartStore for MemoryStore {
    fn load(&self, key: &str) -> SessionResult<Option<Cart>> {
        let carts = self.carts.lock().map_err(|_| SessionError::StorePoisoned)?;
        Ok(carts.get(key).cloned())
    }

    fn store(&self, key: &str, cart: &Cart) -> SessionResult<()> {
        let mut carts = self.carts.lock().map_err(|_| SessionError::StorePoisoned)?;
        carts.insert(key.to_string(), cart.clone());
        Ok(())
    }

    fn destroy(&self, key: &str) -> SessionResult<()> {
        let mut carts = self.carts.lock().map_err(|_| SessionError::StorePoisoned)?;
        carts.remove(key);
        Ok(())
    }
}

// =============================================================================
// JSON File Store
// =============================================================================

/// One pretty-printed JSON file per cart.
///
/// Writes go to `<key>.json.tmp` first and are renamed into place, so a
/// crash mid-write leaves the previous cart intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for `key`. Keys are restricted to `[A-Za-z0-9_-]` so they can
    /// never escape the store directory.
    fn path_for(&self, key: &str) -> SessionResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SessionError::InvalidInstanceKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CartStore for JsonFileStore {
    fn load(&self, key: &str) -> SessionResult<Option<Cart>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            debug!(?path, "No stored cart");
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let cart = serde_json::from_str(&contents)?;
        debug!(?path, "Loaded cart");
        Ok(Some(cart))
    }

    fn store(&self, key: &str, cart: &Cart) -> SessionResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(cart)?)?;
        std::fs::rename(&tmp, &path)?;

        debug!(?path, entries = cart.entry_count(), "Stored cart");
        Ok(())
    }

    fn destroy(&self, key: &str) -> SessionResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(?path, "Destroyed stored cart");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use till_core::{CartEntry, Fee, Money};

    fn sample_cart(key: &str) -> Cart {
        let mut cart = Cart::new(key);
        cart.add_entry(CartEntry::new("sku-1", "Notebook", Money::new(dec!(3.25))))
            .unwrap();
        cart.add_fee(Fee::new("bag", Money::new(dec!(0.10)))).unwrap();
        cart
    }

    fn exercise(store: &dyn CartStore) {
        assert!(store.load("alpha").unwrap().is_none());

        store.store("alpha", &sample_cart("alpha")).unwrap();
        let loaded = store.load("alpha").unwrap().unwrap();
        assert_eq!(loaded.instance(), "alpha");
        assert_eq!(loaded.entry_count(), 1);
        assert_eq!(loaded.fee("bag").map(|f| f.amount), Some(Money::new(dec!(0.10))));

        assert!(store.load("beta").unwrap().is_none());

        store.destroy("alpha").unwrap();
        assert!(store.load("alpha").unwrap().is_none());
        store.destroy("alpha").unwrap();
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("carts"));
        exercise(&store);
    }

    #[test]
    fn test_json_file_store_writes_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.store("web-1", &sample_cart("web-1")).unwrap();

        assert!(dir.path().join("web-1.json").exists());
        assert!(!dir.path().join("web-1.json.tmp").exists());
    }

    #[test]
    fn test_json_file_store_rejects_unsafe_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        for key in ["", "../escape", "a/b", "dot.json"] {
            assert!(matches!(
                store.load(key),
                Err(SessionError::InvalidInstanceKey(_))
            ));
        }
    }

    #[test]
    fn test_json_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(store.load("broken"), Err(SessionError::Json(_))));
    }
}
