//! # Till Configuration
//!
//! Configuration for a cart deployment: pricing policies, display
//! formatting and where carts are stored.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_PRICE_MODE=cents                                              │
//! │     TILL_ALLOW_MULTIPLE_COUPONS=true                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/till/till.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.till.till/till.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     decimal prices, whole quantities, one coupon, USD                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! [pricing]
//! price_mode = "decimal"       # decimal | cents
//! fractional_quantities = false
//! allow_multiple_coupons = false
//! default_tax_rate = "0.07"
//!
//! [format]
//! currency_code = "USD"       # ISO 4217, sets symbol and separators
//! locale = "en-US"
//!
//! [store]
//! dir = "/var/lib/till/carts"
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use till_core::{PriceMode, PricingConfig, TaxRate};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::format::PlainFormatter;
use crate::store::JsonFileStore;

// =============================================================================
// Format Settings
// =============================================================================

/// How money is rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// ISO 4217 code. Picks the symbol, separators and decimals.
    #[serde(default = "default_currency_code")]
    pub currency_code: String,

    /// BCP 47 locale tag (`en-US`, `de-DE`).
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl Default for FormatSettings {
    fn default() -> Self {
        FormatSettings {
            currency_code: default_currency_code(),
            locale: default_locale(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Where the JSON store keeps carts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding one `<instance>.json` per cart.
    /// Defaults to the platform data directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TillConfig {
    /// Cart-wide pricing policies.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Display formatting.
    #[serde(default)]
    pub format: FormatSettings,

    /// Cart storage.
    #[serde(default)]
    pub store: StoreSettings,
}

impl TillConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading till config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load till config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Till config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        self.pricing.validate()?;

        if self.format.currency_code.len() != 3
            || !self.format.currency_code.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(SessionError::InvalidConfig(format!(
                "currency_code must be a 3-letter ISO code, got: {}",
                self.format.currency_code
            )));
        }

        PlainFormatter::new(&self.format.currency_code, self.pricing.price_mode)?;

        if self.format.locale.trim().is_empty() {
            return Err(SessionError::InvalidConfig("locale must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `TILL_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are
    /// logged and skipped.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("TILL_PRICE_MODE") {
            match PriceMode::from_str(&mode) {
                Ok(parsed) => {
                    debug!(mode = %parsed, "Overriding price mode from environment");
                    self.pricing.price_mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown price mode in environment"),
            }
        }

        if let Some(flag) = lookup("TILL_ALLOW_MULTIPLE_COUPONS") {
            match parse_flag(&flag) {
                Some(value) => self.pricing.allow_multiple_coupons = value,
                None => warn!(value = %flag, "Invalid TILL_ALLOW_MULTIPLE_COUPONS"),
            }
        }

        if let Some(flag) = lookup("TILL_FRACTIONAL_QUANTITIES") {
            match parse_flag(&flag) {
                Some(value) => self.pricing.fractional_quantities = value,
                None => warn!(value = %flag, "Invalid TILL_FRACTIONAL_QUANTITIES"),
            }
        }

        if let Some(rate) = lookup("TILL_DEFAULT_TAX_RATE") {
            match Decimal::from_str(rate.trim())
                .ok()
                .and_then(|fraction| TaxRate::from_fraction(fraction).ok())
            {
                Some(parsed) => {
                    debug!(rate = %rate, "Overriding default tax rate from environment");
                    self.pricing.default_tax_rate = parsed;
                }
                None => warn!(rate = %rate, "Invalid TILL_DEFAULT_TAX_RATE"),
            }
        }

        if let Some(code) = lookup("TILL_CURRENCY_CODE") {
            self.format.currency_code = code.trim().to_uppercase();
        }

        if let Some(locale) = lookup("TILL_LOCALE") {
            self.format.locale = locale;
        }

        if let Some(dir) = lookup("TILL_STORE_DIR") {
            debug!(dir = %dir, "Overriding store directory from environment");
            self.store.dir = Some(PathBuf::from(dir));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "till")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Directory for the JSON store: configured, or the platform data dir.
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.store.dir.clone().or_else(|| {
            directories::ProjectDirs::from("com", "till", "till")
                .map(|dirs| dirs.data_dir().join("carts"))
        })
    }

    /// JSON store rooted at [`Self::store_dir`].
    pub fn json_store(&self) -> SessionResult<JsonFileStore> {
        let dir = self
            .store_dir()
            .ok_or_else(|| SessionError::InvalidConfig("No store directory available".into()))?;
        Ok(JsonFileStore::new(dir))
    }

    /// Formatter for the configured currency and price mode.
    pub fn formatter(&self) -> SessionResult<PlainFormatter> {
        PlainFormatter::new(&self.format.currency_code, self.pricing.price_mode)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TillConfig::default();
        assert_eq!(config.pricing.price_mode, PriceMode::Decimal);
        assert!(!config.pricing.allow_multiple_coupons);
        assert_eq!(config.format.currency_code, "USD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TillConfig::default();

        config.format.currency_code = "dollars".to_string();
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));

        config.format.currency_code = "QQQ".to_string();
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));

        config.format.currency_code = "EUR".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.formatter().unwrap().currency_code(), "EUR");

        config.format.locale = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = TillConfig::default();
        config.pricing.price_mode = PriceMode::Cents;
        config.pricing.default_tax_rate = TaxRate::from_bps(825);
        config.store.dir = Some(PathBuf::from("/tmp/carts"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[pricing]"));
        assert!(toml_str.contains("[format]"));

        let back: TillConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: TillConfig = toml::from_str(
            r#"
            [pricing]
            allow_multiple_coupons = true
            "#,
        )
        .unwrap();
        assert!(config.pricing.allow_multiple_coupons);
        assert_eq!(config.format.currency_code, "USD");
        assert!(config.store.dir.is_none());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("till.toml");

        let mut config = TillConfig::default();
        config.format.locale = "de-DE".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded = TillConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.format.locale, "de-DE");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("till.toml");
        std::fs::write(&path, "[pricing]\nprice_mode = \"bitcoin\"\n").unwrap();

        assert!(matches!(
            TillConfig::load(Some(path.clone())),
            Err(SessionError::TomlDe(_))
        ));
        assert_eq!(TillConfig::load_or_default(Some(path)).pricing.price_mode, PriceMode::Decimal);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TILL_PRICE_MODE", "cents"),
            ("TILL_ALLOW_MULTIPLE_COUPONS", "yes"),
            ("TILL_FRACTIONAL_QUANTITIES", "maybe"),
            ("TILL_DEFAULT_TAX_RATE", "0.0825"),
            ("TILL_CURRENCY_CODE", "eur"),
            ("TILL_STORE_DIR", "/srv/carts"),
        ]
        .into_iter()
        .collect();

        let mut config = TillConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.pricing.price_mode, PriceMode::Cents);
        assert!(config.pricing.allow_multiple_coupons);
        assert!(!config.pricing.fractional_quantities);
        assert_eq!(config.pricing.default_tax_rate.fraction(), dec!(0.0825));
        assert_eq!(config.format.currency_code, "EUR");
        assert_eq!(config.store_dir(), Some(PathBuf::from("/srv/carts")));
    }

    #[test]
    fn test_invalid_tax_override_is_skipped() {
        let mut config = TillConfig::default();
        config.apply_overrides(|key| (key == "TILL_DEFAULT_TAX_RATE").then(|| "7".to_string()));
        assert!(config.pricing.default_tax_rate.is_zero());
    }
}
