//! # Validation Module
//!
//! Coercion and validation of values written into entries, modifiers,
//! fees and coupons.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Field Write Pipeline                               │
//! │                                                                         │
//! │  caller value (serde_json::Value)                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  coerce_* (THIS MODULE)                                                │
//! │  ├── quantity  → numeric, ≥ 0, whole unless fractional allowed         │
//! │  ├── price     → numeric                                               │
//! │  ├── taxable   → bool, 0/1, "yes"/"no", "on"/"off", ...                │
//! │  └── tax       → numeric fraction in 0..=1                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  field set + identity hash recomputed                                  │
//! │                                                                         │
//! │  A failure here means the field is never touched.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use serde_json::json;
//! use till_core::validation::{coerce_quantity, coerce_taxable};
//!
//! assert!(coerce_quantity(&json!(2), false).is_ok());
//! assert!(coerce_quantity(&json!(-1), false).is_err());
//! assert!(coerce_taxable(&json!("yes")).unwrap());
//! ```

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Quantity, TaxRate};
use crate::{MAX_CODE_LENGTH, MAX_NAME_LENGTH, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Coercion
// =============================================================================

/// Reads a decimal out of a JSON number or numeric string.
fn numeric(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be numeric (number or numeric string)
/// - Must be ≥ 0
/// - Must be whole unless `fractional_allowed`
pub fn coerce_quantity(value: &Value, fractional_allowed: bool) -> CoreResult<Quantity> {
    let raw = numeric(value).ok_or_else(|| CoreError::InvalidQuantity(value.to_string()))?;
    let qty = Quantity::new(raw)?;
    check_quantity(qty, fractional_allowed)?;
    Ok(qty)
}

/// Rejects quantities above [`MAX_QUANTITY`], and fractional ones when the
/// cart does not allow them.
pub fn check_quantity(qty: Quantity, fractional_allowed: bool) -> CoreResult<()> {
    if !qty.is_within_bounds() {
        return Err(CoreError::InvalidQuantity(format!("{qty} (more than {MAX_QUANTITY})")));
    }
    if !fractional_allowed && !qty.is_whole() {
        return Err(CoreError::InvalidQuantity(format!(
            "{qty} (fractional quantities are disabled)"
        )));
    }
    Ok(())
}

/// Validates a unit price or price delta. Negative values are allowed;
/// magnitudes above [`MAX_AMOUNT`](crate::MAX_AMOUNT) are not.
pub fn coerce_price(value: &Value) -> CoreResult<Money> {
    let raw = numeric(value).ok_or_else(|| CoreError::InvalidPrice(value.to_string()))?;
    Money::bounded(raw)
}

/// Validates a tax rate fraction.
pub fn coerce_tax_rate(value: &Value) -> CoreResult<TaxRate> {
    let raw = numeric(value).ok_or_else(|| CoreError::InvalidTaxRate(value.to_string()))?;
    TaxRate::from_fraction(raw)
}

/// Coerces a taxable flag.
///
/// ## Accepted Values
/// ```text
/// true  ← true, 1, 1.0, "1", "true", "yes", "on", "y"
/// false ← false, 0, 0.0, "0", "false", "no", "off", "n", ""
/// ```
pub fn coerce_taxable(value: &Value) -> CoreResult<bool> {
    let invalid = || CoreError::InvalidTaxableValue(value.to_string());
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 1.0 => Ok(true),
            Some(x) if x == 0.0 => Ok(false),
            _ => Err(invalid()),
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "y" => Ok(true),
            "0" | "false" | "no" | "off" | "n" | "" => Ok(false),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name.
///
/// ## Rules
/// - Must not be empty
/// - At most `MAX_NAME_LENGTH` characters
pub fn validate_display_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a coupon code or fee name used as a map key.
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LENGTH,
        });
    }

    Ok(())
}

/// Validates a percentage coupon fraction.
pub fn validate_fraction(field: &str, value: Decimal) -> ValidationResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "1".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(
            coerce_quantity(&json!(3), false).unwrap(),
            Quantity::from(3u32)
        );
        assert_eq!(
            coerce_quantity(&json!("4"), false).unwrap(),
            Quantity::from(4u32)
        );
        assert!(coerce_quantity(&json!(0), false).unwrap().is_zero());

        assert!(matches!(
            coerce_quantity(&json!(-1), false),
            Err(CoreError::InvalidQuantity(_))
        ));
        assert!(matches!(
            coerce_quantity(&json!("many"), false),
            Err(CoreError::InvalidQuantity(_))
        ));
        assert!(matches!(
            coerce_quantity(&json!(null), false),
            Err(CoreError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_fractional_quantity_policy() {
        assert!(coerce_quantity(&json!(1.5), false).is_err());
        assert_eq!(
            coerce_quantity(&json!(1.5), true).unwrap().value(),
            dec!(1.5)
        );
    }

    #[test]
    fn test_coerce_price() {
        assert_eq!(coerce_price(&json!(1.07)).unwrap(), Money::new(dec!(1.07)));
        assert_eq!(coerce_price(&json!("-2.5")).unwrap(), Money::new(dec!(-2.5)));
        assert!(matches!(
            coerce_price(&json!(true)),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            coerce_price(&json!("abc")),
            Err(CoreError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_coerce_rejects_out_of_range_numbers() {
        assert!(matches!(
            coerce_price(&json!("79228162514264337593543950335")),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            coerce_price(&json!(-1e13)),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            coerce_quantity(&json!(2_000_000), false),
            Err(CoreError::InvalidQuantity(_))
        ));
        assert!(check_quantity(Quantity::from(u32::MAX), false).is_err());
    }

    #[test]
    fn test_coerce_taxable() {
        assert!(coerce_taxable(&json!(true)).unwrap());
        assert!(coerce_taxable(&json!(1)).unwrap());
        assert!(coerce_taxable(&json!("on")).unwrap());
        assert!(!coerce_taxable(&json!("No")).unwrap());
        assert!(!coerce_taxable(&json!(0)).unwrap());
        assert!(coerce_taxable(&json!(1.0)).unwrap());
        assert!(!coerce_taxable(&json!(0.0)).unwrap());
        assert!(coerce_taxable(&json!(0.5)).is_err());

        assert!(matches!(
            coerce_taxable(&json!(2)),
            Err(CoreError::InvalidTaxableValue(_))
        ));
        assert!(matches!(
            coerce_taxable(&json!("maybe")),
            Err(CoreError::InvalidTaxableValue(_))
        ));
        assert!(coerce_taxable(&json!([true])).is_err());
    }

    #[test]
    fn test_coerce_tax_rate() {
        assert_eq!(
            coerce_tax_rate(&json!(0.07)).unwrap().fraction(),
            dec!(0.07)
        );
        assert!(matches!(
            coerce_tax_rate(&json!(7)),
            Err(CoreError::InvalidTaxRate(_))
        ));
        assert!(coerce_tax_rate(&json!("seven")).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Large Pizza").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("code", "SAVE10").is_ok());
        assert!(validate_code("code", "").is_err());
        assert!(validate_code("fee", &"X".repeat(80)).is_err());
    }

    #[test]
    fn test_validate_fraction() {
        assert!(validate_fraction("value", dec!(0.1)).is_ok());
        assert!(validate_fraction("value", dec!(1.1)).is_err());
    }
}
