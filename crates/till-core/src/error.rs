//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Field, coupon and lookup failures              │
//! │  └── ValidationError  - Generic input validation failures              │
//! │                                                                         │
//! │  till-session errors (separate crate)                                  │
//! │  └── SessionError     - Config, store and serialization failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Coupon Errors and Check Modes
//! The three coupon variants are only produced when a caller asks for a
//! strict check (`CheckMode::Strict`). Quiet checks return `false` and the
//! coupon contributes zero discount instead.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Field validation errors leave the target untouched: a failed
/// `update_field` never partially mutates an entry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quantity set to a non-numeric, negative or disallowed fractional value.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Price or price delta set to a non-numeric value.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Taxable flag set to a value that is not boolean-coercible.
    #[error("Invalid taxable value: {0}")]
    InvalidTaxableValue(String),

    /// Tax rate set to a non-numeric value or outside `0..=1`.
    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(String),

    /// Coupon requirements (minimum subtotal) are not met.
    #[error("{reason}")]
    CouponIneligible { reason: String },

    /// Coupon is outside its validity window.
    #[error("{reason}")]
    CouponExpired { reason: String },

    /// Proposed discount is above the coupon's cap.
    #[error("Maximum discount of {cap} exceeded")]
    CouponMaxDiscountExceeded { cap: Money },

    /// Catalog binding could not resolve an identifier.
    ///
    /// ## When This Occurs
    /// - Identifier unknown to the catalog collaborator
    /// - Catalog record was withdrawn between listing and add-to-cart
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// No cart entry carries the identity hash.
    #[error("Cart entry not found: {0}")]
    EntryNotFound(String),

    /// Modifier index is out of range.
    #[error("Modifier not found at index {index}")]
    ModifierNotFound { index: usize },

    /// No coupon with the code is attached to the cart.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value is not in allowed set.
    #[error("{field} '{value}' must be one of: {allowed:?}")]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CouponMaxDiscountExceeded {
            cap: Money::new(dec!(5.00)),
        };
        assert_eq!(err.to_string(), "Maximum discount of 5.00 exceeded");

        let err = CoreError::CouponIneligible {
            reason: "You must have at least a total of 50.00 to use this coupon".to_string(),
        };
        assert!(err.to_string().contains("50.00"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
