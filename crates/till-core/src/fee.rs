//! # Fee Ledger
//!
//! Flat charges added to the cart total (delivery, service, bag levy),
//! keyed by name and taxed independently of any entry.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::{Money, TaxRate};
use crate::validation::validate_code;

/// A named flat charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub name: String,
    pub amount: Money,
    #[serde(default)]
    pub taxable: bool,
    #[serde(default)]
    pub tax_rate: TaxRate,
    /// Always zero: discounts never apply to fees.
    #[serde(default)]
    pub discount_applied: Money,
}

impl Fee {
    /// Untaxed fee.
    pub fn new(name: impl Into<String>, amount: Money) -> Self {
        Fee {
            name: name.into(),
            amount,
            taxable: false,
            tax_rate: TaxRate::zero(),
            discount_applied: Money::zero(),
        }
    }

    /// Marks the fee taxable at `rate`.
    pub fn with_tax(mut self, rate: TaxRate) -> Self {
        self.taxable = true;
        self.tax_rate = rate;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_code("fee", &self.name)?;
        Money::bounded(self.amount.amount())?;
        Ok(())
    }

    /// `amount × tax_rate` for taxable fees, zero otherwise.
    pub fn tax(&self) -> Money {
        if self.taxable {
            self.amount.apply_rate(self.tax_rate)
        } else {
            Money::zero()
        }
    }

    pub fn total(&self, with_tax: bool) -> Money {
        if with_tax {
            self.amount + self.tax()
        } else {
            self.amount
        }
    }
}
