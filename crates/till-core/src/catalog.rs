//! # Catalog Binding
//!
//! Optional collaborator that resolves a catalog identifier to canonical
//! pricing at entry-creation time. The core only knows the trait; where
//! the records come from (database, API, fixture) is the caller's concern.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::money::{Money, TaxRate};

/// Canonical pricing for a catalog identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub display_name: String,
    pub unit_price: Money,
    pub taxable: bool,
    pub tax_rate: TaxRate,
}

/// Resolves catalog identifiers. `None` means the identifier is unknown.
pub trait CatalogResolver {
    fn resolve(&self, identifier: &str) -> Option<CatalogRecord>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: HashMap<String, CatalogRecord>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, record: CatalogRecord) {
        self.records.insert(identifier.into(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CatalogResolver for StaticCatalog {
    fn resolve(&self, identifier: &str) -> Option<CatalogRecord> {
        self.records.get(identifier).cloned()
    }
}

impl<K: Into<String>> FromIterator<(K, CatalogRecord)> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = (K, CatalogRecord)>>(iter: I) -> Self {
        StaticCatalog {
            records: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
