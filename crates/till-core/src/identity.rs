//! # Identity Hasher
//!
//! Canonical digests that decide whether two cart entries are "the same
//! thing" and should merge.
//!
//! ## Digest Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SHA-256 over length-prefixed fields, in this fixed order:             │
//! │                                                                         │
//! │  entry:    id │ name │ price │ taxable │ tax │ options* │ modifier#*    │
//! │  modifier: price │ taxable │ options* │ nested entry#*                  │
//! │                                                                         │
//! │  options*  = sorted keys, `quantity` skipped, compact JSON values      │
//! │  modifier# = the modifier's own digest, in modifier order              │
//! │                                                                         │
//! │  Quantity never enters the digest: two rows differing only in          │
//! │  quantity are the same row.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Distinct-line entries use [`random_identity`] instead: 160 random bits,
//! unrelated to content.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::money::{Money, TaxRate};
use crate::options::OptionBag;

/// Bytes of randomness in a distinct-line identity (160 bits).
pub const RANDOM_IDENTITY_BYTES: usize = 20;

/// Hex digest identifying an entry or modifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the placeholder hash of an entry not yet keyed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityHash {
    fn from(value: &str) -> Self {
        IdentityHash(value.to_string())
    }
}

impl From<String> for IdentityHash {
    fn from(value: String) -> Self {
        IdentityHash(value)
    }
}

// =============================================================================
// Field Writer
// =============================================================================

/// Length-prefixed field encoder so `("ab", "c")` and `("a", "bc")` differ.
struct FieldWriter {
    hasher: Sha256,
}

impl FieldWriter {
    fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        FieldWriter { hasher }
    }

    fn field(&mut self, tag: &[u8], bytes: &[u8]) {
        self.hasher.update(tag);
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    fn options(&mut self, options: &OptionBag) {
        let pairs = options.canonical_pairs();
        self.field(b"options", &(pairs.len() as u64).to_le_bytes());
        for (key, value) in pairs {
            self.field(b"k", key.as_bytes());
            self.field(b"v", value.as_bytes());
        }
    }

    fn children<'a>(&mut self, tag: &[u8], hashes: impl Iterator<Item = &'a IdentityHash>) {
        let hashes: Vec<&IdentityHash> = hashes.collect();
        self.field(tag, &(hashes.len() as u64).to_le_bytes());
        for hash in hashes {
            self.field(b"h", hash.as_str().as_bytes());
        }
    }

    fn finish(self) -> IdentityHash {
        IdentityHash(format!("{:x}", self.hasher.finalize()))
    }
}

// =============================================================================
// Digest Inputs
// =============================================================================

/// Identity-relevant fields of an entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryFingerprint<'a> {
    pub identifier: &'a str,
    pub display_name: &'a str,
    pub unit_price: Money,
    pub taxable: bool,
    pub tax_rate: TaxRate,
    pub options: &'a OptionBag,
}

/// Computes the deterministic identity of an entry.
///
/// `modifier_hashes` must be given in modifier order.
pub fn compute_identity<'a>(
    entry: EntryFingerprint<'_>,
    modifier_hashes: impl Iterator<Item = &'a IdentityHash>,
) -> IdentityHash {
    let mut writer = FieldWriter::new(b"till.entry.v1");
    writer.field(b"id", entry.identifier.as_bytes());
    writer.field(b"name", entry.display_name.as_bytes());
    writer.field(b"price", entry.unit_price.canonical().as_bytes());
    writer.field(b"taxable", &[u8::from(entry.taxable)]);
    writer.field(b"tax", entry.tax_rate.canonical().as_bytes());
    writer.options(entry.options);
    writer.children(b"modifiers", modifier_hashes);
    writer.finish()
}

/// Computes the identity of a modifier from its price, taxable flag,
/// options and nested-entry digests.
pub fn compute_modifier_identity<'a>(
    price_delta: Money,
    taxable: bool,
    options: &OptionBag,
    nested_hashes: impl Iterator<Item = &'a IdentityHash>,
) -> IdentityHash {
    let mut writer = FieldWriter::new(b"till.modifier.v1");
    writer.field(b"price", price_delta.canonical().as_bytes());
    writer.field(b"taxable", &[u8::from(taxable)]);
    writer.options(options);
    writer.children(b"entries", nested_hashes);
    writer.finish()
}

/// Generates a practically-unique token unrelated to entry content.
pub fn random_identity() -> IdentityHash {
    let mut bytes = [0u8; RANDOM_IDENTITY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    IdentityHash(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Draws random identities until `taken` reports one as free.
pub fn unique_random_identity(taken: impl Fn(&IdentityHash) -> bool) -> IdentityHash {
    loop {
        let candidate = random_identity();
        if !taken(&candidate) {
            return candidate;
        }
    }
}
