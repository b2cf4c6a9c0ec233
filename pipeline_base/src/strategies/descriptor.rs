// src/strategies/descriptor.rs
//! Strategy descriptors
//!
//! A descriptor identifies one pluggable implementation by its
//! `(kind, discriminator value)` key, where to load it from, and which
//! package declared it.

use crate::strategies::kind::StrategyKind;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity key of a registered strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrategyKey {
    pub kind: StrategyKind,
    pub value: String,
}

impl StrategyKey {
    pub fn new(kind: StrategyKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.value)
    }
}

/// Module path plus exported symbol of an implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementationLocator {
    pub module: String,
    pub symbol: String,
}

impl ImplementationLocator {
    pub fn new(module: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for ImplementationLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.symbol)
    }
}

/// One pluggable strategy implementation
///
/// Equality and hashing consider only the `(kind, value)` key. Listings use
/// [`StrategyDescriptor::listing_order`], which also looks at the package and
/// is therefore not exposed as `Ord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub key: StrategyKey,
    pub locator: ImplementationLocator,
    pub package: String,
}

impl StrategyDescriptor {
    pub fn new(
        kind: StrategyKind,
        value: impl Into<String>,
        locator: ImplementationLocator,
        package: impl Into<String>,
    ) -> Self {
        Self {
            key: StrategyKey::new(kind, value),
            locator,
            package: package.into(),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.key.kind
    }

    pub fn value(&self) -> &str {
        &self.key.value
    }

    /// Deterministic order: kind, then package, then discriminator value
    pub fn listing_order(a: &StrategyDescriptor, b: &StrategyDescriptor) -> Ordering {
        a.key
            .kind
            .cmp(&b.key.kind)
            .then_with(|| a.package.cmp(&b.package))
            .then_with(|| a.key.value.cmp(&b.key.value))
    }
}

impl PartialEq for StrategyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for StrategyDescriptor {}

impl Hash for StrategyDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} [{}]",
            self.key.kind, self.key.value, self.locator, self.package
        )
    }
}
