// src/strategies/contract.rs
//! Strategy contracts
//!
//! Every kind requires `initialize` and `get`; transformations additionally
//! require `run` and `status`. Capabilities are declared by implementations
//! and checked twice: once when the registry resolves an implementation and
//! again on each instance the factory builds.

use crate::strategies::errors::StrategyError;
use crate::strategies::kind::StrategyKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One contract operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Initialize,
    Get,
    Run,
    Status,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Initialize => "initialize",
            Capability::Get => "get",
            Capability::Run => "run",
            Capability::Status => "status",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `initialize` + `get`
    pub fn standard() -> Self {
        [Capability::Initialize, Capability::Get].into_iter().collect()
    }

    /// `initialize` + `get` + `run` + `status`
    pub fn transformation() -> Self {
        [
            Capability::Initialize,
            Capability::Get,
            Capability::Run,
            Capability::Status,
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.0.remove(&capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// First capability of `required` absent from this set
    pub fn first_missing(&self, required: &CapabilitySet) -> Option<Capability> {
        required.0.difference(&self.0).next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Capability::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Capabilities a kind demands of its implementations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyContract {
    pub kind: StrategyKind,
    pub required: CapabilitySet,
}

impl StrategyContract {
    pub fn for_kind(kind: StrategyKind) -> Self {
        let required = match kind {
            StrategyKind::Transformation => CapabilitySet::transformation(),
            _ => CapabilitySet::standard(),
        };
        Self { kind, required }
    }

    pub fn requires(&self, capability: Capability) -> bool {
        self.required.contains(capability)
    }
}

/// Checks capability sets against kind contracts
#[derive(Debug, Default, Clone, Copy)]
pub struct ContractValidator;

impl ContractValidator {
    pub fn new() -> Self {
        Self
    }

    /// Verify `provided` covers the contract of `kind`
    pub fn verify(
        &self,
        kind: StrategyKind,
        value: &str,
        provided: &CapabilitySet,
    ) -> Result<(), StrategyError> {
        let contract = StrategyContract::for_kind(kind);
        match provided.first_missing(&contract.required) {
            Some(capability) => Err(StrategyError::MalformedStrategy {
                kind,
                value: value.to_string(),
                capability,
            }),
            None => Ok(()),
        }
    }
}
