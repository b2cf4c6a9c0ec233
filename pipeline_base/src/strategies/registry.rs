// src/strategies/registry.rs
//! Strategy registry
//!
//! Indexes manifest entries by kind and discriminator value. Implementations
//! are materialised from the plugin catalog on first `resolve` and cached for
//! the lifetime of the index.

use crate::config::runtime::RegistryPreferences;
use crate::logging::codes;
use crate::strategies::contract::ContractValidator;
use crate::strategies::descriptor::StrategyDescriptor;
use crate::strategies::errors::StrategyError;
use crate::strategies::kind::StrategyKind;
use crate::strategies::plugins::{PluginCatalog, PluginManifest, RegisterFn};
use crate::strategies::traits::StrategyImplementation;
use crate::{log_debug, log_error, log_success};
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

struct RegistryEntry {
    descriptor: StrategyDescriptor,
    implementation: OnceCell<Arc<dyn StrategyImplementation>>,
}

impl RegistryEntry {
    fn new(descriptor: StrategyDescriptor) -> Self {
        Self {
            descriptor,
            implementation: OnceCell::new(),
        }
    }
}

type KindIndex = HashMap<StrategyKind, HashMap<String, RegistryEntry>>;

/// Registry of pluggable strategy implementations
pub struct StrategyRegistry {
    catalog: PluginCatalog,

    /// kind -> discriminator value -> entry
    index: KindIndex,

    /// Kind set and mode of the last successful load
    kinds: Vec<StrategyKind>,
    enforce_uniqueness: bool,

    validator: ContractValidator,
}

impl StrategyRegistry {
    /// Create an empty registry over a catalog
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            index: HashMap::new(),
            kinds: StrategyKind::ALL.to_vec(),
            enforce_uniqueness: true,
            validator: ContractValidator::new(),
        }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Rebuild the index from `manifest`, keeping only entries whose kind is in `kinds`
    ///
    /// In exclusive mode the first duplicate `(kind, value)` fails the load and
    /// the previous index stays in place. In permissive mode the first entry
    /// seen wins. Returns the number of indexed strategies.
    pub fn load(
        &mut self,
        manifest: &PluginManifest,
        kinds: &[StrategyKind],
        enforce_uniqueness: bool,
    ) -> Result<usize, StrategyError> {
        let mut index: KindIndex = HashMap::new();

        for entry in manifest.iter().filter(|e| kinds.contains(&e.kind)) {
            let by_value = index.entry(entry.kind).or_default();

            if let Some(existing) = by_value.get(&entry.value) {
                if enforce_uniqueness {
                    let err = StrategyError::DuplicateStrategy {
                        kind: entry.kind,
                        value: entry.value.clone(),
                        existing_package: existing.descriptor.package.clone(),
                        duplicate_package: entry.package.clone(),
                    };
                    log_error!(err.code(), "Duplicate strategy declaration",
                        "kind" => entry.kind,
                        "value" => entry.value,
                        "packages" => format!("{}, {}", existing.descriptor.package, entry.package)
                    );
                    return Err(err);
                }

                log_debug!("Ignoring duplicate strategy declaration",
                    "kind" => entry.kind,
                    "value" => entry.value,
                    "kept_package" => existing.descriptor.package,
                    "dropped_package" => entry.package
                );
                continue;
            }

            by_value.insert(entry.value.clone(), RegistryEntry::new(entry.to_descriptor()));
        }

        self.index = index;
        self.kinds = kinds.to_vec();
        self.enforce_uniqueness = enforce_uniqueness;

        let count = self.len();
        log_success!(codes::success::REGISTRY_LOADED, "Strategy registry loaded",
            "strategies" => count,
            "kinds" => self.kinds.len(),
            "exclusive" => enforce_uniqueness
        );
        Ok(count)
    }

    /// Load the catalog's own declarations with the current kind set and mode
    pub fn load_catalog(&mut self) -> Result<usize, StrategyError> {
        let manifest = self.catalog.manifest();
        let kinds = self.kinds.clone();
        self.load(&manifest, &kinds, self.enforce_uniqueness)
    }

    /// Re-run `load` with the last kind set and mode; cached implementations are dropped
    pub fn reload(&mut self, manifest: &PluginManifest) -> Result<usize, StrategyError> {
        let kinds = self.kinds.clone();
        self.load(manifest, &kinds, self.enforce_uniqueness)
    }

    /// Descriptor registered for `(kind, value)`
    pub fn lookup(&self, kind: StrategyKind, value: &str) -> Result<&StrategyDescriptor, StrategyError> {
        self.entry(kind, value).map(|entry| &entry.descriptor)
    }

    /// `lookup` with the kind given by name
    pub fn lookup_by_name(&self, kind: &str, value: &str) -> Result<&StrategyDescriptor, StrategyError> {
        let kind: StrategyKind = kind.parse()?;
        self.lookup(kind, value)
    }

    /// Implementation behind `descriptor`, loaded on first use
    ///
    /// Concurrent first calls run the loader once; later calls return the
    /// same `Arc`.
    pub fn resolve(
        &self,
        descriptor: &StrategyDescriptor,
    ) -> Result<Arc<dyn StrategyImplementation>, StrategyError> {
        let entry = self.entry(descriptor.kind(), descriptor.value())?;
        entry
            .implementation
            .get_or_try_init(|| self.materialize(&entry.descriptor))
            .cloned()
    }

    pub fn contains(&self, kind: StrategyKind, value: &str) -> bool {
        self.entry(kind, value).is_ok()
    }

    pub fn len(&self) -> usize {
        self.index.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every descriptor, in listing order
    pub fn descriptors(&self) -> Vec<&StrategyDescriptor> {
        let mut descriptors: Vec<&StrategyDescriptor> = self
            .index
            .values()
            .flat_map(|by_value| by_value.values().map(|entry| &entry.descriptor))
            .collect();
        descriptors.sort_by(|a, b| StrategyDescriptor::listing_order(a, b));
        descriptors
    }

    /// Descriptors of one kind, in listing order
    pub fn descriptors_for(&self, kind: StrategyKind) -> Vec<&StrategyDescriptor> {
        let mut descriptors: Vec<&StrategyDescriptor> = self
            .index
            .get(&kind)
            .map(|by_value| by_value.values().map(|entry| &entry.descriptor).collect())
            .unwrap_or_default();
        descriptors.sort_by(|a, b| StrategyDescriptor::listing_order(a, b));
        descriptors
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let by_kind: BTreeMap<StrategyKind, usize> = self
            .index
            .iter()
            .filter(|(_, by_value)| !by_value.is_empty())
            .map(|(kind, by_value)| (*kind, by_value.len()))
            .collect();

        let entries = || self.index.values().flat_map(HashMap::values);
        let resolved = entries().filter(|e| e.implementation.get().is_some()).count();
        let unexported = entries()
            .filter(|e| !self.catalog.exports(&e.descriptor.locator))
            .count();

        let health = if self.is_empty() {
            RegistryHealth::Empty
        } else if unexported > 0 {
            RegistryHealth::Incomplete
        } else {
            RegistryHealth::Healthy
        };

        RegistryStatistics {
            total_strategies: self.len(),
            by_kind,
            resolved,
            unexported,
            packages: self.catalog.packages().len(),
            enforce_uniqueness: self.enforce_uniqueness,
            health,
        }
    }

    fn entry(&self, kind: StrategyKind, value: &str) -> Result<&RegistryEntry, StrategyError> {
        self.index
            .get(&kind)
            .and_then(|by_value| by_value.get(value))
            .ok_or_else(|| StrategyError::StrategyNotFound {
                kind,
                value: value.to_string(),
            })
    }

    fn materialize(
        &self,
        descriptor: &StrategyDescriptor,
    ) -> Result<Arc<dyn StrategyImplementation>, StrategyError> {
        let locator = &descriptor.locator;
        let loader = self.catalog.loader(locator)?;

        let implementation = loader().map_err(|reason| StrategyError::ImplementationLoad {
            module: locator.module.clone(),
            symbol: locator.symbol.clone(),
            reason,
        });
        let implementation = match implementation {
            Ok(implementation) => implementation,
            Err(err) => {
                log_error!(err.code(), "Strategy implementation failed to load",
                    "locator" => locator,
                    "error" => err
                );
                return Err(err);
            }
        };

        self.validator.verify(
            descriptor.kind(),
            descriptor.value(),
            &implementation.capabilities(),
        )?;

        log_success!(codes::success::IMPLEMENTATION_RESOLVED, "Strategy implementation resolved",
            "kind" => descriptor.kind(),
            "value" => descriptor.value(),
            "implementation" => implementation.name()
        );
        Ok(implementation)
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("catalog", &self.catalog)
            .field("strategies", &self.len())
            .field("kinds", &self.kinds)
            .field("enforce_uniqueness", &self.enforce_uniqueness)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent construction of a loaded registry
pub struct RegistryBuilder {
    catalog: PluginCatalog,
    kinds: Vec<StrategyKind>,
    enforce_uniqueness: bool,
    extra: PluginManifest,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            catalog: PluginCatalog::new(),
            kinds: StrategyKind::ALL.to_vec(),
            enforce_uniqueness: true,
            extra: PluginManifest::new(),
        }
    }

    /// Install a plugin package
    pub fn with_package(mut self, package: &str, register: RegisterFn) -> Self {
        self.catalog.install(package, register);
        self
    }

    pub fn with_kinds(mut self, kinds: &[StrategyKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn enforce_uniqueness(mut self, enforce: bool) -> Self {
        self.enforce_uniqueness = enforce;
        self
    }

    /// Entries indexed after the catalog's own declarations
    pub fn with_manifest(mut self, manifest: PluginManifest) -> Self {
        self.extra.extend(manifest);
        self
    }

    /// Apply kind set, mode and optional manifest file from preferences
    pub fn with_preferences(mut self, preferences: &RegistryPreferences) -> Result<Self, StrategyError> {
        self.kinds = preferences.kinds.clone();
        self.enforce_uniqueness = preferences.enforce_uniqueness;
        if let Some(path) = &preferences.manifest_path {
            self.extra.extend(PluginManifest::from_file(path)?);
        }
        Ok(self)
    }

    pub fn build(self) -> Result<StrategyRegistry, StrategyError> {
        let mut manifest = self.catalog.manifest();
        manifest.extend(self.extra);

        let mut registry = StrategyRegistry::new(self.catalog);
        registry.load(&manifest, &self.kinds, self.enforce_uniqueness)?;
        Ok(registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStatistics {
    pub total_strategies: usize,
    pub by_kind: BTreeMap<StrategyKind, usize>,
    /// Entries whose implementation has been loaded
    pub resolved: usize,
    /// Entries whose locator no installed package exports
    pub unexported: usize,
    pub packages: usize,
    pub enforce_uniqueness: bool,
    pub health: RegistryHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryHealth {
    Healthy,
    Incomplete,
    Empty,
}
