// src/strategies/plugins.rs
//! Plugin catalog and manifests
//!
//! Plugin packages never register anything as a side effect of being linked.
//! The host calls each package's registration function once; the function
//! exports loaders under `module:symbol` locators and declares which
//! `(kind, value)` pairs they serve. Declarations form a [`PluginManifest`],
//! which can be extended with entries parsed from TOML.

use crate::config::constants::manifest::STRATEGY_TABLE;
use crate::strategies::descriptor::{ImplementationLocator, StrategyDescriptor};
use crate::strategies::errors::StrategyError;
use crate::strategies::kind::StrategyKind;
use crate::strategies::traits::StrategyImplementation;
use crate::log_debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Produces an implementation on first resolution
pub type ImplementationLoader =
    Arc<dyn Fn() -> Result<Arc<dyn StrategyImplementation>, String> + Send + Sync>;

/// Registration entry point exported by every plugin package
pub type RegisterFn = fn(&mut PluginRegistrar<'_>);

// ============================================================================
// Manifest
// ============================================================================

/// One declared strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: StrategyKind,
    pub value: String,
    pub module: String,
    pub symbol: String,
    pub package: String,
}

impl ManifestEntry {
    pub fn locator(&self) -> ImplementationLocator {
        ImplementationLocator::new(self.module.clone(), self.symbol.clone())
    }

    pub fn to_descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor::new(self.kind, self.value.clone(), self.locator(), self.package.clone())
    }

    fn validate(&self) -> Result<(), StrategyError> {
        let blank = [
            ("value", &self.value),
            ("module", &self.module),
            ("symbol", &self.symbol),
            ("package", &self.package),
        ]
        .into_iter()
        .find(|(_, field)| field.trim().is_empty());

        match blank {
            Some((name, _)) => Err(StrategyError::Manifest {
                reason: format!("{} entry has an empty '{}'", self.kind, name),
            }),
            None => Ok(()),
        }
    }
}

/// Ordered list of strategy declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(rename = "strategy", default)]
    entries: Vec<ManifestEntry>,
}

impl PluginManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parse `[[strategy]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self, StrategyError> {
        let manifest: PluginManifest =
            toml::from_str(content).map_err(|e| StrategyError::Manifest {
                reason: format!("[[{}]] tables could not be parsed: {}", STRATEGY_TABLE, e),
            })?;
        for entry in &manifest.entries {
            entry.validate()?;
        }
        Ok(manifest)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| StrategyError::Manifest {
            reason: format!("cannot read '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// Append another manifest's entries after this one's
    pub fn extend(&mut self, other: PluginManifest) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Static table of plugin modules and the loaders they export
#[derive(Clone, Default)]
pub struct PluginCatalog {
    modules: HashMap<String, HashMap<String, ImplementationLoader>>,
    declarations: Vec<ManifestEntry>,
    packages: Vec<String>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a package's registration function; installing a package twice is a no-op
    pub fn install(&mut self, package: &str, register: RegisterFn) -> &mut Self {
        if self.packages.iter().any(|p| p == package) {
            log_debug!("Plugin package already installed", "package" => package);
            return self;
        }

        self.packages.push(package.to_string());
        let mut registrar = PluginRegistrar {
            catalog: &mut *self,
            package: package.to_string(),
        };
        register(&mut registrar);

        log_debug!("Plugin package installed", "package" => package);
        self
    }

    /// Loader exported under `locator`
    pub fn loader(&self, locator: &ImplementationLocator) -> Result<ImplementationLoader, StrategyError> {
        let load_error = |reason: &str| StrategyError::ImplementationLoad {
            module: locator.module.clone(),
            symbol: locator.symbol.clone(),
            reason: reason.to_string(),
        };

        let module = self
            .modules
            .get(&locator.module)
            .ok_or_else(|| load_error("module not found"))?;
        module
            .get(&locator.symbol)
            .cloned()
            .ok_or_else(|| load_error("symbol not exported by module"))
    }

    pub fn exports(&self, locator: &ImplementationLocator) -> bool {
        self.modules
            .get(&locator.module)
            .is_some_and(|symbols| symbols.contains_key(&locator.symbol))
    }

    /// Declarations made by installed packages, in installation order
    pub fn manifest(&self) -> PluginManifest {
        PluginManifest::from_entries(self.declarations.clone())
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&String> = self.modules.keys().collect();
        modules.sort();
        f.debug_struct("PluginCatalog")
            .field("packages", &self.packages)
            .field("modules", &modules)
            .field("declarations", &self.declarations.len())
            .finish()
    }
}

/// Handle passed to a package's registration function
pub struct PluginRegistrar<'a> {
    catalog: &'a mut PluginCatalog,
    package: String,
}

impl PluginRegistrar<'_> {
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Export a loader as `module:symbol`
    pub fn export<F>(&mut self, module: &str, symbol: &str, loader: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn StrategyImplementation>, String> + Send + Sync + 'static,
    {
        self.catalog
            .modules
            .entry(module.to_string())
            .or_default()
            .insert(symbol.to_string(), Arc::new(loader));
        self
    }

    /// Declare that `module:symbol` serves `(kind, value)`
    pub fn declare(&mut self, kind: StrategyKind, value: &str, module: &str, symbol: &str) -> &mut Self {
        self.catalog.declarations.push(ManifestEntry {
            kind,
            value: value.to_string(),
            module: module.to_string(),
            symbol: symbol.to_string(),
            package: self.package.clone(),
        });
        self
    }
}
