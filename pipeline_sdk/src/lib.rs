//! # Strategy Pipeline SDK
//!
//! Reference strategy plugins for every strategy kind, plus a runner that
//! drives the pipeline service from a TOML pipeline definition.

pub mod runner;
pub mod strategies;

use pipeline_base::config::RegistryPreferences;
use pipeline_base::strategies::{PluginRegistrar, RegistryBuilder, StrategyError, StrategyRegistry};

/// Package name the reference plugins are declared under
pub const PACKAGE: &str = env!("CARGO_PKG_NAME");

/// Plugin entry point of this package
pub fn register(registrar: &mut PluginRegistrar<'_>) {
    strategies::register_all(registrar);
}

/// Create a registry with all reference strategies
///
/// Includes:
/// - File download (`file:` URLs)
/// - JSON and plain-text parsing
/// - Demo access service resource
/// - Demo and row-limit filters
/// - Demo mapping and function
/// - Demo script transformation with job status
pub fn create_strategy_registry() -> Result<StrategyRegistry, StrategyError> {
    RegistryBuilder::new().with_package(PACKAGE, register).build()
}

/// Registry limited and extended as `preferences` say
pub fn create_strategy_registry_with(
    preferences: &RegistryPreferences,
) -> Result<StrategyRegistry, StrategyError> {
    RegistryBuilder::new()
        .with_package(PACKAGE, register)
        .with_preferences(preferences)?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pipeline_base::models::StrategyConfig;
    use pipeline_base::strategies::{
        Capability, ManifestEntry, PluginManifest, RegistryHealth, StrategyFactory, StrategyKind,
    };
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_registry_creation() {
        let registry = create_strategy_registry().expect("Failed to create registry");
        let stats = registry.statistics();

        assert_eq!(stats.total_strategies, 9, "Expected 9 reference strategies");
        assert_eq!(stats.health, RegistryHealth::Healthy);
        assert_eq!(stats.packages, 1);
        assert_eq!(stats.resolved, 0, "Nothing is loaded before first use");

        let expected = [
            (StrategyKind::Download, "file"),
            (StrategyKind::Parse, "application/json"),
            (StrategyKind::Parse, "text/plain"),
            (StrategyKind::Resource, "demo-access-service"),
            (StrategyKind::Filter, "filter/demo"),
            (StrategyKind::Filter, "filter/rows"),
            (StrategyKind::Mapping, "mapping/demo"),
            (StrategyKind::Function, "function/demo"),
            (StrategyKind::Transformation, "script/demo"),
        ];
        for (kind, value) in expected {
            let descriptor = registry
                .lookup(kind, value)
                .unwrap_or_else(|err| panic!("Failed to look up {} '{}': {}", kind, value, err));
            assert_eq!(descriptor.package, PACKAGE);
            assert!(registry.resolve(descriptor).is_ok());
        }
        assert_eq!(registry.statistics().resolved, 9);
    }

    #[test]
    fn kinds_can_be_restricted() {
        let preferences = RegistryPreferences {
            kinds: vec![StrategyKind::Filter],
            ..RegistryPreferences::default()
        };
        let registry = create_strategy_registry_with(&preferences).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(StrategyKind::Download, "file"));
    }

    #[test]
    fn manifest_duplicate_fails_in_exclusive_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strategies.toml");
        std::fs::write(
            &path,
            r#"
[[strategy]]
kind = "filter"
value = "filter/demo"
module = "other::filters"
symbol = "Demo"
package = "other"
"#,
        )
        .unwrap();

        let exclusive = RegistryPreferences {
            enforce_uniqueness: true,
            kinds: StrategyKind::ALL.to_vec(),
            manifest_path: Some(path.clone()),
        };
        assert_matches!(
            create_strategy_registry_with(&exclusive),
            Err(StrategyError::DuplicateStrategy { .. })
        );

        let permissive = RegistryPreferences {
            enforce_uniqueness: false,
            ..exclusive
        };
        let registry = create_strategy_registry_with(&permissive).unwrap();
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn manifest_can_add_unexported_entries() {
        let registry = RegistryBuilder::new()
            .with_package(PACKAGE, register)
            .with_manifest(PluginManifest::from_entries(vec![ManifestEntry {
                kind: StrategyKind::Upload,
                value: "s3".to_string(),
                module: "missing::upload".to_string(),
                symbol: "S3".to_string(),
                package: "missing".to_string(),
            }]))
            .build()
            .unwrap();

        assert_eq!(registry.statistics().health, RegistryHealth::Incomplete);
        let descriptor = registry.lookup(StrategyKind::Upload, "s3").unwrap();
        assert!(matches!(
            registry.resolve(descriptor),
            Err(StrategyError::ImplementationLoad { .. })
        ));
    }

    #[test]
    fn transformation_instances_expose_status() {
        let factory = StrategyFactory::new(Arc::new(create_strategy_registry().unwrap()));
        let config = StrategyConfig::from_value(
            StrategyKind::Transformation,
            json!({"transformationType": "script/demo"}),
        )
        .unwrap();
        let instance = factory
            .make_strategy(&config, StrategyKind::Transformation)
            .unwrap();
        assert!(instance.supports(Capability::Run));
        assert!(instance.supports(Capability::Status));
    }
}
