// src/strategies/factory.rs
//! Strategy factory
//!
//! Turns a configuration plus a kind into a bound strategy instance.

use crate::logging::codes;
use crate::models::StrategyConfig;
use crate::strategies::contract::ContractValidator;
use crate::strategies::errors::StrategyError;
use crate::strategies::kind::StrategyKind;
use crate::strategies::registry::StrategyRegistry;
use crate::strategies::traits::StrategyInstance;
use crate::{log_debug, log_error};
use std::sync::Arc;

/// Builds strategy instances from configurations
#[derive(Debug, Clone)]
pub struct StrategyFactory {
    registry: Arc<StrategyRegistry>,
    validator: ContractValidator,
}

impl StrategyFactory {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self {
            registry,
            validator: ContractValidator::new(),
        }
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Resolve and instantiate the strategy of `kind` selected by `config`
    ///
    /// `kind` may differ from the configuration's own kind (a resource
    /// configuration also selects download and parse strategies). Every call
    /// returns a fresh instance.
    pub fn make_strategy(
        &self,
        config: &StrategyConfig,
        kind: StrategyKind,
    ) -> Result<StrategyInstance, StrategyError> {
        let value = config
            .discriminator_value(kind)
            .ok_or(StrategyError::MissingDiscriminator {
                kind,
                field: kind.discriminator().field(),
            })?;

        let descriptor = self.registry.lookup(kind, value).map_err(|err| {
            log_error!(err.code(), "No strategy for configuration",
                "kind" => kind,
                "value" => value
            );
            err
        })?;
        let implementation = self.registry.resolve(descriptor)?;

        let instance = implementation.instantiate(config.clone()).map_err(|source| {
            StrategyError::Instantiation {
                kind,
                value: value.to_string(),
                source,
            }
        })?;

        self.validator
            .verify(kind, value, &instance.capabilities())?;

        log_debug!("Strategy instantiated",
            "code" => codes::success::STRATEGY_CREATED,
            "kind" => kind,
            "value" => value,
            "implementation" => implementation.name()
        );
        Ok(instance)
    }

    /// `make_strategy` with the kind given by name
    pub fn make_strategy_by_name(
        &self,
        config: &StrategyConfig,
        kind: &str,
    ) -> Result<StrategyInstance, StrategyError> {
        let kind: StrategyKind = kind.parse()?;
        self.make_strategy(config, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Delta, Session};
    use crate::strategies::contract::{Capability, CapabilitySet};
    use crate::strategies::errors::ExecutionError;
    use crate::strategies::plugins::PluginRegistrar;
    use crate::strategies::registry::RegistryBuilder;
    use crate::strategies::traits::{
        standard, transformation, FnImplementation, StatusRecord, Strategy,
        StrategyImplementation, TransformationStrategy,
    };
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::json;

    struct Tagged {
        config: StrategyConfig,
        tag: &'static str,
    }

    #[async_trait]
    impl Strategy for Tagged {
        fn config(&self) -> &StrategyConfig {
            &self.config
        }

        async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new())
        }

        async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new().with("handled_by", self.tag))
        }
    }

    #[async_trait]
    impl TransformationStrategy for Tagged {
        async fn run(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new())
        }

        async fn status(&self, job_id: &str) -> Result<StatusRecord, ExecutionError> {
            Err(ExecutionError::JobNotFound {
                job_id: job_id.to_string(),
            })
        }
    }

    fn loader(tag: &'static str) -> Result<Arc<dyn StrategyImplementation>, String> {
        Ok(standard(tag, move |config| Ok(Tagged { config, tag })).shared())
    }

    fn register(registrar: &mut PluginRegistrar<'_>) {
        registrar
            .export("test::download", "Ftp", || loader("ftp"))
            .export("test::download", "Sftp", || loader("sftp"))
            .export("test::download", "Https", || loader("https"))
            .export("test::filter", "Demo", || loader("filter/demo"))
            .export("test::filter", "Refusing", || {
                Ok(FnImplementation::new("refusing", CapabilitySet::standard(), |_| {
                    Err(ExecutionError::InvalidConfiguration {
                        reason: "limit must be positive".to_string(),
                    })
                })
                .shared())
            })
            // Declares the transformation contract but builds standard instances
            .export("test::transform", "Liar", || {
                Ok(FnImplementation::new("liar", CapabilitySet::transformation(), |config| {
                    Ok(StrategyInstance::standard(Tagged { config, tag: "liar" }))
                })
                .shared())
            })
            .export("test::transform", "Script", || {
                Ok(transformation("script", |config| {
                    Ok(Tagged { config, tag: "script" })
                })
                .shared())
            })
            .declare(StrategyKind::Download, "ftp", "test::download", "Ftp")
            .declare(StrategyKind::Download, "sftp", "test::download", "Sftp")
            .declare(StrategyKind::Download, "https", "test::download", "Https")
            .declare(StrategyKind::Filter, "filter/demo", "test::filter", "Demo")
            .declare(StrategyKind::Filter, "filter/refusing", "test::filter", "Refusing")
            .declare(StrategyKind::Transformation, "script/liar", "test::transform", "Liar")
            .declare(StrategyKind::Transformation, "script/demo", "test::transform", "Script");
    }

    fn factory() -> StrategyFactory {
        let registry = RegistryBuilder::new()
            .with_package("test", register)
            .build()
            .unwrap();
        StrategyFactory::new(Arc::new(registry))
    }

    fn config(kind: StrategyKind, value: serde_json::Value) -> StrategyConfig {
        StrategyConfig::from_value(kind, value).unwrap()
    }

    #[tokio::test]
    async fn download_is_selected_by_url_scheme() {
        let factory = factory();
        let config = config(
            StrategyKind::Download,
            json!({"downloadUrl": "sftp://host/path"}),
        );

        let instance = factory.make_strategy(&config, StrategyKind::Download).unwrap();
        let delta = instance.get(&Session::new()).await.unwrap();
        assert_eq!(delta.get("handled_by"), Some(&json!("sftp")));
    }

    #[test]
    fn unregistered_discriminator_is_not_found() {
        let factory = factory();
        let registered = config(StrategyKind::Filter, json!({"filterType": "filter/demo"}));
        assert!(factory.make_strategy(&registered, StrategyKind::Filter).is_ok());

        let changed = registered.with_field("filterType", "filter/unknown").unwrap();
        assert_matches!(
            factory.make_strategy(&changed, StrategyKind::Filter),
            Err(StrategyError::StrategyNotFound { kind: StrategyKind::Filter, value })
                if value == "filter/unknown"
        );
    }

    #[test]
    fn scheme_is_case_preserved() {
        let factory = factory();
        let config = config(
            StrategyKind::Download,
            json!({"downloadUrl": "SFTP://host/path"}),
        );
        assert_matches!(
            factory.make_strategy(&config, StrategyKind::Download),
            Err(StrategyError::StrategyNotFound { value, .. }) if value == "SFTP"
        );
    }

    #[test]
    fn missing_discriminator_names_field() {
        let factory = factory();
        let config = config(StrategyKind::Filter, json!({"filterType": "filter/demo"}));
        assert_matches!(
            factory.make_strategy(&config, StrategyKind::Download),
            Err(StrategyError::MissingDiscriminator {
                kind: StrategyKind::Download,
                field: "downloadUrl"
            })
        );
    }

    #[test]
    fn by_name_rejects_unknown_kind() {
        let factory = factory();
        let config = config(StrategyKind::Filter, json!({"filterType": "filter/demo"}));
        assert!(factory.make_strategy_by_name(&config, "filter").is_ok());
        assert_matches!(
            factory.make_strategy_by_name(&config, "Filter"),
            Err(StrategyError::UnsupportedKind { .. })
        );
    }

    #[test]
    fn instantiation_failure_is_distinguishable() {
        let factory = factory();
        let config = config(StrategyKind::Filter, json!({"filterType": "filter/refusing"}));
        assert_matches!(
            factory.make_strategy(&config, StrategyKind::Filter),
            Err(StrategyError::Instantiation {
                source: ExecutionError::InvalidConfiguration { .. },
                ..
            })
        );
    }

    #[test]
    fn instance_capabilities_are_checked() {
        let factory = factory();
        let liar = config(
            StrategyKind::Transformation,
            json!({"transformationType": "script/liar"}),
        );
        assert_matches!(
            factory.make_strategy(&liar, StrategyKind::Transformation),
            Err(StrategyError::MalformedStrategy { capability: Capability::Run, .. })
        );

        let script = config(
            StrategyKind::Transformation,
            json!({"transformationType": "script/demo"}),
        );
        let instance = factory
            .make_strategy(&script, StrategyKind::Transformation)
            .unwrap();
        assert!(instance.supports(Capability::Status));
    }

    #[test]
    fn each_call_returns_an_independent_instance() {
        let factory = factory();
        let config = config(StrategyKind::Filter, json!({"filterType": "filter/demo"}));
        let first = factory.make_strategy(&config, StrategyKind::Filter).unwrap();
        let second = factory.make_strategy(&config, StrategyKind::Filter).unwrap();

        match (first, second) {
            (StrategyInstance::Standard(a), StrategyInstance::Standard(b)) => {
                assert!(!Arc::ptr_eq(&a, &b))
            }
            other => panic!("unexpected instances: {:?}", other),
        }
    }
}
