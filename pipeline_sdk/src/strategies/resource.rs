//! # Demo Access Service
//!
//! Resource strategy serving records embedded in its own configuration.

use super::keys;
use async_trait::async_trait;
use pipeline_base::models::StrategyConfig;
use pipeline_base::session::{Delta, Session};
use pipeline_base::strategies::{
    standard, ExecutionError, PluginRegistrar, Strategy, StrategyImplementation, StrategyKind,
};
use serde_json::Value;
use std::sync::Arc;

const MODULE: &str = module_path!();

pub fn register(registrar: &mut PluginRegistrar<'_>) {
    registrar
        .export(MODULE, "DemoAccessService", load_demo_access_service)
        .declare(
            StrategyKind::Resource,
            "demo-access-service",
            MODULE,
            "DemoAccessService",
        );
}

fn load_demo_access_service() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("demo-access-service", DemoAccessService::new).shared())
}

pub struct DemoAccessService {
    config: StrategyConfig,
    access_url: String,
}

impl DemoAccessService {
    pub fn new(config: StrategyConfig) -> Result<Self, ExecutionError> {
        let access_url = config
            .get_str("accessUrl")
            .ok_or_else(|| ExecutionError::InvalidConfiguration {
                reason: "accessUrl is required".to_string(),
            })?
            .to_string();
        Ok(Self { config, access_url })
    }
}

#[async_trait]
impl Strategy for DemoAccessService {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new().with("access_url", self.access_url.as_str()))
    }

    async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        let records = self
            .config
            .configuration_value("records")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        Ok(Delta::new()
            .with("access_url", self.access_url.as_str())
            .with(keys::CONTENT, records))
    }
}
