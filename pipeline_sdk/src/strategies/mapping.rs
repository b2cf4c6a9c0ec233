//! Demo mapping strategy: hands back the prefixes and triples it was configured with

use async_trait::async_trait;
use pipeline_base::models::StrategyConfig;
use pipeline_base::session::{Delta, Session};
use pipeline_base::strategies::{
    standard, ExecutionError, PluginRegistrar, Strategy, StrategyImplementation, StrategyKind,
};
use serde_json::{json, Value};
use std::sync::Arc;

const MODULE: &str = module_path!();

pub fn register(registrar: &mut PluginRegistrar<'_>) {
    registrar
        .export(MODULE, "DemoMapping", load_demo_mapping)
        .declare(StrategyKind::Mapping, "mapping/demo", MODULE, "DemoMapping");
}

fn load_demo_mapping() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("demo-mapping", |config| Ok(DemoMapping { config })).shared())
}

pub struct DemoMapping {
    config: StrategyConfig,
}

#[async_trait]
impl Strategy for DemoMapping {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new())
    }

    async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        let setting = |key: &str, empty: Value| {
            self.config.configuration_value(key).cloned().unwrap_or(empty)
        };
        let mapping = json!({
            "prefixes": setting("prefixes", json!({})),
            "triples": setting("triples", json!([])),
        });
        Ok(Delta::new().with("mapping", mapping))
    }
}
