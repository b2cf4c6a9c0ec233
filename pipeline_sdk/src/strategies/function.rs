//! Demo function strategy: summarizes the session it is given

use async_trait::async_trait;
use pipeline_base::models::StrategyConfig;
use pipeline_base::session::{Delta, Session};
use pipeline_base::strategies::{
    standard, ExecutionError, PluginRegistrar, Strategy, StrategyImplementation, StrategyKind,
};
use serde_json::json;
use std::sync::Arc;

const MODULE: &str = module_path!();

pub fn register(registrar: &mut PluginRegistrar<'_>) {
    registrar
        .export(MODULE, "DemoFunction", load_demo_function)
        .declare(StrategyKind::Function, "function/demo", MODULE, "DemoFunction");
}

fn load_demo_function() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("demo-function", |config| Ok(DemoFunction { config })).shared())
}

pub struct DemoFunction {
    config: StrategyConfig,
}

#[async_trait]
impl Strategy for DemoFunction {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new())
    }

    async fn get(&self, session: &Session) -> Result<Delta, ExecutionError> {
        let mut names: Vec<&String> = session.as_map().keys().collect();
        names.sort();
        Ok(Delta::new().with(
            "function_result",
            json!({ "session_keys": session.len(), "names": names }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_session_keys() {
        let config = StrategyConfig::from_value(
            StrategyKind::Function,
            json!({"functionType": "function/demo"}),
        )
        .unwrap();
        let session = Session::new().merged(&Delta::new().with("b", 1).with("a", 2));

        let delta = DemoFunction { config }.get(&session).await.unwrap();
        assert_eq!(
            delta.get("function_result"),
            Some(&json!({"session_keys": 2, "names": ["a", "b"]}))
        );
    }
}
