//! # Filter Strategies
//!
//! - `filter/demo`: registers a collection on initialize, echoes its query on get
//! - `filter/rows`: keeps the first `limit` rows of the session content

use super::keys;
use async_trait::async_trait;
use pipeline_base::log_debug;
use pipeline_base::models::StrategyConfig;
use pipeline_base::session::{Delta, Session};
use pipeline_base::strategies::{
    standard, ExecutionError, PluginRegistrar, Strategy, StrategyImplementation, StrategyKind,
};
use serde_json::Value;
use std::sync::Arc;

const MODULE: &str = module_path!();

/// Collection id handed out by `filter/demo`
pub const DEMO_COLLECTION: &str = "collectionid";

pub fn register(registrar: &mut PluginRegistrar<'_>) {
    registrar
        .export(MODULE, "DemoFilter", load_demo_filter)
        .export(MODULE, "RowLimitFilter", load_row_limit_filter)
        .declare(StrategyKind::Filter, "filter/demo", MODULE, "DemoFilter")
        .declare(StrategyKind::Filter, "filter/rows", MODULE, "RowLimitFilter");
}

fn load_demo_filter() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("demo-filter", |config| Ok(DemoFilter { config })).shared())
}

fn load_row_limit_filter() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("row-limit-filter", RowLimitFilter::new).shared())
}

pub struct DemoFilter {
    config: StrategyConfig,
}

#[async_trait]
impl Strategy for DemoFilter {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new().with("result", DEMO_COLLECTION))
    }

    async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        let query = self
            .config
            .configuration_value("query")
            .cloned()
            .unwrap_or(Value::Null);
        Ok(Delta::new().with("result", query))
    }
}

#[derive(Debug)]
pub struct RowLimitFilter {
    config: StrategyConfig,
    limit: usize,
}

impl RowLimitFilter {
    pub fn new(config: StrategyConfig) -> Result<Self, ExecutionError> {
        let limit = config
            .configuration_value("limit")
            .and_then(Value::as_u64)
            .filter(|limit| *limit > 0)
            .ok_or_else(|| ExecutionError::InvalidConfiguration {
                reason: "configuration.limit must be a positive integer".to_string(),
            })?;

        let limit = usize::try_from(limit).map_err(|_| ExecutionError::InvalidConfiguration {
            reason: format!("configuration.limit {} is out of range", limit),
        })?;
        Ok(Self { config, limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[async_trait]
impl Strategy for RowLimitFilter {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new())
    }

    async fn get(&self, session: &Session) -> Result<Delta, ExecutionError> {
        let rows = session
            .require(keys::CONTENT)?
            .as_array()
            .ok_or_else(|| ExecutionError::invalid(keys::CONTENT, "expected an array"))?;

        let kept: Vec<Value> = rows.iter().take(self.limit).cloned().collect();
        log_debug!("Rows filtered", "kept" => kept.len(), "total" => rows.len());
        Ok(Delta::new().with(keys::CONTENT, kept))
    }
}
