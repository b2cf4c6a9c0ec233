//! # Parse Strategies
//!
//! Decode the payload a download strategy left in the session.
//! - `application/json`: the document itself
//! - `text/plain`: one string per line

use super::keys;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
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
        .export(MODULE, "JsonParse", load_json_parse)
        .export(MODULE, "TextParse", load_text_parse)
        .declare(StrategyKind::Parse, "application/json", MODULE, "JsonParse")
        .declare(StrategyKind::Parse, "text/plain", MODULE, "TextParse");
}

fn load_json_parse() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("json-parse", |config| Ok(JsonParse { config })).shared())
}

fn load_text_parse() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("text-parse", |config| Ok(TextParse { config })).shared())
}

/// Raw payload bytes held in the session
fn payload(session: &Session) -> Result<Vec<u8>, ExecutionError> {
    let encoded = session.require_str(keys::CONTENT_BASE64)?;
    STANDARD
        .decode(encoded)
        .map_err(|err| ExecutionError::invalid(keys::CONTENT_BASE64, err.to_string()))
}

fn payload_text(session: &Session) -> Result<String, ExecutionError> {
    String::from_utf8(payload(session)?)
        .map_err(|err| ExecutionError::invalid(keys::CONTENT_BASE64, err.to_string()))
}

pub struct JsonParse {
    config: StrategyConfig,
}

#[async_trait]
impl Strategy for JsonParse {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new())
    }

    async fn get(&self, session: &Session) -> Result<Delta, ExecutionError> {
        let bytes = payload(session)?;
        let content: Value = serde_json::from_slice(&bytes)
            .map_err(|err| ExecutionError::invalid(keys::CONTENT_BASE64, err.to_string()))?;
        Ok(Delta::new().with(keys::CONTENT, content))
    }
}

pub struct TextParse {
    config: StrategyConfig,
}

#[async_trait]
impl Strategy for TextParse {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new())
    }

    async fn get(&self, session: &Session) -> Result<Delta, ExecutionError> {
        let text = payload_text(session)?;
        let lines: Vec<Value> = text.lines().map(Value::from).collect();
        Ok(Delta::new().with(keys::CONTENT, lines))
    }
}
