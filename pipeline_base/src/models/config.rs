// src/models/config.rs
//! Strategy configuration records
//!
//! A configuration is an open JSON object. Only the discriminator field of
//! its kind and the optional `configuration` sub-object are interpreted here;
//! everything else belongs to the strategy that ends up handling it.

use crate::logging::codes::{self, Code};
use crate::strategies::kind::{Discriminator, StrategyKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Field holding strategy-specific settings
pub const CONFIGURATION_FIELD: &str = "configuration";

const DOWNLOAD_PAIR: [&str; 2] = ["downloadUrl", "mediaType"];
const ACCESS_PAIR: [&str; 2] = ["accessUrl", "accessService"];

// RFC 3986: scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("static scheme pattern"));

/// Scheme of a URL, case preserved
pub fn url_scheme(url: &str) -> Option<&str> {
    URL_SCHEME
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|scheme| scheme.as_str())
}

/// Store key of a persisted configuration (`{prefix}-{uuid4}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(String);

impl ConfigId {
    pub fn generate(kind: StrategyKind) -> Self {
        Self(format!("{}-{}", kind.config_key_prefix(), Uuid::new_v4()))
    }

    /// Wrap an identifier handed back by a client; not checked until used
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Whether the key carries the prefix of `kind`
    pub fn belongs_to(&self, kind: StrategyKind) -> bool {
        self.0
            .strip_prefix(kind.config_key_prefix())
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|rest| !rest.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration must be a JSON object")]
    NotAnObject,

    #[error("{kind} configuration requires field '{field}'")]
    MissingField {
        kind: StrategyKind,
        field: &'static str,
    },

    #[error("Field '{field}' is invalid: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("{kind} configuration requires either {first:?} or {second:?}")]
    MissingFieldPair {
        kind: StrategyKind,
        first: [&'static str; 2],
        second: [&'static str; 2],
    },

    #[error("Configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn code(&self) -> Code {
        codes::factory::INVALID_CONFIGURATION
    }
}

/// Validated configuration record for one strategy kind
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    kind: StrategyKind,
    fields: Map<String, Value>,
}

impl StrategyConfig {
    /// Build and validate a configuration
    pub fn new(kind: StrategyKind, fields: Map<String, Value>) -> Result<Self, ConfigError> {
        let config = Self { kind, fields };
        config.validate()?;
        Ok(config)
    }

    pub fn from_value(kind: StrategyKind, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(fields) => Self::new(kind, fields),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    pub fn from_json_str(kind: StrategyKind, json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(kind, value)
    }

    /// Kind this configuration was registered as
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Non-empty string value of a field
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Strategy-specific settings, if any
    pub fn configuration(&self) -> Option<&Map<String, Value>> {
        self.fields.get(CONFIGURATION_FIELD).and_then(Value::as_object)
    }

    pub fn configuration_value(&self, key: &str) -> Option<&Value> {
        self.configuration().and_then(|settings| settings.get(key))
    }

    /// Copy with one field replaced, validated again
    pub fn with_field(&self, field: &str, value: impl Into<Value>) -> Result<Self, ConfigError> {
        let mut fields = self.fields.clone();
        fields.insert(field.to_string(), value.into());
        Self::new(self.kind, fields)
    }

    /// Discriminator value used to select a strategy of `kind`
    ///
    /// `kind` may differ from the configuration's own kind: a resource
    /// configuration also selects download and parse strategies.
    pub fn discriminator_value(&self, kind: StrategyKind) -> Option<&str> {
        match kind.discriminator() {
            Discriminator::Field(field) => self.get_str(field),
            Discriminator::UrlScheme(field) => self.get_str(field).and_then(url_scheme),
        }
    }

    /// Whether both fields of a pair are present
    pub fn has_pair(&self, pair: [&str; 2]) -> bool {
        pair.iter().all(|field| self.get_str(field).is_some())
    }

    /// Resource configurations without an access service are served by
    /// chaining the download and parse strategies
    pub fn uses_download_parse(&self) -> bool {
        self.kind == StrategyKind::Resource
            && self.get_str(StrategyKind::Resource.discriminator().field()).is_none()
            && self.has_pair(DOWNLOAD_PAIR)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(settings) = self.fields.get(CONFIGURATION_FIELD) {
            if !settings.is_object() && !settings.is_null() {
                return Err(ConfigError::InvalidField {
                    field: CONFIGURATION_FIELD.to_string(),
                    reason: "must be an object".to_string(),
                });
            }
        }

        if let Some(url) = self.fields.get("downloadUrl") {
            let url = url.as_str().ok_or_else(|| ConfigError::InvalidField {
                field: "downloadUrl".to_string(),
                reason: "must be a string".to_string(),
            })?;
            if url_scheme(url).is_none() {
                return Err(ConfigError::InvalidField {
                    field: "downloadUrl".to_string(),
                    reason: format!("'{}' has no URL scheme", url),
                });
            }
        }

        match self.kind {
            StrategyKind::Resource => {
                if self.has_pair(DOWNLOAD_PAIR) || self.has_pair(ACCESS_PAIR) {
                    Ok(())
                } else {
                    Err(ConfigError::MissingFieldPair {
                        kind: self.kind,
                        first: DOWNLOAD_PAIR,
                        second: ACCESS_PAIR,
                    })
                }
            }
            kind => {
                let field = kind.discriminator().field();
                if self.get_str(field).is_some() {
                    Ok(())
                } else {
                    Err(ConfigError::MissingField { kind, field })
                }
            }
        }
    }
}

impl Serialize for StrategyConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
