// RUNTIME PREFERENCES (operator controlled)

use crate::config::constants::env as keys;
use crate::config::constants::manifest::DEFAULT_MANIFEST_FILE;
use crate::logging::events::LogLevel;
use crate::strategies::kind::StrategyKind;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryPreferences {
    /// Fail the load on the first duplicate `(kind, value)` instead of keeping the first
    pub enforce_uniqueness: bool,

    /// Kinds whose manifest entries are indexed
    pub kinds: Vec<StrategyKind>,

    /// Extra TOML manifest merged into the catalog declarations
    pub manifest_path: Option<PathBuf>,
}

impl Default for RegistryPreferences {
    fn default() -> Self {
        Self {
            enforce_uniqueness: env::var(keys::ENFORCE_UNIQUENESS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            kinds: env::var(keys::STRATEGY_KINDS)
                .ok()
                .and_then(|v| parse_kind_list(&v))
                .unwrap_or_else(|| StrategyKind::ALL.to_vec()),
            manifest_path: env::var(keys::MANIFEST_PATH)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl RegistryPreferences {
    /// Use `dir/strategies.toml` when no manifest is configured and the file exists
    pub fn fall_back_to_manifest_in(&mut self, dir: &Path) {
        if self.manifest_path.is_some() {
            return;
        }
        let candidate = dir.join(DEFAULT_MANIFEST_FILE);
        if candidate.is_file() {
            self.manifest_path = Some(candidate);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPreferences {
    /// Serialize read-modify-write updates per session id
    pub serialize_updates: bool,
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            serialize_updates: env::var(keys::SERIALIZE_SESSION_UPDATES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Events less severe than this are dropped before reaching `log`
    pub min_level: LogLevel,

    /// Render events as JSON lines
    pub structured: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            min_level: env::var(keys::LOG_LEVEL)
                .ok()
                .and_then(|v| LogLevel::parse(&v))
                .unwrap_or(LogLevel::Info),
            structured: env::var(keys::STRUCTURED_LOGGING)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub registry: RegistryPreferences,
    pub session: SessionPreferences,
    pub logging: LoggingPreferences,
}

impl ServiceConfig {
    /// Parse a TOML document; absent sections fall back to the environment defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// Comma separated kind names; `None` if any name is unknown
fn parse_kind_list(value: &str) -> Option<Vec<StrategyKind>> {
    let kinds: Result<Vec<StrategyKind>, _> = value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse)
        .collect();
    kinds.ok().filter(|kinds| !kinds.is_empty())
}
