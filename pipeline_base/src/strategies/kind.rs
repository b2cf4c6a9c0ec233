// src/strategies/kind.rs
//! Strategy kinds and their discriminator fields
//!
//! Every kind selects its implementation through exactly one configuration
//! field. The mapping is fixed here and never varies per instance.

use crate::config::constants::SESSION_LIST_KEY_SUFFIX;
use crate::strategies::errors::StrategyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of strategy kinds
///
/// Declaration order is alphabetical so the derived `Ord` matches the
/// string order used in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Download,
    Filter,
    Function,
    Mapping,
    Parse,
    Resource,
    Serialise,
    Transformation,
    Upload,
}

/// How a kind's discriminator value is read from a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    /// Plain string field
    Field(&'static str),
    /// Scheme of a URL-typed field (`sftp://host/path` -> `sftp`)
    UrlScheme(&'static str),
}

impl Discriminator {
    /// Name of the configuration field carrying the discriminator
    pub fn field(&self) -> &'static str {
        match self {
            Discriminator::Field(field) | Discriminator::UrlScheme(field) => field,
        }
    }
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 9] = [
        StrategyKind::Download,
        StrategyKind::Filter,
        StrategyKind::Function,
        StrategyKind::Mapping,
        StrategyKind::Parse,
        StrategyKind::Resource,
        StrategyKind::Serialise,
        StrategyKind::Transformation,
        StrategyKind::Upload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Download => "download",
            StrategyKind::Filter => "filter",
            StrategyKind::Function => "function",
            StrategyKind::Mapping => "mapping",
            StrategyKind::Parse => "parse",
            StrategyKind::Resource => "resource",
            StrategyKind::Serialise => "serialise",
            StrategyKind::Transformation => "transformation",
            StrategyKind::Upload => "upload",
        }
    }

    pub fn discriminator(&self) -> Discriminator {
        match self {
            StrategyKind::Download => Discriminator::UrlScheme("downloadUrl"),
            StrategyKind::Filter => Discriminator::Field("filterType"),
            StrategyKind::Function => Discriminator::Field("functionType"),
            StrategyKind::Mapping => Discriminator::Field("mappingType"),
            StrategyKind::Parse => Discriminator::Field("mediaType"),
            StrategyKind::Resource => Discriminator::Field("accessService"),
            StrategyKind::Serialise => Discriminator::Field("serialiserType"),
            StrategyKind::Transformation => Discriminator::Field("transformationType"),
            StrategyKind::Upload => Discriminator::Field("uploadType"),
        }
    }

    /// Prefix of persisted configuration keys (`{prefix}-{uuid}`)
    pub fn config_key_prefix(&self) -> &'static str {
        match self {
            StrategyKind::Resource => "dataresource",
            other => other.as_str(),
        }
    }

    /// Session key under which configuration ids of this kind are accumulated
    pub fn session_list_key(&self) -> String {
        format!("{}{}", self.as_str(), SESSION_LIST_KEY_SUFFIX)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StrategyError::UnsupportedKind {
                kind: s.to_string(),
            })
    }
}
