//! Fixed names shared by the store layout and the plugin manifest

pub mod store {
    /// Prefix of persisted session keys (`session-<uuid>`)
    pub const SESSION_KEY_PREFIX: &str = "session";

    /// Suffix of the session keys that accumulate configuration ids
    pub const SESSION_LIST_KEY_SUFFIX: &str = "_info";
}

pub mod manifest {
    /// Manifest picked up from the working directory when none is configured
    pub const DEFAULT_MANIFEST_FILE: &str = "strategies.toml";

    /// TOML array-of-tables holding manifest entries
    pub const STRATEGY_TABLE: &str = "strategy";
}

pub mod env {
    pub const ENFORCE_UNIQUENESS: &str = "PIPELINE_ENFORCE_UNIQUENESS";
    pub const STRATEGY_KINDS: &str = "PIPELINE_STRATEGY_KINDS";
    pub const MANIFEST_PATH: &str = "PIPELINE_MANIFEST_PATH";
    pub const SERIALIZE_SESSION_UPDATES: &str = "PIPELINE_SERIALIZE_SESSION_UPDATES";
    pub const LOG_LEVEL: &str = "PIPELINE_LOG_LEVEL";
    pub const STRUCTURED_LOGGING: &str = "PIPELINE_STRUCTURED_LOGGING";
}

pub use store::{SESSION_KEY_PREFIX, SESSION_LIST_KEY_SUFFIX};
