//! # Strategy Pipeline Base
//!
//! Core of the strategy pipeline service: a registry of pluggable strategy
//! implementations selected by configuration, the factory binding a
//! configuration to an instance, the strategy contracts, the session merge
//! protocol and the request orchestration tying them together.

pub mod api;
pub mod config;
pub mod logging;
pub mod models;
pub mod session;
pub mod strategies;

// Convenience re-exports
pub use api::{PipelineError, PipelineService};
pub use config::ServiceConfig;

pub mod prelude {
    pub use crate::api::{PipelineError, PipelineService};
    pub use crate::config::{ServiceConfig, SessionPreferences};

    pub use crate::models::{ConfigId, StrategyConfig};

    pub use crate::session::{
        merge_delta, merge_list_item, Delta, InMemoryStore, KeyValueStore, Session, SessionError,
        SessionId, SessionManager,
    };

    pub use crate::strategies::{
        standard, transformation, Capability, CapabilitySet, ExecutionError, JobState,
        PluginCatalog, PluginManifest, PluginRegistrar, RegistryBuilder, StatusRecord, Strategy,
        StrategyDescriptor, StrategyError, StrategyFactory, StrategyImplementation,
        StrategyInstance, StrategyKind, StrategyRegistry, TransformationStrategy,
    };
}
