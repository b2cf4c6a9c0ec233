// src/strategies/mod.rs
//! Strategy module: pluggable implementations selected by configuration
//!
//! # Architecture Overview
//!
//! - **Kinds** fix which configuration field selects an implementation
//! - **Plugins** export loaders and declare the `(kind, value)` pairs they serve
//! - **Registry** indexes declarations and resolves implementations lazily
//! - **Contracts** state which operations each kind must provide
//! - **Factory** binds a configuration to a fresh strategy instance
//!
//! # Key Components
//!
//! - [`StrategyRegistry`] - index of descriptors with cached implementations
//! - [`StrategyFactory`] - configuration + kind to [`StrategyInstance`]
//! - [`Strategy`] / [`TransformationStrategy`] - async contract traits
//! - [`PluginCatalog`] - modules, exported loaders and declarations

pub mod contract;
pub mod descriptor;
pub mod errors;
pub mod factory;
pub mod kind;
pub mod plugins;
pub mod registry;
pub mod traits;

pub use contract::{Capability, CapabilitySet, ContractValidator, StrategyContract};
pub use descriptor::{ImplementationLocator, StrategyDescriptor, StrategyKey};
pub use errors::{ExecutionError, StrategyError};
pub use factory::StrategyFactory;
pub use kind::{Discriminator, StrategyKind};
pub use plugins::{
    ImplementationLoader, ManifestEntry, PluginCatalog, PluginManifest, PluginRegistrar,
    RegisterFn,
};
pub use registry::{RegistryBuilder, RegistryHealth, RegistryStatistics, StrategyRegistry};
pub use traits::{
    standard, transformation, FnImplementation, JobState, StatusRecord, Strategy,
    StrategyImplementation, StrategyInstance, TransformationStrategy,
};
