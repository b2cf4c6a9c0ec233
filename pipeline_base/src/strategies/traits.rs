// src/strategies/traits.rs
//! Strategy traits
//!
//! Strategies read a session snapshot and return a [`Delta`]; they never
//! mutate the session themselves. Persisting the delta is the caller's job.

use crate::models::StrategyConfig;
use crate::session::{Delta, Session};
use crate::strategies::contract::{Capability, CapabilitySet};
use crate::strategies::errors::ExecutionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Contract Traits
// ============================================================================

/// Operations every strategy provides
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Configuration this instance was built from
    fn config(&self) -> &StrategyConfig;

    /// Prepare the session for later `get` calls
    async fn initialize(&self, session: &Session) -> Result<Delta, ExecutionError>;

    /// Produce this strategy's contribution to the session
    async fn get(&self, session: &Session) -> Result<Delta, ExecutionError>;
}

/// Long-running transformations started with `run` and polled with `status`
#[async_trait]
pub trait TransformationStrategy: Strategy {
    /// Start a job; the returned delta carries its handle
    async fn run(&self, session: &Session) -> Result<Delta, ExecutionError>;

    async fn status(&self, job_id: &str) -> Result<StatusRecord, ExecutionError>;
}

// ============================================================================
// Job Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State of a transformation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub status: JobState,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
}

impl StatusRecord {
    pub fn new(id: impl Into<String>, status: JobState) -> Self {
        Self {
            id: id.into(),
            status,
            messages: Vec::new(),
            created: Some(Utc::now()),
            started: None,
            finished: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobState::Succeeded | JobState::Failed)
    }
}

// ============================================================================
// Instances
// ============================================================================

/// A bound strategy, ready to be invoked
#[derive(Clone)]
pub enum StrategyInstance {
    Standard(Arc<dyn Strategy>),
    Transformation(Arc<dyn TransformationStrategy>),
}

impl StrategyInstance {
    pub fn standard<S: Strategy + 'static>(strategy: S) -> Self {
        StrategyInstance::Standard(Arc::new(strategy))
    }

    pub fn transformation<S: TransformationStrategy + 'static>(strategy: S) -> Self {
        StrategyInstance::Transformation(Arc::new(strategy))
    }

    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            StrategyInstance::Standard(_) => CapabilitySet::standard(),
            StrategyInstance::Transformation(_) => CapabilitySet::transformation(),
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    pub fn config(&self) -> &StrategyConfig {
        match self {
            StrategyInstance::Standard(strategy) => strategy.config(),
            StrategyInstance::Transformation(strategy) => strategy.config(),
        }
    }

    pub async fn initialize(&self, session: &Session) -> Result<Delta, ExecutionError> {
        match self {
            StrategyInstance::Standard(strategy) => strategy.initialize(session).await,
            StrategyInstance::Transformation(strategy) => strategy.initialize(session).await,
        }
    }

    pub async fn get(&self, session: &Session) -> Result<Delta, ExecutionError> {
        match self {
            StrategyInstance::Standard(strategy) => strategy.get(session).await,
            StrategyInstance::Transformation(strategy) => strategy.get(session).await,
        }
    }

    pub async fn run(&self, session: &Session) -> Result<Delta, ExecutionError> {
        match self {
            StrategyInstance::Transformation(strategy) => strategy.run(session).await,
            StrategyInstance::Standard(_) => Err(self.unsupported(Capability::Run)),
        }
    }

    pub async fn status(&self, job_id: &str) -> Result<StatusRecord, ExecutionError> {
        match self {
            StrategyInstance::Transformation(strategy) => strategy.status(job_id).await,
            StrategyInstance::Standard(_) => Err(self.unsupported(Capability::Status)),
        }
    }

    fn unsupported(&self, capability: Capability) -> ExecutionError {
        let config = self.config();
        let kind = config.kind();
        ExecutionError::UnsupportedOperation {
            operation: capability.as_str(),
            strategy: format!(
                "{} '{}'",
                kind,
                config.discriminator_value(kind).unwrap_or("?")
            ),
        }
    }
}

impl fmt::Debug for StrategyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            StrategyInstance::Standard(_) => "Standard",
            StrategyInstance::Transformation(_) => "Transformation",
        };
        f.debug_struct("StrategyInstance")
            .field("variant", &variant)
            .field("config", self.config())
            .finish()
    }
}

// ============================================================================
// Implementations
// ============================================================================

/// What a plugin loader hands to the registry
pub trait StrategyImplementation: Send + Sync {
    /// Human readable implementation name
    fn name(&self) -> &str;

    /// Capabilities this implementation declares
    fn capabilities(&self) -> CapabilitySet;

    /// Bind a configuration
    fn instantiate(&self, config: StrategyConfig) -> Result<StrategyInstance, ExecutionError>;
}

type InstanceBuilder =
    Box<dyn Fn(StrategyConfig) -> Result<StrategyInstance, ExecutionError> + Send + Sync>;

/// Implementation backed by a constructor closure
pub struct FnImplementation {
    name: String,
    capabilities: CapabilitySet,
    build: InstanceBuilder,
}

impl FnImplementation {
    pub fn new<F>(name: impl Into<String>, capabilities: CapabilitySet, build: F) -> Self
    where
        F: Fn(StrategyConfig) -> Result<StrategyInstance, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            capabilities,
            build: Box::new(build),
        }
    }

    /// Override the declared capabilities
    pub fn declaring(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn shared(self) -> Arc<dyn StrategyImplementation> {
        Arc::new(self)
    }
}

impl StrategyImplementation for FnImplementation {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    fn instantiate(&self, config: StrategyConfig) -> Result<StrategyInstance, ExecutionError> {
        (self.build)(config)
    }
}

/// Implementation of a standard strategy from its constructor
pub fn standard<S, F>(name: impl Into<String>, build: F) -> FnImplementation
where
    S: Strategy + 'static,
    F: Fn(StrategyConfig) -> Result<S, ExecutionError> + Send + Sync + 'static,
{
    FnImplementation::new(name, CapabilitySet::standard(), move |config| {
        build(config).map(StrategyInstance::standard)
    })
}

/// Implementation of a transformation strategy from its constructor
pub fn transformation<S, F>(name: impl Into<String>, build: F) -> FnImplementation
where
    S: TransformationStrategy + 'static,
    F: Fn(StrategyConfig) -> Result<S, ExecutionError> + Send + Sync + 'static,
{
    FnImplementation::new(name, CapabilitySet::transformation(), move |config| {
        build(config).map(StrategyInstance::transformation)
    })
}
