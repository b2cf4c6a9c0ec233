//! # Pipeline Runner
//!
//! Drives a [`PipelineService`] from a TOML pipeline definition:
//!
//! ```toml
//! [session]
//! owner = "demo"
//!
//! [[step]]
//! kind = "resource"
//! operation = "get"
//! config = { downloadUrl = "file:///tmp/rows.json", mediaType = "application/json" }
//!
//! [[step]]
//! kind = "filter"
//! config = { filterType = "filter/rows", configuration = { limit = 10 } }
//! ```
//!
//! The runner creates one session, registers each step's configuration
//! against it and executes the steps in order. A failing step stops the run.

use crate::strategies::transformation::JOB_ID_KEY;
use pipeline_base::logging::codes;
use pipeline_base::models::ConfigId;
use pipeline_base::session::{Delta, Session, SessionId};
use pipeline_base::strategies::{Capability, StrategyKind};
use pipeline_base::{log_error, log_info, PipelineError, PipelineService};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Session key receiving the record of a `status` step
pub const JOB_STATUS_KEY: &str = "job_status";

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to read pipeline definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline definition: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("Step {index}: no job id given and none in the session")]
    MissingJobId { index: usize },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One step of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub kind: StrategyKind,
    #[serde(default = "default_operation")]
    pub operation: Capability,
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Job queried by a `status` step; defaults to the session's last job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

fn default_operation() -> Capability {
    Capability::Get
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Initial session values
    #[serde(default)]
    pub session: Map<String, Value>,
    #[serde(default, rename = "step")]
    pub steps: Vec<StepDefinition>,
}

impl PipelineDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self, RunnerError> {
        let definition: Self = toml::from_str(content)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// `run` and `status` exist only for transformations
    pub fn validate(&self) -> Result<(), RunnerError> {
        for (index, step) in self.steps.iter().enumerate() {
            let transformation_only = matches!(step.operation, Capability::Run | Capability::Status);
            if transformation_only && step.kind != StrategyKind::Transformation {
                return Err(RunnerError::InvalidStep {
                    index,
                    reason: format!(
                        "operation '{}' requires kind 'transformation', found '{}'",
                        step.operation, step.kind
                    ),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub kind: StrategyKind,
    pub operation: Capability,
    pub config_id: ConfigId,
    pub delta: Delta,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub session_id: SessionId,
    pub steps: Vec<StepReport>,
    pub session: Session,
}

/// Execute every step of `definition` against a new session
pub async fn run_pipeline(
    service: &PipelineService,
    definition: &PipelineDefinition,
) -> Result<PipelineReport, RunnerError> {
    definition.validate()?;

    let session_id = service.create_session(definition.session.clone()).await?;
    log_info!("Pipeline started",
        "session_id" => session_id,
        "steps" => definition.steps.len()
    );

    let mut steps = Vec::with_capacity(definition.steps.len());
    for (index, step) in definition.steps.iter().enumerate() {
        let report = run_step(service, &session_id, index, step)
            .await
            .map_err(|err| {
                log_error!(codes::orchestration::PIPELINE_STEP_FAILED, "Pipeline aborted",
                    "session_id" => session_id,
                    "step" => index,
                    "error" => err
                );
                err
            })?;
        steps.push(report);
    }

    let session = service.get_session(&session_id).await?;
    log_info!("Pipeline finished",
        "session_id" => session_id,
        "session_keys" => session.len()
    );

    Ok(PipelineReport {
        session_id,
        steps,
        session,
    })
}

async fn run_step(
    service: &PipelineService,
    session_id: &SessionId,
    index: usize,
    step: &StepDefinition,
) -> Result<StepReport, RunnerError> {
    let config_id = service
        .create_config(step.kind, Value::Object(step.config.clone()), Some(session_id))
        .await?;

    let delta = match step.operation {
        Capability::Initialize => {
            service
                .initialize(step.kind, &config_id, Some(session_id))
                .await?
        }
        Capability::Get => service.get(step.kind, &config_id, Some(session_id)).await?,
        Capability::Run => service.run(&config_id, Some(session_id)).await?,
        Capability::Status => {
            let job_id = match &step.job_id {
                Some(job_id) => job_id.clone(),
                None => last_job_id(service, session_id)
                    .await?
                    .ok_or(RunnerError::MissingJobId { index })?,
            };
            let record = service.status(&config_id, &job_id).await?;
            let delta = Delta::new().with(JOB_STATUS_KEY, serde_json::to_value(&record)?);
            service.update_session(session_id, &delta).await?;
            delta
        }
    };

    Ok(StepReport {
        index,
        kind: step.kind,
        operation: step.operation,
        config_id,
        delta,
    })
}

async fn last_job_id(
    service: &PipelineService,
    session_id: &SessionId,
) -> Result<Option<String>, RunnerError> {
    let session = service.get_session(session_id).await?;
    Ok(session
        .get(JOB_ID_KEY)
        .and_then(Value::as_str)
        .map(str::to_string))
}
