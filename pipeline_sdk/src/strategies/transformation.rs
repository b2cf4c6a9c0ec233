//! # Demo Transformation
//!
//! `script/demo` runs its script synchronously and records the outcome in a
//! job table. The table belongs to the loaded implementation, so every
//! instance built from it sees the jobs of the others. It lives as long as
//! the process and keeps the most recent [`MAX_RETAINED_JOBS`] records.

use async_trait::async_trait;
use chrono::Utc;
use pipeline_base::log_debug;
use pipeline_base::models::StrategyConfig;
use pipeline_base::session::{Delta, Session};
use pipeline_base::strategies::{
    transformation, ExecutionError, JobState, PluginRegistrar, StatusRecord, Strategy,
    StrategyImplementation, StrategyKind, TransformationStrategy,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const MODULE: &str = module_path!();

/// Session key receiving the id of the last job
pub const JOB_ID_KEY: &str = "job_id";

/// Finished jobs kept for `status`; older records are evicted first
pub const MAX_RETAINED_JOBS: usize = 1024;

pub type JobTable = Arc<RwLock<JobLog>>;

/// Job records in completion order
#[derive(Debug, Default)]
pub struct JobLog {
    records: HashMap<String, StatusRecord>,
    order: VecDeque<String>,
}

impl JobLog {
    pub fn insert(&mut self, record: StatusRecord) {
        while self.order.len() >= MAX_RETAINED_JOBS {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
            }
        }
        self.order.push_back(record.id.clone());
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, job_id: &str) -> Option<&StatusRecord> {
        self.records.get(job_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ids(&self) -> Vec<&String> {
        let mut ids: Vec<&String> = self.records.keys().collect();
        ids.sort();
        ids
    }
}

pub fn register(registrar: &mut PluginRegistrar<'_>) {
    registrar
        .export(MODULE, "DemoScript", load_demo_script)
        .declare(
            StrategyKind::Transformation,
            "script/demo",
            MODULE,
            "DemoScript",
        );
}

fn load_demo_script() -> Result<Arc<dyn StrategyImplementation>, String> {
    let jobs = JobTable::default();
    Ok(transformation("demo-script", move |config| {
        Ok(DemoScript {
            config,
            jobs: Arc::clone(&jobs),
        })
    })
    .shared())
}

pub struct DemoScript {
    config: StrategyConfig,
    jobs: JobTable,
}

impl DemoScript {
    pub fn new(config: StrategyConfig, jobs: JobTable) -> Self {
        Self { config, jobs }
    }

    fn script(&self) -> &str {
        self.config
            .configuration_value("script")
            .and_then(|script| script.as_str())
            .unwrap_or("")
    }
}

#[async_trait]
impl Strategy for DemoScript {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        Ok(Delta::new())
    }

    async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        let jobs = self.jobs.read().await;
        Ok(Delta::new().with("jobs", serde_json::to_value(jobs.ids())?))
    }
}

#[async_trait]
impl TransformationStrategy for DemoScript {
    async fn run(&self, session: &Session) -> Result<Delta, ExecutionError> {
        let job_id = Uuid::new_v4().to_string();
        let mut record = StatusRecord::new(job_id.clone(), JobState::Running);
        record.started = Some(Utc::now());

        let script = self.script();
        record.status = JobState::Succeeded;
        record.finished = Some(Utc::now());
        let record = record.with_message(format!(
            "ran {} byte script over {} session keys",
            script.len(),
            session.len()
        ));

        log_debug!("Transformation job finished", "job_id" => job_id);
        self.jobs.write().await.insert(record);
        Ok(Delta::new().with(JOB_ID_KEY, job_id))
    }

    async fn status(&self, job_id: &str) -> Result<StatusRecord, ExecutionError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| ExecutionError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }
}
