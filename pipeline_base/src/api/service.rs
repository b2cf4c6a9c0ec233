//! # Pipeline Service
//!
//! Request orchestration: load the persisted configuration, resolve its
//! strategy through the factory, invoke it with the current session
//! snapshot and merge the returned delta back into the session.

use crate::api::errors::PipelineError;
use crate::config::runtime::ServiceConfig;
use crate::logging::codes;
use crate::models::{ConfigId, StrategyConfig};
use crate::session::{Delta, KeyValueStore, Session, SessionId, SessionManager};
use crate::strategies::{
    Capability, StatusRecord, StrategyFactory, StrategyInstance, StrategyKind, StrategyRegistry,
};
use crate::{log_debug, log_error, log_success};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct PipelineService {
    factory: StrategyFactory,
    sessions: SessionManager,
    store: Arc<dyn KeyValueStore>,
}

impl PipelineService {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        store: Arc<dyn KeyValueStore>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            factory: StrategyFactory::new(registry),
            sessions: SessionManager::new(Arc::clone(&store), &config.session),
            store,
        }
    }

    pub fn factory(&self) -> &StrategyFactory {
        &self.factory
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        self.factory.registry()
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub async fn create_session(&self, initial: Map<String, Value>) -> Result<SessionId, PipelineError> {
        Ok(self.sessions.create_session(initial).await?)
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Session, PipelineError> {
        Ok(self.sessions.get_session(id).await?)
    }

    pub async fn update_session(&self, id: &SessionId, delta: &Delta) -> Result<Session, PipelineError> {
        Ok(self.sessions.update_session(id, delta).await?)
    }

    pub async fn delete_session(&self, id: &SessionId) -> Result<(), PipelineError> {
        Ok(self.sessions.delete_session(id).await?)
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionId>, PipelineError> {
        Ok(self.sessions.list_sessions().await?)
    }

    // ========================================================================
    // Configurations
    // ========================================================================

    /// Validate and persist a configuration
    ///
    /// With a session, the new id is accumulated under `{kind}_info`.
    pub async fn create_config(
        &self,
        kind: StrategyKind,
        fields: Value,
        session_id: Option<&SessionId>,
    ) -> Result<ConfigId, PipelineError> {
        let config = StrategyConfig::from_value(kind, fields)?;
        if let Some(session_id) = session_id {
            // Fail before persisting anything for an unknown session
            self.sessions.get_session(session_id).await?;
        }

        let id = ConfigId::generate(kind);
        self.store
            .set(id.as_str(), serde_json::to_string(&config)?)
            .await?;

        if let Some(session_id) = session_id {
            let listed = self
                .sessions
                .update_session_list_item(
                    session_id,
                    &kind.session_list_key(),
                    vec![Value::String(id.to_string())],
                )
                .await;
            if let Err(err) = listed {
                // No config record outlives a failed registration
                self.store.delete(id.as_str()).await?;
                log_error!(err.code(), "Configuration not registered against session",
                    "kind" => kind,
                    "config_id" => id,
                    "session_id" => session_id,
                    "error" => err
                );
                return Err(err.into());
            }
        }

        log_success!(codes::success::CONFIG_REGISTERED, "Configuration registered",
            "kind" => kind,
            "config_id" => id,
            "session_id" => session_id.map(SessionId::as_str).unwrap_or("-")
        );
        Ok(id)
    }

    pub async fn get_config(&self, kind: StrategyKind, id: &ConfigId) -> Result<StrategyConfig, PipelineError> {
        let not_found = || PipelineError::ConfigNotFound {
            config_id: id.to_string(),
        };
        if !id.belongs_to(kind) {
            return Err(not_found());
        }

        let raw = self.store.get(id.as_str()).await?.ok_or_else(not_found)?;
        let value: Value = serde_json::from_str(&raw)?;
        Ok(StrategyConfig::from_value(kind, value)?)
    }

    pub async fn delete_config(&self, kind: StrategyKind, id: &ConfigId) -> Result<(), PipelineError> {
        if !id.belongs_to(kind) || !self.store.delete(id.as_str()).await? {
            return Err(PipelineError::ConfigNotFound {
                config_id: id.to_string(),
            });
        }
        log_debug!("Configuration deleted", "kind" => kind, "config_id" => id);
        Ok(())
    }

    pub async fn list_configs(&self, kind: StrategyKind) -> Result<Vec<ConfigId>, PipelineError> {
        let prefix = format!("{}-", kind.config_key_prefix());
        let keys = self.store.keys(&prefix).await?;
        Ok(keys.into_iter().map(ConfigId::new).collect())
    }

    // ========================================================================
    // Strategy operations
    // ========================================================================

    pub async fn initialize(
        &self,
        kind: StrategyKind,
        config_id: &ConfigId,
        session_id: Option<&SessionId>,
    ) -> Result<Delta, PipelineError> {
        self.execute(kind, Capability::Initialize, config_id, session_id)
            .await
    }

    pub async fn get(
        &self,
        kind: StrategyKind,
        config_id: &ConfigId,
        session_id: Option<&SessionId>,
    ) -> Result<Delta, PipelineError> {
        self.execute(kind, Capability::Get, config_id, session_id).await
    }

    /// Start a transformation job
    pub async fn run(
        &self,
        config_id: &ConfigId,
        session_id: Option<&SessionId>,
    ) -> Result<Delta, PipelineError> {
        self.execute(StrategyKind::Transformation, Capability::Run, config_id, session_id)
            .await
    }

    /// Status of a transformation job; sessions are not involved
    pub async fn status(&self, config_id: &ConfigId, job_id: &str) -> Result<StatusRecord, PipelineError> {
        let config = self
            .get_config(StrategyKind::Transformation, config_id)
            .await?;
        let instance = self
            .factory
            .make_strategy(&config, StrategyKind::Transformation)?;
        Ok(instance.status(job_id).await?)
    }

    async fn execute(
        &self,
        kind: StrategyKind,
        operation: Capability,
        config_id: &ConfigId,
        session_id: Option<&SessionId>,
    ) -> Result<Delta, PipelineError> {
        let config = self.get_config(kind, config_id).await?;
        let snapshot = match session_id {
            Some(id) => self.sessions.get_session(id).await?,
            None => Session::new(),
        };

        let result = if config.uses_download_parse() && operation != Capability::Run {
            self.download_then_parse(&config, operation, &snapshot).await
        } else {
            match self.factory.make_strategy(&config, kind) {
                Ok(instance) => invoke(&instance, operation, &snapshot).await,
                Err(err) => Err(err.into()),
            }
        };

        let delta = result.map_err(|err| {
            log_error!(err.code(), "Pipeline step failed",
                "kind" => kind,
                "operation" => operation,
                "config_id" => config_id,
                "error" => err
            );
            err
        })?;

        if let Some(id) = session_id {
            self.sessions.update_session(id, &delta).await?;
        }

        log_success!(codes::success::PIPELINE_STEP_COMPLETED, "Pipeline step completed",
            "kind" => kind,
            "operation" => operation,
            "config_id" => config_id,
            "delta_keys" => delta.len()
        );
        Ok(delta)
    }

    /// Resource served by its download strategy followed by its parse strategy
    async fn download_then_parse(
        &self,
        config: &StrategyConfig,
        operation: Capability,
        snapshot: &Session,
    ) -> Result<Delta, PipelineError> {
        let download = self.factory.make_strategy(config, StrategyKind::Download)?;
        let mut delta = invoke(&download, operation, snapshot).await?;

        let parse = self.factory.make_strategy(config, StrategyKind::Parse)?;
        let parsed = invoke(&parse, operation, &snapshot.merged(&delta)).await?;

        delta.extend(parsed);
        Ok(delta)
    }
}

async fn invoke(
    instance: &StrategyInstance,
    operation: Capability,
    snapshot: &Session,
) -> Result<Delta, PipelineError> {
    let delta = match operation {
        Capability::Initialize => instance.initialize(snapshot).await?,
        Capability::Get => instance.get(snapshot).await?,
        Capability::Run => instance.run(snapshot).await?,
        Capability::Status => {
            return Err(crate::strategies::ExecutionError::UnsupportedOperation {
                operation: Capability::Status.as_str(),
                strategy: "session step".to_string(),
            }
            .into())
        }
    };
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{InMemoryStore, SessionError, StoreError};
    use crate::strategies::{
        standard, transformation, ExecutionError, JobState, PluginRegistrar, RegistryBuilder,
        Strategy, StrategyError, TransformationStrategy,
    };
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adds `filtered: true` plus the configured label
    struct LabelFilter {
        config: StrategyConfig,
    }

    #[async_trait]
    impl Strategy for LabelFilter {
        fn config(&self) -> &StrategyConfig {
            &self.config
        }

        async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new().with("filter_ready", true))
        }

        async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            let label = self
                .config
                .configuration_value("label")
                .cloned()
                .unwrap_or(Value::Null);
            Ok(Delta::new().with("filtered", true).with("label", label))
        }
    }

    struct FakeDownload {
        config: StrategyConfig,
    }

    #[async_trait]
    impl Strategy for FakeDownload {
        fn config(&self) -> &StrategyConfig {
            &self.config
        }

        async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new())
        }

        async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new().with("raw", "a,b"))
        }
    }

    struct FakeParse {
        config: StrategyConfig,
    }

    #[async_trait]
    impl Strategy for FakeParse {
        fn config(&self) -> &StrategyConfig {
            &self.config
        }

        async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new())
        }

        async fn get(&self, session: &Session) -> Result<Delta, ExecutionError> {
            let raw = session.require_str("raw")?;
            let items: Vec<Value> = raw.split(',').map(|s| json!(s)).collect();
            Ok(Delta::new().with("content", items))
        }
    }

    struct Script {
        config: StrategyConfig,
    }

    #[async_trait]
    impl Strategy for Script {
        fn config(&self) -> &StrategyConfig {
            &self.config
        }

        async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new())
        }

        async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new())
        }
    }

    #[async_trait]
    impl TransformationStrategy for Script {
        async fn run(&self, _session: &Session) -> Result<Delta, ExecutionError> {
            Ok(Delta::new().with("job_id", "job-1"))
        }

        async fn status(&self, job_id: &str) -> Result<StatusRecord, ExecutionError> {
            if job_id == "job-1" {
                Ok(StatusRecord::new(job_id, JobState::Succeeded))
            } else {
                Err(ExecutionError::JobNotFound {
                    job_id: job_id.to_string(),
                })
            }
        }
    }

    fn register(registrar: &mut PluginRegistrar<'_>) {
        registrar
            .export("test::filter", "Label", || {
                Ok(standard("label", |config| Ok(LabelFilter { config })).shared())
            })
            .export("test::resource", "Download", || {
                Ok(standard("download", |config| Ok(FakeDownload { config })).shared())
            })
            .export("test::resource", "Parse", || {
                Ok(standard("parse", |config| Ok(FakeParse { config })).shared())
            })
            .export("test::transform", "Script", || {
                Ok(transformation("script", |config| Ok(Script { config })).shared())
            })
            .declare(StrategyKind::Filter, "filter/demo", "test::filter", "Label")
            .declare(StrategyKind::Download, "file", "test::resource", "Download")
            .declare(StrategyKind::Parse, "text/csv", "test::resource", "Parse")
            .declare(StrategyKind::Transformation, "script/demo", "test::transform", "Script");
    }

    /// Store wrapper counting mutations
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(key).await
        }

        async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
            self.inner.keys(prefix).await
        }
    }

    fn service_with(store: Arc<dyn KeyValueStore>) -> PipelineService {
        let registry = RegistryBuilder::new()
            .with_package("test", register)
            .build()
            .unwrap();
        PipelineService::new(Arc::new(registry), store, &ServiceConfig::default())
    }

    fn service() -> PipelineService {
        service_with(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn filter_without_session_writes_nothing() {
        let store = Arc::new(CountingStore::default());
        let service = service_with(store.clone());

        let id = service
            .create_config(
                StrategyKind::Filter,
                json!({"filterType": "filter/demo", "configuration": {"label": "x"}}),
                None,
            )
            .await
            .unwrap();
        let writes_after_create = store.writes.load(Ordering::SeqCst);
        assert_eq!(writes_after_create, 1);

        let delta = service.get(StrategyKind::Filter, &id, None).await.unwrap();
        assert_eq!(delta.to_value(), json!({"filtered": true, "label": "x"}));
        assert_eq!(store.writes.load(Ordering::SeqCst), writes_after_create);
    }

    #[tokio::test]
    async fn create_config_accumulates_ids_in_session() {
        let service = service();
        let session = service.create_session(Map::new()).await.unwrap();

        let first = service
            .create_config(StrategyKind::Filter, json!({"filterType": "filter/demo"}), Some(&session))
            .await
            .unwrap();
        let second = service
            .create_config(StrategyKind::Filter, json!({"filterType": "filter/demo"}), Some(&session))
            .await
            .unwrap();

        assert!(first.as_str().starts_with("filter-"));
        let snapshot = service.get_session(&session).await.unwrap();
        assert_eq!(
            snapshot.get("filter_info"),
            Some(&json!([first.as_str(), [second.as_str()]]))
        );
        assert_eq!(service.list_configs(StrategyKind::Filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_config_with_unknown_session_persists_nothing() {
        let service = service();
        assert_matches!(
            service
                .create_config(
                    StrategyKind::Filter,
                    json!({"filterType": "filter/demo"}),
                    Some(&SessionId::generate())
                )
                .await,
            Err(PipelineError::Session(SessionError::NotFound { .. }))
        );
        assert!(service.list_configs(StrategyKind::Filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_config_rolls_back_when_list_key_is_not_a_list() {
        let service = service();
        let mut initial = Map::new();
        initial.insert("filter_info".to_string(), json!("scalar"));
        let session = service.create_session(initial).await.unwrap();

        assert_matches!(
            service
                .create_config(StrategyKind::Filter, json!({"filterType": "filter/demo"}), Some(&session))
                .await,
            Err(PipelineError::Session(SessionError::NotAList { key })) if key == "filter_info"
        );
        assert!(service.list_configs(StrategyKind::Filter).await.unwrap().is_empty());

        let snapshot = service.get_session(&session).await.unwrap();
        assert_eq!(snapshot.get("filter_info"), Some(&json!("scalar")));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let service = service();
        let err = service
            .create_config(StrategyKind::Mapping, json!({"configuration": {}}), None)
            .await
            .unwrap_err();
        assert_matches!(err, PipelineError::Config(_));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn get_merges_delta_into_session() {
        let service = service();
        let session = service
            .create_session(json!({"label": "old"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let id = service
            .create_config(
                StrategyKind::Filter,
                json!({"filterType": "filter/demo", "configuration": {"label": "new"}}),
                Some(&session),
            )
            .await
            .unwrap();

        service.initialize(StrategyKind::Filter, &id, Some(&session)).await.unwrap();
        service.get(StrategyKind::Filter, &id, Some(&session)).await.unwrap();

        let snapshot = service.get_session(&session).await.unwrap();
        assert_eq!(snapshot.get("label"), Some(&json!("new")));
        assert_eq!(snapshot.get("filtered"), Some(&json!(true)));
        assert_eq!(snapshot.get("filter_ready"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn resource_without_access_service_chains_download_and_parse() {
        let service = service();
        let session = service.create_session(Map::new()).await.unwrap();
        let id = service
            .create_config(
                StrategyKind::Resource,
                json!({"downloadUrl": "file:///tmp/data.csv", "mediaType": "text/csv"}),
                Some(&session),
            )
            .await
            .unwrap();
        assert!(id.as_str().starts_with("dataresource-"));

        let delta = service.get(StrategyKind::Resource, &id, Some(&session)).await.unwrap();
        assert_eq!(delta.get("content"), Some(&json!(["a", "b"])));

        let snapshot = service.get_session(&session).await.unwrap();
        assert_eq!(snapshot.get("raw"), Some(&json!("a,b")));
        assert_eq!(snapshot.get("resource_info"), Some(&json!([id.as_str()])));
    }

    #[tokio::test]
    async fn unregistered_access_service_is_not_found() {
        let service = service();
        let id = service
            .create_config(
                StrategyKind::Resource,
                json!({"accessUrl": "https://example.org", "accessService": "nope"}),
                None,
            )
            .await
            .unwrap();
        let err = service.get(StrategyKind::Resource, &id, None).await.unwrap_err();
        assert_matches!(err, PipelineError::Strategy(StrategyError::StrategyNotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn transformation_run_and_status() {
        let service = service();
        let id = service
            .create_config(
                StrategyKind::Transformation,
                json!({"transformationType": "script/demo"}),
                None,
            )
            .await
            .unwrap();

        let delta = service.run(&id, None).await.unwrap();
        assert_eq!(delta.get("job_id"), Some(&json!("job-1")));

        let status = service.status(&id, "job-1").await.unwrap();
        assert_eq!(status.status, JobState::Succeeded);
        assert_matches!(
            service.status(&id, "job-2").await,
            Err(PipelineError::Execution(ExecutionError::JobNotFound { .. }))
        );
    }

    #[tokio::test]
    async fn config_lookup_checks_kind_prefix() {
        let service = service();
        let id = service
            .create_config(StrategyKind::Filter, json!({"filterType": "filter/demo"}), None)
            .await
            .unwrap();

        assert_matches!(
            service.get_config(StrategyKind::Mapping, &id).await,
            Err(PipelineError::ConfigNotFound { .. })
        );
        assert!(service.get_config(StrategyKind::Filter, &id).await.is_ok());

        service.delete_config(StrategyKind::Filter, &id).await.unwrap();
        assert_matches!(
            service.get(StrategyKind::Filter, &id, None).await,
            Err(PipelineError::ConfigNotFound { .. })
        );
    }

    #[tokio::test]
    async fn failing_step_leaves_session_untouched() {
        let service = service();
        let session = service.create_session(Map::new()).await.unwrap();
        let id = service
            .create_config(StrategyKind::Parse, json!({"mediaType": "text/csv"}), None)
            .await
            .unwrap();

        assert_matches!(
            service.get(StrategyKind::Parse, &id, Some(&session)).await,
            Err(PipelineError::Execution(ExecutionError::MissingSessionData { key })) if key == "raw"
        );
        assert!(service.get_session(&session).await.unwrap().is_empty());
    }
}
