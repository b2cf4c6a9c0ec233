//! Session lifecycle over a key/value store
//!
//! Updates are read-modify-write. With `serialize_updates` enabled, updates
//! to the same session through one manager are applied one at a time;
//! otherwise two concurrent updates may lose one delta.

use crate::config::runtime::SessionPreferences;
use crate::config::constants::SESSION_KEY_PREFIX;
use crate::logging::codes;
use crate::session::errors::SessionError;
use crate::session::merge::{merge_delta, merge_list_item};
use crate::session::store::KeyValueStore;
use crate::session::types::{Delta, Session, SessionId};
use crate::{log_debug, log_success, log_warning};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    locks: Option<DashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, preferences: &SessionPreferences) -> Self {
        Self {
            store,
            locks: preferences.serialize_updates.then(DashMap::new),
        }
    }

    /// Manager without per-session serialization
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, locks: None }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn serializes_updates(&self) -> bool {
        self.locks.is_some()
    }

    /// Persist a new session holding `initial`
    pub async fn create_session(&self, initial: Map<String, Value>) -> Result<SessionId, SessionError> {
        let id = SessionId::generate();
        self.write(&id, &initial).await?;

        log_success!(codes::success::SESSION_CREATED, "Session created",
            "session_id" => id,
            "keys" => initial.len()
        );
        Ok(id)
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.read(id).await.map(Session::from_map)
    }

    /// Merge `delta` into the stored session (top-level keys replaced)
    pub async fn update_session(&self, id: &SessionId, delta: &Delta) -> Result<Session, SessionError> {
        let _guard = self.guard(id).await;

        let mut values = self.read_locked(id).await?;
        merge_delta(&mut values, delta);
        self.write(id, &values).await?;

        log_success!(codes::success::SESSION_UPDATED, "Session updated",
            "session_id" => id,
            "delta_keys" => delta.len()
        );
        Ok(Session::from_map(values))
    }

    /// Accumulate `items` under `key` (see [`merge_list_item`])
    pub async fn update_session_list_item(
        &self,
        id: &SessionId,
        key: &str,
        items: Vec<Value>,
    ) -> Result<Session, SessionError> {
        let _guard = self.guard(id).await;

        let mut values = self.read_locked(id).await?;
        merge_list_item(&mut values, key, items)?;
        self.write(id, &values).await?;

        log_success!(codes::success::SESSION_UPDATED, "Session list updated",
            "session_id" => id,
            "key" => key
        );
        Ok(Session::from_map(values))
    }

    pub async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let existed = {
            let _guard = self.guard(id).await;
            self.store.delete(id.as_str()).await?
        };
        if let Some(locks) = &self.locks {
            locks.remove(id);
        }

        if !existed {
            return Err(SessionError::NotFound {
                session_id: id.to_string(),
            });
        }
        log_success!(codes::success::SESSION_DELETED, "Session deleted", "session_id" => id);
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionId>, SessionError> {
        let prefix = format!("{}-", SESSION_KEY_PREFIX);
        let keys = self.store.keys(&prefix).await?;
        Ok(keys
            .iter()
            .filter_map(|key| match SessionId::parse(key) {
                Ok(id) => Some(id),
                Err(err) => {
                    log_warning!("Skipping invalid session key", "key" => key, "error" => err);
                    None
                }
            })
            .collect())
    }

    async fn guard(&self, id: &SessionId) -> Option<OwnedMutexGuard<()>> {
        let locks = self.locks.as_ref()?;
        // Clone the Arc so no dashmap shard stays locked across the await
        let lock = Arc::clone(locks.entry(id.clone()).or_default().value());
        log_debug!("Waiting for session lock", "session_id" => id);
        Some(lock.lock_owned().await)
    }

    /// `read` under a session lock; an absent session gives its lock entry back
    async fn read_locked(&self, id: &SessionId) -> Result<Map<String, Value>, SessionError> {
        let result = self.read(id).await;
        if let (Err(SessionError::NotFound { .. }), Some(locks)) = (&result, &self.locks) {
            locks.remove(id);
        }
        result
    }

    async fn read(&self, id: &SessionId) -> Result<Map<String, Value>, SessionError> {
        let raw = self
            .store
            .get(id.as_str())
            .await?
            .ok_or_else(|| SessionError::NotFound {
                session_id: id.to_string(),
            })?;

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(values) => Ok(values),
            other => Err(SessionError::InvalidRecord {
                key: id.to_string(),
                reason: format!("expected a JSON object, found {}", json_type(&other)),
            }),
        }
    }

    async fn write(&self, id: &SessionId, values: &Map<String, Value>) -> Result<(), SessionError> {
        let raw = serde_json::to_string(values)?;
        self.store.set(id.as_str(), raw).await?;
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::InMemoryStore;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn manager(serialize_updates: bool) -> SessionManager {
        SessionManager::new(
            Arc::new(InMemoryStore::new()),
            &SessionPreferences { serialize_updates },
        )
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let manager = manager(false);
        let id = manager.create_session(object(json!({"a": 1}))).await.unwrap();
        assert!(id.as_str().starts_with("session-"));

        let updated = manager
            .update_session(&id, &Delta::new().with("a", 2).with("b", "x"))
            .await
            .unwrap();
        assert_eq!(updated.as_map(), &object(json!({"a": 2, "b": "x"})));
        assert_eq!(manager.get_session(&id).await.unwrap(), updated);

        assert_eq!(manager.list_sessions().await.unwrap(), vec![id.clone()]);

        manager.delete_session(&id).await.unwrap();
        assert_matches!(
            manager.get_session(&id).await,
            Err(SessionError::NotFound { .. })
        );
        assert_matches!(
            manager.delete_session(&id).await,
            Err(SessionError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn updating_absent_session_fails() {
        let manager = manager(false);
        let id = SessionId::generate();
        assert_matches!(
            manager.update_session(&id, &Delta::new().with("a", 1)).await,
            Err(SessionError::NotFound { session_id }) if session_id == id.as_str()
        );
        assert!(manager.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_item_accumulates_with_nesting() {
        let manager = manager(false);
        let id = manager.create_session(Map::new()).await.unwrap();

        manager
            .update_session_list_item(&id, "resource_info", vec![json!("r1")])
            .await
            .unwrap();
        let session = manager
            .update_session_list_item(&id, "resource_info", vec![json!("r2")])
            .await
            .unwrap();

        assert_eq!(session.get("resource_info"), Some(&json!(["r1", ["r2"]])));
    }

    #[tokio::test]
    async fn non_object_record_is_invalid() {
        let store = Arc::new(InMemoryStore::new());
        let manager = SessionManager::with_store(store.clone());
        let id = SessionId::generate();
        store.set(id.as_str(), "[1, 2]".to_string()).await.unwrap();

        assert_matches!(
            manager.get_session(&id).await,
            Err(SessionError::InvalidRecord { reason, .. }) if reason.contains("an array")
        );
    }

    #[tokio::test]
    async fn listing_skips_invalid_session_keys() {
        let store = Arc::new(InMemoryStore::new());
        store.set("session-", "{}".to_string()).await.unwrap();
        let manager = SessionManager::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            &SessionPreferences::default(),
        );
        let id = manager.create_session(Map::new()).await.unwrap();

        assert_eq!(manager.list_sessions().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn failed_updates_leave_no_lock_entries() {
        let manager = manager(true);
        for _ in 0..100 {
            let id = SessionId::generate();
            assert_matches!(
                manager.update_session(&id, &Delta::new()).await,
                Err(SessionError::NotFound { .. })
            );
            assert_matches!(
                manager.update_session_list_item(&id, "filter_info", vec![json!("f")]).await,
                Err(SessionError::NotFound { .. })
            );
        }
        let locks = manager.locks.as_ref().unwrap();
        assert_eq!(locks.len(), 0);

        let id = manager.create_session(Map::new()).await.unwrap();
        manager.update_session(&id, &Delta::new().with("a", 1)).await.unwrap();
        assert_eq!(manager.locks.as_ref().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serialized_updates_keep_every_delta() {
        let manager = Arc::new(manager(true));
        assert!(manager.serializes_updates());
        let id = manager.create_session(Map::new()).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let id = id.clone();
                tokio::spawn(async move {
                    manager
                        .update_session(&id, &Delta::new().with(format!("k{}", i), i))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let session = manager.get_session(&id).await.unwrap();
        assert_eq!(session.len(), 16);
    }
}
