//! Session merge rules
//!
//! Plain merge replaces top-level keys (no deep merge). The list variant
//! appends each registration as one nested element once the key exists,
//! keeping track of which call contributed which ids.

use crate::session::errors::SessionError;
use crate::session::types::Delta;
use serde_json::{Map, Value};

/// Apply `delta` to `session`: every key of the delta overwrites the session value
pub fn merge_delta(session: &mut Map<String, Value>, delta: &Delta) {
    for (key, value) in delta.iter() {
        session.insert(key.clone(), value.clone());
    }
}

/// Accumulate `items` under `list_key`
///
/// * key absent: the key is set to `items` itself (flat list);
/// * key holds a list: `items` is pushed as a single nested element.
///
/// So `["r1"]` followed by `["r2"]` yields `["r1", ["r2"]]`.
pub fn merge_list_item(
    session: &mut Map<String, Value>,
    list_key: &str,
    items: Vec<Value>,
) -> Result<(), SessionError> {
    match session.get_mut(list_key) {
        Some(Value::Array(existing)) => {
            existing.push(Value::Array(items));
            Ok(())
        }
        Some(_) => Err(SessionError::NotAList {
            key: list_key.to_string(),
        }),
        None => {
            session.insert(list_key.to_string(), Value::Array(items));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_delta_is_identity() {
        let mut session = map(json!({"a": 1, "nested": {"x": [1, 2]}}));
        let before = session.clone();
        merge_delta(&mut session, &Delta::new());
        assert_eq!(session, before);
    }

    #[test]
    fn last_writer_wins_per_key() {
        let mut session = Map::new();
        merge_delta(&mut session, &Delta::new().with("a", 1));
        merge_delta(&mut session, &Delta::new().with("a", 2));
        assert_eq!(session.get("a"), Some(&json!(2)));
    }

    #[test]
    fn nested_values_are_replaced_not_merged() {
        let mut session = map(json!({"meta": {"x": 1, "y": 2}}));
        merge_delta(&mut session, &Delta::new().with("meta", json!({"z": 3})));
        assert_eq!(session.get("meta"), Some(&json!({"z": 3})));
    }

    #[test]
    fn list_merge_initializes_flat_then_nests() {
        let mut session = Map::new();

        merge_list_item(&mut session, "resource_info", vec![json!("r1")]).unwrap();
        assert_eq!(session.get("resource_info"), Some(&json!(["r1"])));

        merge_list_item(&mut session, "resource_info", vec![json!("r2")]).unwrap();
        assert_eq!(session.get("resource_info"), Some(&json!(["r1", ["r2"]])));

        merge_list_item(&mut session, "resource_info", vec![json!("r3"), json!("r4")]).unwrap();
        assert_eq!(
            session.get("resource_info"),
            Some(&json!(["r1", ["r2"], ["r3", "r4"]]))
        );
    }

    #[test]
    fn list_merge_with_empty_items() {
        let mut session = Map::new();
        merge_list_item(&mut session, "filter_info", Vec::new()).unwrap();
        assert_eq!(session.get("filter_info"), Some(&json!([])));

        merge_list_item(&mut session, "filter_info", Vec::new()).unwrap();
        assert_eq!(session.get("filter_info"), Some(&json!([[]])));
    }

    #[test]
    fn list_merge_rejects_scalar_key() {
        let mut session = map(json!({"resource_info": "r1"}));
        assert_matches!(
            merge_list_item(&mut session, "resource_info", vec![json!("r2")]),
            Err(SessionError::NotAList { key }) if key == "resource_info"
        );
        assert_eq!(session.get("resource_info"), Some(&json!("r1")));
    }
}
