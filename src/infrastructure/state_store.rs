use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

/// Per-object presence state announced to the server on each subscribe.
///
/// Entries are keyed by channel or channel-group name. The store is rebuilt
/// on every request build by merging caller-supplied state over the current
/// contents, restricted to the names still subscribed, so state follows the
/// membership without explicit bookkeeping.
#[derive(Debug, Default)]
pub struct ClientStateStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl ClientStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `caller` state over the stored map for the given `objects`,
    /// writes the result back and returns it.
    ///
    /// Entries for names outside `objects` are dropped by the rebuild.
    pub async fn merged_state(
        &self,
        caller: Option<&HashMap<String, Value>>,
        objects: &[String],
    ) -> HashMap<String, Value> {
        let mut entries = self.entries.write().await;

        let merged: HashMap<String, Value> = objects
            .iter()
            .filter_map(|name| {
                caller
                    .and_then(|state| state.get(name))
                    .or_else(|| entries.get(name))
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();

        *entries = merged.clone();
        merged
    }

    /// Records `state` for a single object, overwriting any previous value.
    pub async fn set(&self, object: &str, state: Value) {
        self.entries.write().await.insert(object.to_string(), state);
    }

    /// Drops the entries for the given objects.
    pub async fn remove(&self, objects: &[String]) {
        let mut entries = self.entries.write().await;
        for name in objects {
            entries.remove(name);
        }
    }

    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.read().await.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_merge_prefers_caller_state() {
        let store = ClientStateStore::new();
        store.set("a", json!({"mood": "old"})).await;

        let caller = HashMap::from([("a".to_string(), json!({"mood": "new"}))]);
        let merged = store.merged_state(Some(&caller), &names(&["a"])).await;

        assert_eq!(merged["a"], json!({"mood": "new"}));
        assert_eq!(store.snapshot().await["a"], json!({"mood": "new"}));
    }

    #[tokio::test]
    async fn test_merge_keeps_stored_state_for_unlisted_caller_entries() {
        let store = ClientStateStore::new();
        store.set("a", json!({"mood": "ok"})).await;

        let merged = store.merged_state(None, &names(&["a", "b"])).await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged["a"], json!({"mood": "ok"}));
    }

    #[tokio::test]
    async fn test_merge_drops_state_for_unsubscribed_objects() {
        let store = ClientStateStore::new();
        store.set("a", json!(1)).await;
        store.set("b", json!(2)).await;

        let merged = store.merged_state(None, &names(&["b"])).await;

        assert_eq!(merged.len(), 1);
        assert!(store.snapshot().await.get("a").is_none());
    }

    #[tokio::test]
    async fn test_remove_then_merge_round_trip() {
        let store = ClientStateStore::new();
        let before = store.snapshot().await;

        store.set("a", json!({"k": 1})).await;
        store.remove(&names(&["a"])).await;

        assert_eq!(store.snapshot().await, before);
        assert!(store.is_empty().await);
    }
}
