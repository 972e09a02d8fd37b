//! In-process `KvBackend`, used when no database plugin is compiled in and by tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::traits::KvBackend;

#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("memory backend lock poisoned")
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> anyhow::Result<usize> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(keys.iter().filter(|k| entries.remove(k.as_str()).is_some()).count())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_prefix_scan_is_ordered_and_bounded() {
        let backend = MemoryBackend::new();
        backend.set("ghost-like-2", json!([])).await.unwrap();
        backend.set("ghost-like-1", json!([])).await.unwrap();
        backend.set("ghost-reply-1", json!([])).await.unwrap();
        backend.set("ghost-likes", json!(true)).await.unwrap();

        let keys = backend.keys_with_prefix("ghost-like-").await.unwrap();
        assert_eq!(keys, vec!["ghost-like-1", "ghost-like-2"]);
    }

    #[tokio::test]
    async fn test_remove_counts_existing_keys_only() {
        let backend = MemoryBackend::new();
        backend.set("a", json!(1)).await.unwrap();
        let removed = backend
            .remove(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(backend.get("a").await.unwrap().is_none());
    }
}
