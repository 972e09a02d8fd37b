//! # Annotation Store
//!
//! Maps `(kind, entity_id)` buckets onto a `KvBackend`. Every
//! read-modify-write goes through a per-key async lock, so two appends racing
//! on the same bucket both land.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppError, Result};
use crate::models::{AnnotationKind, AnnotationRecord, ViewedEntity, VIEWED_PREFIX};
use crate::traits::KvBackend;

type LockMap = DashMap<String, Arc<Mutex<()>>>;

pub struct AnnotationStore {
    backend: Arc<dyn KvBackend>,
    locks: LockMap,
}

/// Holds one key's lock. The last holder to drop removes the map entry, so
/// the map only tracks keys that are in use.
struct KeyGuard<'a> {
    locks: &'a LockMap,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl AnnotationStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
        }
    }

    pub fn backend(&self) -> Arc<dyn KvBackend> {
        Arc::clone(&self.backend)
    }

    async fn lock_key(&self, key: &str) -> KeyGuard<'_> {
        let lock = self.locks.entry(key.to_string()).or_default().value().clone();
        KeyGuard {
            locks: &self.locks,
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn read_bucket(&self, key: &str) -> Result<Vec<AnnotationRecord>> {
        let value = self.backend.get(key).await.map_err(|e| {
            log::error!("failed to read {key}: {e}");
            AppError::persistence(e)
        })?;
        match value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_bucket(&self, key: &str, records: &[AnnotationRecord]) -> Result<()> {
        let value = serde_json::to_value(records)?;
        self.backend.set(key, value).await.map_err(|e| {
            log::error!("failed to write {key}: {e}");
            AppError::persistence(e)
        })
    }

    /// Appends `record` to its bucket and returns the new bucket length.
    pub async fn append(
        &self,
        kind: AnnotationKind,
        entity_id: &str,
        record: AnnotationRecord,
    ) -> Result<usize> {
        if entity_id.trim().is_empty() {
            return Err(AppError::ValidationError("entity id is empty".into()));
        }
        if record.kind != kind || record.entity_id != entity_id {
            return Err(AppError::ValidationError(format!(
                "record for {}/{} filed under {}/{}",
                record.kind, record.entity_id, kind, entity_id
            )));
        }
        match (kind, record.text.as_deref()) {
            (AnnotationKind::Reply, Some(text)) if !text.trim().is_empty() => {}
            (AnnotationKind::Reply, _) => {
                return Err(AppError::ValidationError("reply text is empty".into()))
            }
            (_, Some(_)) => {
                return Err(AppError::ValidationError(format!("{kind} carries no text")))
            }
            (_, None) => {}
        }

        let key = kind.bucket_key(entity_id);
        let _guard = self.lock_key(&key).await;
        let mut records = self.read_bucket(&key).await?;
        records.push(record);
        self.write_bucket(&key, &records).await?;
        log::debug!("appended {kind} to {entity_id} ({} total)", records.len());
        Ok(records.len())
    }

    /// Returns a copy of the bucket in insertion order; empty when absent.
    pub async fn list(&self, kind: AnnotationKind, entity_id: &str) -> Result<Vec<AnnotationRecord>> {
        self.read_bucket(&kind.bucket_key(entity_id)).await
    }

    /// Removes the record at `index` and returns it.
    pub async fn delete_at(
        &self,
        kind: AnnotationKind,
        entity_id: &str,
        index: usize,
    ) -> Result<AnnotationRecord> {
        let key = kind.bucket_key(entity_id);
        let _guard = self.lock_key(&key).await;
        let mut records = self.read_bucket(&key).await?;
        if index >= records.len() {
            return Err(AppError::IndexOutOfRange {
                index,
                len: records.len(),
            });
        }
        let removed = records.remove(index);
        self.write_bucket(&key, &records).await?;
        Ok(removed)
    }

    /// Drops every bucket of `kind`. Returns how many entity buckets were cleared.
    ///
    /// Waits for in-flight writes on those buckets, so none of them can write
    /// a bucket back after it was cleared.
    pub async fn clear_all_of_kind(&self, kind: AnnotationKind) -> Result<usize> {
        let mut keys = self
            .backend
            .keys_with_prefix(&kind.key_prefix())
            .await
            .map_err(AppError::persistence)?;
        if keys.is_empty() {
            return Ok(0);
        }
        // Single writers hold one key at a time; sorted order keeps bulk
        // holders from deadlocking each other.
        keys.sort();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.lock_key(key).await);
        }
        let removed = self.backend.remove(&keys).await.map_err(AppError::persistence)?;
        drop(guards);
        log::info!("cleared {removed} {kind} buckets");
        Ok(removed)
    }

    /// Every bucket of `kind` as `(entity_id, records)`.
    pub async fn scan_kind(&self, kind: AnnotationKind) -> Result<Vec<(String, Vec<AnnotationRecord>)>> {
        let prefix = kind.key_prefix();
        let keys = self
            .backend
            .keys_with_prefix(&prefix)
            .await
            .map_err(AppError::persistence)?;

        let mut buckets = Vec::with_capacity(keys.len());
        for key in keys {
            let records = self.read_bucket(&key).await?;
            let entity_id = key[prefix.len()..].to_string();
            buckets.push((entity_id, records));
        }
        Ok(buckets)
    }

    /// Stores the view unless the entity was already seen. Returns whether it wrote.
    pub async fn record_view_once(&self, view: &ViewedEntity) -> Result<bool> {
        let key = ViewedEntity::storage_key(&view.entity_id);
        let _guard = self.lock_key(&key).await;
        let existing = self.backend.get(&key).await.map_err(AppError::persistence)?;
        if existing.is_some() {
            return Ok(false);
        }
        self.backend
            .set(&key, serde_json::to_value(view)?)
            .await
            .map_err(AppError::persistence)?;
        Ok(true)
    }

    /// Views first seen strictly after `cutoff`.
    pub async fn viewed_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ViewedEntity>> {
        let keys = self
            .backend
            .keys_with_prefix(VIEWED_PREFIX)
            .await
            .map_err(AppError::persistence)?;

        let mut views = Vec::new();
        for key in keys {
            let Some(value) = self.backend.get(&key).await.map_err(AppError::persistence)? else {
                continue;
            };
            match serde_json::from_value::<ViewedEntity>(value) {
                Ok(view) if view.timestamp > cutoff => views.push(view),
                Ok(_) => {}
                Err(e) => log::warn!("skipping malformed view record {key}: {e}"),
            }
        }
        Ok(views)
    }
}
