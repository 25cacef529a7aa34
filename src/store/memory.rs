//! In-memory record store, insertion-ordered for deterministic scans.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{apply_patch, RecordStore};
use crate::models::core::{dedup_preserve, Mountain};
use crate::models::matching::Patch;

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    records: HashMap<String, Mountain>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Mountain>) -> Self {
        let mut inner = Inner::default();
        for mut record in records {
            record.tags = dedup_preserve(&record.tags);
            if !inner.records.contains_key(&record.id) {
                inner.order.push(record.id.clone());
            }
            inner.records.insert(record.id.clone(), record);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Mountain>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Mountain>> {
        Ok(self.inner.read().await.records.get(id).cloned())
    }

    async fn fetch_by_tag(&self, tag: &str) -> Result<Vec<Mountain>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .filter(|m| m.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn insert(&self, mut record: Mountain) -> Result<String> {
        if record.id.is_empty() {
            return Err(anyhow!("Cannot insert a record without an id"));
        }
        record.tags = dedup_preserve(&record.tags);
        let mut inner = self.inner.write().await;
        let id = record.id.clone();
        if !inner.records.contains_key(&id) {
            inner.order.push(id.clone());
        }
        inner.records.insert(id.clone(), record);
        Ok(id)
    }

    async fn upsert_merge(&self, id: &str, patch: &Patch) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.records.get_mut(id) {
            return apply_patch(record, patch);
        }
        let mut record = Mountain {
            id: id.to_string(),
            ..Default::default()
        };
        apply_patch(&mut record, patch)?;
        record.id = id.to_string();
        inner.order.push(id.to_string());
        inner.records.insert(id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.records.remove(id).is_none() {
            return Err(anyhow!("No record with id {}", id));
        }
        inner.order.retain(|existing| existing != id);
        Ok(())
    }
}
