//! In-memory corpus overlay for one reconciliation pass.
//!
//! The matcher never queries the backing store directly: a pass loads one
//! snapshot up front and every applied action — including in dry-run mode —
//! is reflected here, so a row later in the batch can match an entity
//! created or patched by an earlier row. Rows are processed strictly in
//! input order and the overlay is owned by the single pass, so there is no
//! concurrent writer to guard against.

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::models::core::Mountain;
use crate::models::matching::Patch;
use crate::store::{apply_patch, RecordStore};

pub struct CorpusOverlay {
    order: Vec<String>,
    records: HashMap<String, Mountain>,
}

impl CorpusOverlay {
    pub async fn load(store: &impl RecordStore) -> Result<Self> {
        let snapshot = store
            .fetch_all()
            .await
            .context("Failed to load corpus snapshot")?;
        Ok(Self::from_records(snapshot))
    }

    pub fn from_records(snapshot: Vec<Mountain>) -> Self {
        let mut order = Vec::with_capacity(snapshot.len());
        let mut records = HashMap::with_capacity(snapshot.len());
        for record in snapshot {
            if !records.contains_key(&record.id) {
                order.push(record.id.clone());
            }
            records.insert(record.id.clone(), record);
        }
        Self { order, records }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Mountain> {
        self.records.get(id)
    }

    /// Stable-order iteration; scan-based match stages depend on this for
    /// deterministic classification.
    pub fn iter(&self) -> impl Iterator<Item = &Mountain> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Exact-name membership query against a bounded variant set.
    pub fn find_by_names<'a>(&'a self, names: &[String]) -> Vec<&'a Mountain> {
        self.iter()
            .filter(|m| names.iter().any(|n| n == &m.name))
            .collect()
    }

    pub fn insert(&mut self, record: Mountain) {
        if !self.records.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }
        self.records.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<Mountain> {
        self.order.retain(|existing| existing != id);
        self.records.remove(id)
    }

    pub fn apply_patch(&mut self, id: &str, patch: &Patch) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .with_context(|| format!("Overlay has no record {}", id))?;
        apply_patch(record, patch)
    }
}
