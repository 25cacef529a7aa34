//! Duplicate detection and removal.
//!
//! Two records are duplicates when they collapse to the same identity key,
//! the normalized name plus the canonical region join. Removal folds every
//! duplicate into one keeper through the usual non-destructive merge before
//! deleting, so no data leaves the corpus.

use anyhow::Result;
use log::{info, warn};
use std::collections::HashMap;

use crate::corpus::CorpusOverlay;
use crate::matching::merge_records;
use crate::normalize::name::normalize_name;
use crate::normalize::region::canonical_region_join;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub normalized_name: String,
    pub region: String,
    /// Record ids in corpus order; the keeper is chosen from these.
    pub ids: Vec<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct RemoveStats {
    pub groups: usize,
    pub merged: usize,
    pub deleted: usize,
    pub errors: usize,
}

/// Groups corpus records by identity key, reporting only keys with more
/// than one record. Records with no usable name are ignored.
pub fn find_duplicate_groups(corpus: &CorpusOverlay) -> Vec<DuplicateGroup> {
    let mut by_key: HashMap<(String, String), Vec<String>> = HashMap::new();
    let mut key_order: Vec<(String, String)> = Vec::new();

    for m in corpus.iter() {
        let name = normalize_name(&m.name);
        if name.is_empty() {
            continue;
        }
        let key = (name, canonical_region_join(&m.pref));
        match by_key.get_mut(&key) {
            Some(ids) => ids.push(m.id.clone()),
            None => {
                key_order.push(key.clone());
                by_key.insert(key, vec![m.id.clone()]);
            }
        }
    }

    key_order
        .into_iter()
        .filter_map(|key| {
            let ids = by_key.remove(&key)?;
            (ids.len() > 1).then(|| DuplicateGroup {
                normalized_name: key.0,
                region: key.1,
                ids,
            })
        })
        .collect()
}

/// Collapses each duplicate group onto one keeper. A record already sitting
/// at its derived stable id wins; otherwise the first record in corpus
/// order does.
pub async fn remove_duplicates(store: &impl RecordStore, write: bool) -> Result<RemoveStats> {
    let mut corpus = CorpusOverlay::load(store).await?;
    let groups = find_duplicate_groups(&corpus);
    info!(
        "🔍 {} duplicate groups in {} records ({})",
        groups.len(),
        corpus.len(),
        if write { "write" } else { "dry-run" }
    );

    let mut stats = RemoveStats {
        groups: groups.len(),
        ..Default::default()
    };
    for group in &groups {
        if let Err(e) = collapse_group(store, &mut corpus, group, write, &mut stats).await {
            warn!(
                "⚠️ Failed to collapse duplicates of {}: {:#}",
                group.normalized_name, e
            );
            stats.errors += 1;
        }
    }
    info!(
        "✅ Duplicate removal: {} groups, {} merged, {} deleted",
        stats.groups, stats.merged, stats.deleted
    );
    Ok(stats)
}

async fn collapse_group(
    store: &impl RecordStore,
    corpus: &mut CorpusOverlay,
    group: &DuplicateGroup,
    write: bool,
    stats: &mut RemoveStats,
) -> Result<()> {
    let keeper_id = group
        .ids
        .iter()
        .find(|id| corpus.get(id).map(|m| m.has_stable_id()).unwrap_or(false))
        .unwrap_or(&group.ids[0])
        .clone();

    for id in &group.ids {
        if *id == keeper_id {
            continue;
        }
        let Some(dupe) = corpus.get(id).cloned() else {
            continue;
        };
        if let Some(keeper) = corpus.get(&keeper_id) {
            let plan = merge_records(keeper, &dupe);
            if !plan.is_noop() {
                if write {
                    store.upsert_merge(&keeper_id, &plan.patch).await?;
                }
                corpus.apply_patch(&keeper_id, &plan.patch)?;
                stats.merged += 1;
            }
        }
        if write {
            store.delete(id).await?;
        }
        corpus.remove(id);
        stats.deleted += 1;
    }
    Ok(())
}
