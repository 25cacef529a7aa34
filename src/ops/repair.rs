//! Coordinate repair: casts text-typed lat/lng values back to numbers.
//!
//! Early imports wrote coordinates as strings; those records silently fall
//! out of any numeric query. A value that does not parse is left alone and
//! counted for manual review.

use anyhow::Result;
use log::{info, warn};
use serde_json::json;

use crate::corpus::CorpusOverlay;
use crate::models::core::Coordinate;
use crate::models::matching::Patch;
use crate::store::RecordStore;

#[derive(Debug, Default, PartialEq)]
pub struct RepairStats {
    pub scanned: usize,
    pub records_repaired: usize,
    pub values_repaired: usize,
    pub unparseable: usize,
    pub errors: usize,
}

pub async fn repair_coordinates(store: &impl RecordStore, write: bool) -> Result<RepairStats> {
    let corpus = CorpusOverlay::load(store).await?;
    info!(
        "🔍 Coordinate repair over {} records ({})",
        corpus.len(),
        if write { "write" } else { "dry-run" }
    );

    let mut stats = RepairStats::default();
    let mut staged: Vec<(String, Patch)> = Vec::new();
    for m in corpus.iter() {
        stats.scanned += 1;
        let mut patch = Patch::new();
        for (field, value) in [("lat", m.lat.as_ref()), ("lng", m.lng.as_ref())] {
            let Some(coord) = value.filter(|c| c.is_text()) else {
                continue;
            };
            match coord.repairable() {
                Some(parsed) => {
                    patch.insert(field.to_string(), json!(parsed));
                    stats.values_repaired += 1;
                }
                None => {
                    warn!("⚠️ Unparseable {} on {} ({:?})", field, m.name, coord);
                    stats.unparseable += 1;
                }
            }
        }
        if !patch.is_empty() {
            patch.insert("updated_at".to_string(), json!(chrono::Utc::now()));
            staged.push((m.id.clone(), patch));
        }
    }

    for (id, patch) in staged {
        if write {
            if let Err(e) = store.upsert_merge(&id, &patch).await {
                warn!("⚠️ Repair write failed for {}: {:#}", id, e);
                stats.errors += 1;
                continue;
            }
        }
        stats.records_repaired += 1;
    }

    info!(
        "✅ Coordinate repair: {} records repaired, {} values cast, {} unparseable",
        stats.records_repaired, stats.values_repaired, stats.unparseable
    );
    Ok(stats)
}
