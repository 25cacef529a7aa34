//! Stable-id migration: moves records sitting at opaque generated ids onto
//! their derived content-hash ids, merging where the target already exists.
//!
//! The legacy record is kept unless deletion is requested, so readers
//! holding old ids keep working during the migration window; the old id is
//! always absorbed into `legacy_ids` on the stable record.

use anyhow::Result;
use log::{info, warn};

use crate::corpus::CorpusOverlay;
use crate::matching::merge_records;
use crate::models::core::Mountain;
use crate::store::RecordStore;

#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub write: bool,
    /// Delete the legacy document after its stable counterpart is in place.
    pub delete_legacy: bool,
    /// Restrict the pass to records carrying this tag.
    pub tag: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct MigrateStats {
    pub scanned: usize,
    pub already_stable: usize,
    pub relocated: usize,
    pub merged_into_existing: usize,
    pub legacy_deleted: usize,
    pub skipped_nameless: usize,
    pub errors: usize,
    /// Post-pass verification: cohort size and how many of those records
    /// sit at their derived stable id once the pass is done.
    pub verified_total: usize,
    pub verified_stable: usize,
}

pub async fn migrate_to_stable_ids(
    store: &impl RecordStore,
    opts: &MigrateOptions,
) -> Result<MigrateStats> {
    // Always overlay the whole corpus; a tag-scoped pass still needs to see
    // stable targets that live outside the tag.
    let mut corpus = CorpusOverlay::load(store).await?;
    let scoped: Vec<Mountain> = match opts.tag.as_deref() {
        Some(tag) => store.fetch_by_tag(tag).await?,
        None => corpus.iter().cloned().collect(),
    };
    info!(
        "🔍 Stable-id migration over {} records ({})",
        scoped.len(),
        if opts.write { "write" } else { "dry-run" }
    );

    let mut stats = MigrateStats::default();
    for record in scoped {
        stats.scanned += 1;
        if let Err(e) = migrate_one(store, &mut corpus, &record, opts, &mut stats).await {
            warn!("⚠️ Migration failed for {} ({}): {:#}", record.name, record.id, e);
            stats.errors += 1;
        }
    }

    info!(
        "✅ Migration pass: {} scanned, {} already stable, {} relocated, {} merged, {} legacy deleted",
        stats.scanned, stats.already_stable, stats.relocated, stats.merged_into_existing, stats.legacy_deleted
    );

    // Re-check the cohort against its end state. The overlay reflects
    // staged writes, so the verification is meaningful in dry-run too.
    let (total, stable) = verify_cohort(&corpus, opts.tag.as_deref());
    stats.verified_total = total;
    stats.verified_stable = stable;
    if stable < total {
        warn!(
            "⚠️ Verification: {}/{} cohort records sit at stable ids ({} still on opaque ids)",
            stable,
            total,
            total - stable
        );
    } else {
        info!("✅ Verification: {}/{} cohort records at stable ids", stable, total);
    }
    Ok(stats)
}

/// Counts the cohort and its stable-id members after the pass. Records
/// left on opaque ids are expected while legacy documents are retained.
fn verify_cohort(corpus: &CorpusOverlay, tag: Option<&str>) -> (usize, usize) {
    let mut total = 0;
    let mut stable = 0;
    for m in corpus.iter() {
        if let Some(tag) = tag {
            if !m.tags.iter().any(|t| t == tag) {
                continue;
            }
        }
        total += 1;
        if m.has_stable_id() {
            stable += 1;
        }
    }
    (total, stable)
}

async fn migrate_one(
    store: &impl RecordStore,
    corpus: &mut CorpusOverlay,
    record: &Mountain,
    opts: &MigrateOptions,
    stats: &mut MigrateStats,
) -> Result<()> {
    if record.name.trim().is_empty() {
        stats.skipped_nameless += 1;
        return Ok(());
    }
    if record.has_stable_id() {
        stats.already_stable += 1;
        return Ok(());
    }

    let sid = record.derived_stable_id();
    if let Some(stable) = corpus.get(&sid) {
        // Target already migrated (or created stable-first): fold the
        // legacy record into it.
        let plan = merge_records(stable, record);
        if !plan.is_noop() {
            if opts.write {
                store.upsert_merge(&sid, &plan.patch).await?;
            }
            corpus.apply_patch(&sid, &plan.patch)?;
        }
        stats.merged_into_existing += 1;
    } else {
        let mut relocated = record.clone();
        relocated.id = sid.clone();
        if !relocated.legacy_ids.contains(&record.id) {
            relocated.legacy_ids.push(record.id.clone());
        }
        if opts.write {
            store.insert(relocated.clone()).await?;
        }
        corpus.insert(relocated);
        stats.relocated += 1;
    }

    if opts.delete_legacy {
        if opts.write {
            store.delete(&record.id).await?;
        }
        corpus.remove(&record.id);
        stats.legacy_deleted += 1;
    }
    Ok(())
}
