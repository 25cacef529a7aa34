//! Batch import: classify every incoming row against the corpus and apply
//! (or stage, in dry-run) the resulting creates and patches.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use crate::corpus::CorpusOverlay;
use crate::ingest::ParsedRow;
use crate::matching::{find_candidates, resolve, MatcherOptions, ResolveOptions};
use crate::models::matching::{Action, MergePlan};
use crate::report::{ReconciliationReport, DEFAULT_SAMPLE_CAP};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Apply writes to the store. Off by default; a dry run still walks the
    /// full batch and produces the complete report.
    pub write: bool,
    /// Stamp new records with their derived stable id instead of an opaque
    /// generated one.
    pub durable_ids: bool,
    /// Create records for rows nothing matched. Turned off for tag-only
    /// enrichment batches, where an unmatched row means a naming problem.
    pub create_missing: bool,
    pub matcher: MatcherOptions,
    pub sample_cap: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            write: false,
            durable_ids: false,
            create_missing: true,
            matcher: MatcherOptions::default(),
            sample_cap: DEFAULT_SAMPLE_CAP,
        }
    }
}

pub async fn run_import(
    store: &impl RecordStore,
    rows: &[ParsedRow],
    opts: &ImportOptions,
) -> Result<ReconciliationReport> {
    let mut corpus = CorpusOverlay::load(store).await?;
    info!(
        "🔍 Importing {} rows against {} corpus records ({})",
        rows.len(),
        corpus.len(),
        if opts.write { "write" } else { "dry-run" }
    );

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .context("Failed to set progress bar style")?
            .progress_chars("#>-"),
    );
    pb.set_message("Reconciling rows...");

    let resolve_opts = ResolveOptions {
        create_missing: opts.create_missing,
        durable_ids: opts.durable_ids,
    };

    let mut report = ReconciliationReport::new(opts.sample_cap);
    for row in rows {
        apply_row(store, &mut corpus, row, opts, &resolve_opts, &mut report).await;
        pb.inc(1);
    }
    pb.finish_with_message("Batch reconciled");

    Ok(report)
}

/// Classifies and applies one row. Store failures are counted, never
/// propagated; a bad row must not abort the batch.
async fn apply_row(
    store: &impl RecordStore,
    corpus: &mut CorpusOverlay,
    row: &ParsedRow,
    opts: &ImportOptions,
    resolve_opts: &ResolveOptions,
    report: &mut ReconciliationReport,
) {
    let incoming = &row.record;
    if incoming.is_malformed() {
        report.record_malformed(row.row_number);
        return;
    }

    let outcome = find_candidates(incoming, corpus, &opts.matcher);
    let action = resolve(incoming, &outcome, corpus, resolve_opts);

    match action {
        Action::Create { record } => {
            if opts.write {
                if let Err(e) = store.insert(record.clone()).await {
                    report.record_store_error(&incoming.name, &e);
                    return;
                }
            }
            report.record_created(&record.name, &record.id);
            // The overlay sees the new record either way, so a duplicate
            // row later in the same batch matches instead of re-creating.
            corpus.insert(record);
        }
        Action::Update { target, plan } => {
            let patched =
                apply_plan(store, corpus, &incoming.name, &target, &plan, opts, report).await;
            match patched {
                Some(true) => report.record_updated(&incoming.name, &[target]),
                Some(false) => report.record_skipped_duplicate(),
                None => {}
            }
        }
        Action::UpdateMultiple { updates } => {
            let mut patched_targets = Vec::new();
            let mut errored = false;
            for (target, plan) in &updates {
                match apply_plan(store, corpus, &incoming.name, target, plan, opts, report).await {
                    Some(true) => patched_targets.push(target.clone()),
                    Some(false) => {}
                    None => errored = true,
                }
            }
            if !patched_targets.is_empty() {
                report.record_updated(&incoming.name, &patched_targets);
            } else if !errored {
                report.record_skipped_duplicate();
            }
        }
        Action::FlagAmbiguous { candidates } => {
            let labels: Vec<String> = candidates
                .iter()
                .map(|id| match corpus.get(id) {
                    Some(m) => format!("{}（{}） [{}]", m.name, m.pref, id),
                    None => id.clone(),
                })
                .collect();
            report.record_ambiguous(&incoming.name, &labels);
        }
        Action::FlagUnresolved => {
            debug!("No corpus match for {}", incoming.name);
            report.record_not_found(&incoming.name, corpus);
        }
    }
}

/// Applies one merge plan to one target. Returns Some(true) when the target
/// was patched, Some(false) on a no-op, None on a store error.
async fn apply_plan(
    store: &impl RecordStore,
    corpus: &mut CorpusOverlay,
    name: &str,
    target: &str,
    plan: &MergePlan,
    opts: &ImportOptions,
    report: &mut ReconciliationReport,
) -> Option<bool> {
    report.record_defects(name, &plan.defects);
    report.record_conflicts(name, &plan.conflicts);

    if plan.is_noop() {
        return Some(false);
    }
    if opts.write {
        if let Err(e) = store.upsert_merge(target, &plan.patch).await {
            report.record_store_error(name, &e);
            return None;
        }
    }
    if let Err(e) = corpus.apply_patch(target, &plan.patch) {
        report.record_store_error(name, &e);
        return None;
    }
    Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{IncomingRecord, Mountain};
    use crate::store::MemoryStore;

    fn parsed(n: usize, record: IncomingRecord) -> ParsedRow {
        ParsedRow {
            row_number: n,
            record,
        }
    }

    fn row(name: &str, pref: &str) -> IncomingRecord {
        IncomingRecord {
            name: name.to_string(),
            pref: Some(pref.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_match_within_one_batch() {
        let store = MemoryStore::new();
        let rows = vec![
            parsed(1, row("高尾山", "東京都")),
            parsed(2, {
                let mut r = row("高尾山", "東京都");
                r.tags = vec!["多摩百山".to_string()];
                r
            }),
        ];
        let opts = ImportOptions {
            write: true,
            durable_ids: true,
            ..Default::default()
        };
        let report = run_import(&store, &rows, &opts).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tags, vec!["多摩百山"]);
    }

    #[tokio::test]
    async fn test_second_run_is_all_noops() {
        let store = MemoryStore::new();
        let rows = vec![parsed(1, {
            let mut r = row("谷川岳", "群馬県・新潟県");
            r.elevation = Some(1977);
            r
        })];
        let opts = ImportOptions {
            write: true,
            ..Default::default()
        };
        let first = run_import(&store, &rows, &opts).await.unwrap();
        assert_eq!(first.created, 1);

        let second = run_import(&store, &rows, &opts).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let store = MemoryStore::new();
        let rows = vec![parsed(1, row("富士山", "静岡県・山梨県"))];
        let report = run_import(&store, &rows, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_still_deduplicates_within_batch() {
        let store = MemoryStore::new();
        let rows = vec![
            parsed(1, row("富士山", "静岡県・山梨県")),
            parsed(2, row("富士山", "静岡県・山梨県")),
        ];
        let report = run_import(&store, &rows, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn test_malformed_and_unresolved_rows_counted() {
        let store = MemoryStore::from_records(vec![Mountain {
            id: "a".to_string(),
            name: "高尾山".to_string(),
            pref: "東京都".to_string(),
            ..Default::default()
        }]);
        let rows = vec![
            parsed(1, IncomingRecord::default()),
            parsed(2, row("謎の峰", "Nowhere")),
        ];
        let opts = ImportOptions {
            create_missing: false,
            ..Default::default()
        };
        let report = run_import(&store, &rows, &opts).await.unwrap();
        assert_eq!(report.malformed, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.created, 0);
    }

    #[tokio::test]
    async fn test_legacy_and_stable_pair_both_patched() {
        let stable_row = row("高尾山", "東京都");
        let stable_id = stable_row.stable_id();
        let store = MemoryStore::from_records(vec![
            Mountain {
                id: "legacy1".to_string(),
                name: "高尾山".to_string(),
                pref: "東京都".to_string(),
                ..Default::default()
            },
            Mountain {
                id: stable_id.clone(),
                name: "高尾山".to_string(),
                pref: "東京都".to_string(),
                ..Default::default()
            },
        ]);
        // A coarser region keeps the derived stable id from pointing at
        // either record, so the exact-name stage sees both.
        let mut r = row("高尾山", "東京都・神奈川県");
        r.name_kana = Some("たかおさん".to_string());

        let opts = ImportOptions {
            write: true,
            ..Default::default()
        };
        let report = run_import(&store, &[parsed(1, r)], &opts).await.unwrap();
        assert_eq!(report.updated, 1);

        for m in store.fetch_all().await.unwrap() {
            assert_eq!(m.name_kana.as_deref(), Some("たかおさん"));
        }
    }
}
