//! Batch outcome accumulator.
//!
//! The report is the only user-visible result of a pass: aggregate counts
//! plus a bounded list of detail samples per category for operator review.
//! It never mutates records.

use log::info;
use std::fmt::Write as _;
use strsim::jaro_winkler;

use crate::corpus::CorpusOverlay;
use crate::normalize::name::normalize_name;

pub const DEFAULT_SAMPLE_CAP: usize = 20;

/// How close a corpus name must be to appear as a not-found suggestion.
const SUGGESTION_MIN_SIMILARITY: f64 = 0.7;
const SUGGESTION_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSample {
    pub name: String,
    pub detail: String,
}

#[derive(Debug)]
pub struct ReconciliationReport {
    sample_cap: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped_duplicate: usize,
    pub ambiguous: usize,
    pub not_found: usize,
    pub malformed: usize,
    pub store_errors: usize,
    pub coordinate_defects: usize,
    pub conflicts: usize,
    created_samples: Vec<ReportSample>,
    updated_samples: Vec<ReportSample>,
    ambiguous_samples: Vec<ReportSample>,
    not_found_samples: Vec<ReportSample>,
    malformed_samples: Vec<ReportSample>,
    error_samples: Vec<ReportSample>,
    defect_samples: Vec<ReportSample>,
    conflict_samples: Vec<ReportSample>,
}

impl Default for ReconciliationReport {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAP)
    }
}

impl ReconciliationReport {
    pub fn new(sample_cap: usize) -> Self {
        Self {
            sample_cap,
            created: 0,
            updated: 0,
            skipped_duplicate: 0,
            ambiguous: 0,
            not_found: 0,
            malformed: 0,
            store_errors: 0,
            coordinate_defects: 0,
            conflicts: 0,
            created_samples: Vec::new(),
            updated_samples: Vec::new(),
            ambiguous_samples: Vec::new(),
            not_found_samples: Vec::new(),
            malformed_samples: Vec::new(),
            error_samples: Vec::new(),
            defect_samples: Vec::new(),
            conflict_samples: Vec::new(),
        }
    }

    fn push_sample(cap: usize, samples: &mut Vec<ReportSample>, name: &str, detail: String) {
        if samples.len() < cap {
            samples.push(ReportSample {
                name: name.to_string(),
                detail,
            });
        }
    }

    pub fn record_created(&mut self, name: &str, id: &str) {
        self.created += 1;
        Self::push_sample(self.sample_cap, &mut self.created_samples, name, format!("id={}", id));
    }

    /// One incoming row counts once however many targets it patched.
    pub fn record_updated(&mut self, name: &str, targets: &[String]) {
        self.updated += 1;
        let detail = if targets.len() > 1 {
            format!("targets={} (multiplicity {})", targets.join(", "), targets.len())
        } else {
            format!("target={}", targets.join(", "))
        };
        Self::push_sample(self.sample_cap, &mut self.updated_samples, name, detail);
    }

    pub fn record_skipped_duplicate(&mut self) {
        self.skipped_duplicate += 1;
    }

    pub fn record_ambiguous(&mut self, name: &str, candidates: &[String]) {
        self.ambiguous += 1;
        Self::push_sample(
            self.sample_cap,
            &mut self.ambiguous_samples,
            name,
            format!("candidates: {}", candidates.join(" | ")),
        );
    }

    pub fn record_not_found(&mut self, name: &str, corpus: &CorpusOverlay) {
        self.not_found += 1;
        let suggestions = nearest_names(name, corpus);
        let detail = if suggestions.is_empty() {
            "no close corpus names".to_string()
        } else {
            format!("closest: {}", suggestions.join(" | "))
        };
        Self::push_sample(self.sample_cap, &mut self.not_found_samples, name, detail);
    }

    pub fn record_malformed(&mut self, row_number: usize) {
        self.malformed += 1;
        Self::push_sample(
            self.sample_cap,
            &mut self.malformed_samples,
            "(missing name)",
            format!("row {}", row_number),
        );
    }

    pub fn record_store_error(&mut self, name: &str, error: &anyhow::Error) {
        self.store_errors += 1;
        Self::push_sample(self.sample_cap, &mut self.error_samples, name, format!("{:#}", error));
    }

    pub fn record_defects(&mut self, name: &str, defects: &[String]) {
        for defect in defects {
            self.coordinate_defects += 1;
            Self::push_sample(self.sample_cap, &mut self.defect_samples, name, defect.clone());
        }
    }

    pub fn record_conflicts(&mut self, name: &str, conflicts: &[crate::models::matching::ConflictNote]) {
        for c in conflicts {
            self.conflicts += 1;
            Self::push_sample(
                self.sample_cap,
                &mut self.conflict_samples,
                name,
                format!("{}: existing {} vs incoming {}", c.field, c.existing, c.incoming),
            );
        }
    }

    /// Whether a second run over the merged corpus changed anything.
    pub fn has_writes(&self) -> bool {
        self.created > 0 || self.updated > 0
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "========== Reconciliation Summary ==========");
        let _ = writeln!(out, "created:            {}", self.created);
        let _ = writeln!(out, "updated:            {}", self.updated);
        let _ = writeln!(out, "skipped (no-op):    {}", self.skipped_duplicate);
        let _ = writeln!(out, "ambiguous:          {}", self.ambiguous);
        let _ = writeln!(out, "not found:          {}", self.not_found);
        let _ = writeln!(out, "malformed:          {}", self.malformed);
        let _ = writeln!(out, "store errors:       {}", self.store_errors);
        let _ = writeln!(out, "coordinate defects: {}", self.coordinate_defects);
        let _ = writeln!(out, "conflicts reported: {}", self.conflicts);

        for (title, samples) in [
            ("Created", &self.created_samples),
            ("Updated", &self.updated_samples),
            ("Ambiguous", &self.ambiguous_samples),
            ("Not found", &self.not_found_samples),
            ("Malformed", &self.malformed_samples),
            ("Store errors", &self.error_samples),
            ("Coordinate defects", &self.defect_samples),
            ("Conflicts", &self.conflict_samples),
        ] {
            if samples.is_empty() {
                continue;
            }
            let _ = writeln!(out, "--- {} (first {}) ---", title, samples.len());
            for s in samples {
                let _ = writeln!(out, "  {} :: {}", s.name, s.detail);
            }
        }
        let _ = writeln!(out, "============================================");
        out
    }

    pub fn log_summary(&self) {
        for line in self.summary().lines() {
            info!("{}", line);
        }
    }
}

/// Nearest corpus names by Jaro-Winkler over normalized keys, for operator
/// hints on not-found rows.
pub fn nearest_names(name: &str, corpus: &CorpusOverlay) -> Vec<String> {
    let needle = normalize_name(name);
    if needle.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(f64, String)> = corpus
        .iter()
        .filter_map(|m| {
            let score = jaro_winkler(&needle, &normalize_name(&m.name));
            (score >= SUGGESTION_MIN_SIMILARITY)
                .then(|| (score, format!("{}（{}）", m.name, m.pref)))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(SUGGESTION_LIMIT).map(|(_, s)| s).collect()
}
