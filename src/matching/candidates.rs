//! Cascading candidate matcher.
//!
//! One consolidated cascade replaces the slightly-different heuristics the
//! import and tagging jobs used to carry individually. Each stage runs only
//! when the previous one produced nothing, and every stage reads the same
//! corpus overlay snapshot, so repeated calls classify identically.

use log::debug;

use crate::corpus::CorpusOverlay;
use crate::models::core::{IncomingRecord, Mountain};
use crate::models::matching::{MatchOutcome, MatchStrategy};
use crate::normalize::name::{normalize_kana, normalize_name};
use crate::normalize::region::region_sets_match;

use super::variants::candidate_names;

#[derive(Debug, Clone)]
pub struct MatcherOptions {
    /// Permit the last-resort normalized-substring stage.
    pub allow_substring: bool,
    /// Accept a single exact-name hit even when no region agreement was
    /// found (the unique-name escape hatch).
    pub allow_unique_name: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            allow_substring: true,
            allow_unique_name: false,
        }
    }
}

pub fn find_candidates(
    incoming: &IncomingRecord,
    corpus: &CorpusOverlay,
    opts: &MatcherOptions,
) -> MatchOutcome {
    // Stage 1: the durable identifier already exists in the corpus.
    let sid = incoming.stable_id();
    if corpus.get(&sid).is_some() {
        return MatchOutcome::Stable(sid);
    }

    // Stage 2: exact-name membership over the bounded variant set,
    // filtered by region consistency.
    let names = candidate_names(&incoming.name, incoming.pref.as_deref());
    let raw_hits = corpus.find_by_names(&names);
    if !raw_hits.is_empty() {
        let incoming_pref = incoming.pref.as_deref().unwrap_or("");
        let filtered: Vec<&Mountain> = raw_hits
            .iter()
            .copied()
            .filter(|m| region_sets_match(incoming_pref, &m.pref))
            .collect();
        match filtered.len() {
            1 => {
                return MatchOutcome::Unique {
                    id: filtered[0].id.clone(),
                    strategy: MatchStrategy::NameVariants,
                }
            }
            n if n > 1 => {
                // Typically a legacy record and its migrated stable-id
                // counterpart coexisting; both are legitimate targets.
                return MatchOutcome::Multiple {
                    ids: filtered.iter().map(|m| m.id.clone()).collect(),
                    strategy: MatchStrategy::NameVariants,
                };
            }
            _ => {
                if raw_hits.len() == 1 && opts.allow_unique_name {
                    debug!(
                        "Unique-name escape hatch: {} -> {}",
                        incoming.name, raw_hits[0].id
                    );
                    return MatchOutcome::Unique {
                        id: raw_hits[0].id.clone(),
                        strategy: MatchStrategy::UniqueNameEscape,
                    };
                }
                // Multiple raw hits, none region-consistent: fall through.
            }
        }
    }

    // Stage 3: phonetic-reading containment, a high-confidence signal when
    // the batch carries kana.
    if let Some(kana) = incoming.name_kana.as_deref() {
        let kana = normalize_kana(kana);
        if !kana.is_empty() {
            let hits: Vec<&Mountain> = corpus
                .iter()
                .filter(|m| {
                    m.name_kana
                        .as_deref()
                        .map(normalize_kana)
                        .filter(|k| !k.is_empty())
                        .map(|k| k.contains(&kana) || kana.contains(&k))
                        .unwrap_or(false)
                })
                .collect();
            if hits.len() == 1 {
                return MatchOutcome::Unique {
                    id: hits[0].id.clone(),
                    strategy: MatchStrategy::KanaContainment,
                };
            }
        }
    }

    // Stage 4: normalized-name containment in either direction.
    if opts.allow_substring {
        let needle = incoming.normalized_name();
        if !needle.is_empty() {
            let hits: Vec<&Mountain> = corpus
                .iter()
                .filter(|m| {
                    let n = normalize_name(&m.name);
                    !n.is_empty() && (n.contains(&needle) || needle.contains(&n))
                })
                .collect();
            match hits.len() {
                0 => {}
                1 => {
                    return MatchOutcome::Unique {
                        id: hits[0].id.clone(),
                        strategy: MatchStrategy::Substring,
                    }
                }
                _ => {
                    // Tie-break on exact raw-name equality before giving up.
                    let exact: Vec<&&Mountain> =
                        hits.iter().filter(|m| m.name == incoming.name).collect();
                    if exact.len() == 1 {
                        return MatchOutcome::Unique {
                            id: exact[0].id.clone(),
                            strategy: MatchStrategy::Substring,
                        };
                    }
                    return MatchOutcome::Multiple {
                        ids: hits.iter().map(|m| m.id.clone()).collect(),
                        strategy: MatchStrategy::Substring,
                    };
                }
            }
        }
    }

    MatchOutcome::None
}
