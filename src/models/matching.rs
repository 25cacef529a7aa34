//! Match classification and merge-plan types shared by the matcher, the
//! resolver, and the batch operations.

use serde_json::{Map, Value};

use super::core::Mountain;

/// A field-level patch, applied with upsert-with-merge semantics: only the
/// listed fields are written, everything else on the target is untouched.
pub type Patch = Map<String, Value>;

/// Which cascade stage produced a match. A stable-id point hit is its own
/// outcome (`MatchOutcome::Stable`); these cover the later stages, and the
/// resolver treats multiplicity differently depending on which one
/// reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Exact-name hit within the generated variant set, region-consistent.
    NameVariants,
    /// Single exact-name hit accepted without region agreement.
    UniqueNameEscape,
    /// Phonetic-reading containment in either direction.
    KanaContainment,
    /// Last-resort normalized-name containment.
    Substring,
}

/// Outcome of the candidate cascade for one incoming record.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A corpus record already sits at the incoming record's stable id.
    Stable(String),
    Unique {
        id: String,
        strategy: MatchStrategy,
    },
    Multiple {
        ids: Vec<String>,
        strategy: MatchStrategy,
    },
    None,
}

/// A conflicting update that was reported instead of applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictNote {
    pub field: String,
    pub existing: String,
    pub incoming: String,
}

/// A computed patch plus everything the operator should hear about it.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    pub patch: Patch,
    pub conflicts: Vec<ConflictNote>,
    /// Data-quality defects observed on the existing record (e.g. a
    /// text-typed coordinate the batch could not repair).
    pub defects: Vec<String>,
}

impl MergePlan {
    pub fn is_noop(&self) -> bool {
        self.patch.is_empty()
    }
}

/// What the resolver decided to do with one incoming record.
#[derive(Debug, Clone)]
pub enum Action {
    Create {
        record: Mountain,
    },
    Update {
        target: String,
        plan: MergePlan,
    },
    /// More than one record legitimately matched (typically a legacy record
    /// and its migrated stable-id counterpart). The same merge rules are
    /// applied to every target so the corpus stays consistent through the
    /// identity-migration window.
    UpdateMultiple {
        updates: Vec<(String, MergePlan)>,
    },
    /// Surfaced for operator decision; never auto-applied.
    FlagAmbiguous {
        candidates: Vec<String>,
    },
    /// No match and record creation was not requested.
    FlagUnresolved,
}
