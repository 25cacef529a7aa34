//! Merge resolution: turning a match outcome into a concrete action and a
//! non-destructive field-level patch.
//!
//! The rules are uniform across every operation that writes: scalars are
//! filled only where the existing value is absent, empty, or a text-typed
//! coordinate; set-valued fields are unioned; nothing non-empty is ever
//! cleared or overwritten. Conflicting values are reported, not applied.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::corpus::CorpusOverlay;
use crate::models::core::{dedup_preserve, Coordinate, IncomingRecord, Mountain, Trailhead};
use crate::models::matching::{
    Action, ConflictNote, MatchOutcome, MatchStrategy, MergePlan, Patch,
};
use crate::normalize::name::strip_parens;

/// Coordinates closer than this are the same point; farther apart they are
/// a reported conflict.
pub const COORD_CONFLICT_EPS: f64 = 1e-4;

/// Trailhead coordinates within this tolerance identify the same access
/// point.
pub const TRAILHEAD_COORD_EPS: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Create a new record when nothing matches (import) instead of
    /// flagging the row unresolved (tag/update-only operations).
    pub create_missing: bool,
    /// Stamp new records with their derived stable id instead of an opaque
    /// generated one.
    pub durable_ids: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            create_missing: true,
            durable_ids: false,
        }
    }
}

pub fn resolve(
    incoming: &IncomingRecord,
    outcome: &MatchOutcome,
    corpus: &CorpusOverlay,
    opts: &ResolveOptions,
) -> Action {
    match outcome {
        MatchOutcome::Stable(id) => update_one(incoming, id, corpus),
        MatchOutcome::Unique { id, .. } => update_one(incoming, id, corpus),
        MatchOutcome::Multiple { ids, strategy } => match strategy {
            // Legacy record and migrated counterpart coexisting: patch all
            // targets so the corpus stays consistent mid-migration.
            MatchStrategy::NameVariants => {
                let updates: Vec<(String, MergePlan)> = ids
                    .iter()
                    .filter_map(|id| {
                        corpus
                            .get(id)
                            .map(|existing| (id.clone(), build_patch(existing, incoming)))
                    })
                    .collect();
                Action::UpdateMultiple { updates }
            }
            // A substring tie that raw-name equality could not break is an
            // operator decision, never an automatic write.
            _ => Action::FlagAmbiguous {
                candidates: ids.clone(),
            },
        },
        MatchOutcome::None => {
            if opts.create_missing {
                Action::Create {
                    record: new_record(incoming, opts.durable_ids),
                }
            } else {
                Action::FlagUnresolved
            }
        }
    }
}

fn update_one(incoming: &IncomingRecord, id: &str, corpus: &CorpusOverlay) -> Action {
    match corpus.get(id) {
        Some(existing) => Action::Update {
            target: id.to_string(),
            plan: build_patch(existing, incoming),
        },
        None => Action::FlagUnresolved,
    }
}

/// Builds a new record from an incoming row. The display name keeps its
/// original spelling minus the parenthetical alias; the region is preserved
/// exactly as given, even when unrecognized.
pub fn new_record(incoming: &IncomingRecord, durable_ids: bool) -> Mountain {
    let now = Utc::now();
    let id = if durable_ids {
        incoming.stable_id()
    } else {
        Uuid::new_v4().to_string()
    };
    Mountain {
        id,
        name: strip_parens(&incoming.name),
        name_kana: incoming.name_kana.clone().filter(|s| !s.is_empty()),
        pref: incoming.pref.clone().unwrap_or_default(),
        elevation: incoming.elevation,
        lat: incoming.lat.map(Coordinate::Num),
        lng: incoming.lng.map(Coordinate::Num),
        level: incoming.level.clone().filter(|s| !s.is_empty()),
        tags: dedup_preserve(&incoming.tags),
        styles: dedup_preserve(&incoming.styles),
        purposes: dedup_preserve(&incoming.purposes),
        access: incoming.access.clone().filter(|s| !s.is_empty()),
        description: incoming.description.clone().filter(|s| !s.is_empty()),
        has_hut: incoming.has_hut,
        has_onsen: incoming.has_onsen,
        has_ropeway: incoming.has_ropeway,
        has_cablecar: incoming.has_cablecar,
        has_tent: incoming.has_tent,
        trailheads: incoming.trailhead.clone().into_iter().collect(),
        legacy_ids: Vec::new(),
        created_at: Some(now),
        updated_at: Some(now),
    }
}

/// Computes the non-destructive patch bringing an existing record up to
/// date with an incoming row.
pub fn build_patch(existing: &Mountain, incoming: &IncomingRecord) -> MergePlan {
    let mut plan = MergePlan::default();

    fill_string(&mut plan.patch, "name_kana", existing.name_kana.as_deref(), incoming.name_kana.as_deref());
    fill_string(&mut plan.patch, "level", existing.level.as_deref(), incoming.level.as_deref());
    fill_string(&mut plan.patch, "access", existing.access.as_deref(), incoming.access.as_deref());
    fill_string(&mut plan.patch, "description", existing.description.as_deref(), incoming.description.as_deref());

    if existing.pref.trim().is_empty() {
        if let Some(pref) = incoming.pref.as_deref().filter(|p| !p.trim().is_empty()) {
            plan.patch.insert("pref".to_string(), json!(pref));
        }
    }

    // Zero elevation counts as absent; these documents predate validation.
    match (existing.elevation.unwrap_or(0), incoming.elevation) {
        (0, Some(e)) if e > 0 => {
            plan.patch.insert("elevation".to_string(), json!(e));
        }
        (have, Some(want)) if have != 0 && want != 0 && have != want => {
            plan.conflicts.push(ConflictNote {
                field: "elevation".to_string(),
                existing: have.to_string(),
                incoming: want.to_string(),
            });
        }
        _ => {}
    }

    merge_coordinate(&mut plan, "lat", existing.lat.as_ref(), incoming.lat);
    merge_coordinate(&mut plan, "lng", existing.lng.as_ref(), incoming.lng);

    union_field(&mut plan.patch, "tags", &existing.tags, &incoming.tags);
    union_field(&mut plan.patch, "styles", &existing.styles, &incoming.styles);
    union_field(&mut plan.patch, "purposes", &existing.purposes, &incoming.purposes);

    fill_flag(&mut plan.patch, "has_hut", existing.has_hut, incoming.has_hut);
    fill_flag(&mut plan.patch, "has_onsen", existing.has_onsen, incoming.has_onsen);
    fill_flag(&mut plan.patch, "has_ropeway", existing.has_ropeway, incoming.has_ropeway);
    fill_flag(&mut plan.patch, "has_cablecar", existing.has_cablecar, incoming.has_cablecar);
    fill_flag(&mut plan.patch, "has_tent", existing.has_tent, incoming.has_tent);

    if let Some(th) = incoming.trailhead.as_ref().filter(|t| !t.name.is_empty()) {
        if let Some(merged) = merge_trailheads(&existing.trailheads, std::slice::from_ref(th)) {
            plan.patch.insert("trailheads".to_string(), json!(merged));
        }
    }

    stamp_if_dirty(&mut plan.patch);
    plan
}

/// Record-to-record merge used by the stable-id migration: the legacy
/// record fills gaps on the stable one, arrays are unioned, and the legacy
/// document id is absorbed into `legacy_ids`.
pub fn merge_records(stable: &Mountain, legacy: &Mountain) -> MergePlan {
    let mut plan = MergePlan::default();

    fill_string(&mut plan.patch, "name_kana", stable.name_kana.as_deref(), legacy.name_kana.as_deref());
    fill_string(&mut plan.patch, "level", stable.level.as_deref(), legacy.level.as_deref());
    fill_string(&mut plan.patch, "access", stable.access.as_deref(), legacy.access.as_deref());
    fill_string(&mut plan.patch, "description", stable.description.as_deref(), legacy.description.as_deref());

    if stable.pref.trim().is_empty() && !legacy.pref.trim().is_empty() {
        plan.patch.insert("pref".to_string(), json!(legacy.pref));
    }
    if stable.elevation.unwrap_or(0) == 0 && legacy.elevation.unwrap_or(0) != 0 {
        plan.patch.insert("elevation".to_string(), json!(legacy.elevation));
    }

    merge_coordinate(&mut plan, "lat", stable.lat.as_ref(), legacy.lat_f64());
    merge_coordinate(&mut plan, "lng", stable.lng.as_ref(), legacy.lng_f64());

    union_field(&mut plan.patch, "tags", &stable.tags, &legacy.tags);
    union_field(&mut plan.patch, "styles", &stable.styles, &legacy.styles);
    union_field(&mut plan.patch, "purposes", &stable.purposes, &legacy.purposes);

    fill_flag(&mut plan.patch, "has_hut", stable.has_hut, legacy.has_hut);
    fill_flag(&mut plan.patch, "has_onsen", stable.has_onsen, legacy.has_onsen);
    fill_flag(&mut plan.patch, "has_ropeway", stable.has_ropeway, legacy.has_ropeway);
    fill_flag(&mut plan.patch, "has_cablecar", stable.has_cablecar, legacy.has_cablecar);
    fill_flag(&mut plan.patch, "has_tent", stable.has_tent, legacy.has_tent);

    if let Some(merged) = merge_trailheads(&stable.trailheads, &legacy.trailheads) {
        plan.patch.insert("trailheads".to_string(), json!(merged));
    }

    let mut absorbed: Vec<String> = stable.legacy_ids.clone();
    absorbed.extend(legacy.legacy_ids.iter().cloned());
    absorbed.push(legacy.id.clone());
    let absorbed = dedup_preserve(&absorbed);
    if absorbed != stable.legacy_ids {
        plan.patch.insert("legacy_ids".to_string(), json!(absorbed));
    }

    stamp_if_dirty(&mut plan.patch);
    plan
}

fn fill_string(patch: &mut Patch, field: &str, existing: Option<&str>, incoming: Option<&str>) {
    let have = existing.map(str::trim).unwrap_or("");
    if have.is_empty() {
        if let Some(value) = incoming.map(str::trim).filter(|v| !v.is_empty()) {
            patch.insert(field.to_string(), json!(value));
        }
    }
}

fn fill_flag(patch: &mut Patch, field: &str, existing: Option<bool>, incoming: Option<bool>) {
    if existing.is_none() {
        if let Some(value) = incoming {
            patch.insert(field.to_string(), json!(value));
        }
    }
}

fn union_field(patch: &mut Patch, field: &str, existing: &[String], incoming: &[String]) {
    let mut combined: Vec<String> = existing.to_vec();
    combined.extend(incoming.iter().cloned());
    let combined = dedup_preserve(&combined);
    if combined != existing {
        patch.insert(field.to_string(), json!(combined));
    }
}

fn merge_coordinate(plan: &mut MergePlan, field: &str, existing: Option<&Coordinate>, incoming: Option<f64>) {
    if let Some(Coordinate::Text(text)) = existing {
        plan.defects.push(format!("{} stored as text {:?}", field, text));
    }
    let have = existing.and_then(Coordinate::as_f64);
    match (have, incoming) {
        (None, Some(value)) => {
            // Fills both a genuinely absent value and a text-typed defect.
            plan.patch.insert(field.to_string(), json!(value));
        }
        (Some(a), Some(b)) if (a - b).abs() > COORD_CONFLICT_EPS => {
            plan.conflicts.push(ConflictNote {
                field: field.to_string(),
                existing: a.to_string(),
                incoming: b.to_string(),
            });
        }
        _ => {}
    }
}

/// Returns the combined trailhead list when the incoming entries change it,
/// or `None` when everything is already represented. An existing entry
/// matches by exact name or near-equal coordinates; matched entries are
/// shallow-merged fill-only.
fn merge_trailheads(existing: &[Trailhead], incoming: &[Trailhead]) -> Option<Vec<Trailhead>> {
    let mut combined: Vec<Trailhead> = existing.to_vec();
    let mut changed = false;

    for th in incoming {
        if th.name.is_empty() {
            continue;
        }
        let slot = combined.iter_mut().find(|t| {
            t.name == th.name
                || (near(t.lat, th.lat, TRAILHEAD_COORD_EPS)
                    && near(t.lng, th.lng, TRAILHEAD_COORD_EPS))
        });
        match slot {
            Some(found) => {
                if found.lat.is_none() && th.lat.is_some() {
                    found.lat = th.lat;
                    changed = true;
                }
                if found.lng.is_none() && th.lng.is_some() {
                    found.lng = th.lng;
                    changed = true;
                }
                if found.source.is_none() && th.source.is_some() {
                    found.source = th.source.clone();
                    changed = true;
                }
            }
            None => {
                combined.push(th.clone());
                changed = true;
            }
        }
    }

    changed.then_some(combined)
}

fn near(a: Option<f64>, b: Option<f64>, eps: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= eps,
        _ => false,
    }
}

fn stamp_if_dirty(patch: &mut Patch) {
    if !patch.is_empty() {
        patch.insert("updated_at".to_string(), json!(Utc::now()));
    }
}
