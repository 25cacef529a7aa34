//! Region tokenization over the prefecture vocabulary.
//!
//! Location fields are free text: one prefecture or several, joined by any
//! of ・ ･ 、 , | /, in short form (長野) or full form (長野県), sometimes
//! with trailing district text. Comparison always happens on canonical
//! full-form token sets.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

/// (full form, short form) for all 47 prefectures.
const PREFECTURES: [(&str, &str); 47] = [
    ("北海道", "北海道"),
    ("青森県", "青森"),
    ("岩手県", "岩手"),
    ("宮城県", "宮城"),
    ("秋田県", "秋田"),
    ("山形県", "山形"),
    ("福島県", "福島"),
    ("茨城県", "茨城"),
    ("栃木県", "栃木"),
    ("群馬県", "群馬"),
    ("埼玉県", "埼玉"),
    ("千葉県", "千葉"),
    ("東京都", "東京"),
    ("神奈川県", "神奈川"),
    ("新潟県", "新潟"),
    ("富山県", "富山"),
    ("石川県", "石川"),
    ("福井県", "福井"),
    ("山梨県", "山梨"),
    ("長野県", "長野"),
    ("岐阜県", "岐阜"),
    ("静岡県", "静岡"),
    ("愛知県", "愛知"),
    ("三重県", "三重"),
    ("滋賀県", "滋賀"),
    ("京都府", "京都"),
    ("大阪府", "大阪"),
    ("兵庫県", "兵庫"),
    ("奈良県", "奈良"),
    ("和歌山県", "和歌山"),
    ("鳥取県", "鳥取"),
    ("島根県", "島根"),
    ("岡山県", "岡山"),
    ("広島県", "広島"),
    ("山口県", "山口"),
    ("徳島県", "徳島"),
    ("香川県", "香川"),
    ("愛媛県", "愛媛"),
    ("高知県", "高知"),
    ("福岡県", "福岡"),
    ("佐賀県", "佐賀"),
    ("長崎県", "長崎"),
    ("熊本県", "熊本"),
    ("大分県", "大分"),
    ("宮崎県", "宮崎"),
    ("鹿児島県", "鹿児島"),
    ("沖縄県", "沖縄"),
];

static SHORT_TO_FULL: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| PREFECTURES.iter().map(|(full, short)| (*short, *full)).collect());

static FULL_TO_SHORT: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| PREFECTURES.iter().map(|(full, short)| (*full, *short)).collect());

const DELIMITERS: [char; 6] = ['・', '･', '、', ',', '|', '/'];

/// Parses a free-text region field into the set of canonical full-form
/// prefecture tokens it mentions. Unrecognized fragments are dropped; an
/// empty set means "unknown region", never an error.
pub fn tokenize_region(raw: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    if raw.trim().is_empty() {
        return tokens;
    }
    let unified: String = raw
        .chars()
        .map(|c| if DELIMITERS.contains(&c) { '・' } else { c })
        .collect();
    for fragment in unified.split('・') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        // Full-form substring match first: covers fragments like 東京都西多摩郡.
        if let Some((full, _)) = PREFECTURES.iter().find(|(full, _)| fragment.contains(full)) {
            tokens.insert((*full).to_string());
            continue;
        }
        if let Some(full) = SHORT_TO_FULL.get(fragment) {
            tokens.insert((*full).to_string());
        }
    }
    tokens
}

/// Short form of a full-form token (長野県 → 長野). Used when generating
/// region-prefixed name variants.
pub fn short_form(full: &str) -> Option<&'static str> {
    FULL_TO_SHORT.get(full).copied()
}

/// Sorted full-form tokens joined with ・, or the raw text as given when
/// nothing is recognized — an unknown region is preserved, not fabricated.
pub fn canonical_region_join(raw: &str) -> String {
    let tokens = tokenize_region(raw);
    if tokens.is_empty() {
        raw.trim().to_string()
    } else {
        tokens.into_iter().collect::<Vec<_>>().join("・")
    }
}

/// Region-consistency rule used by the candidate matcher: token sets match
/// when one is a subset of the other (a corpus record may list more or
/// fewer prefectures than the batch row). As a last resort the corpus-side
/// raw text is searched for any of the incoming full-form tokens.
pub fn region_sets_match(incoming_raw: &str, corpus_raw: &str) -> bool {
    let a = tokenize_region(incoming_raw);
    let b = tokenize_region(corpus_raw);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.is_subset(&b) || b.is_subset(&a) {
        return true;
    }
    a.iter().any(|full| corpus_raw.contains(full.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_short_and_full_forms_resolve_alike() {
        assert_eq!(tokenize_region("東京"), set(&["東京都"]));
        assert_eq!(tokenize_region("東京都"), set(&["東京都"]));
        assert_eq!(tokenize_region("北海道"), set(&["北海道"]));
    }

    #[test]
    fn test_multiple_regions_and_delimiters() {
        for raw in ["長野県・岐阜県", "長野|岐阜", "長野、岐阜県", "長野/岐阜"] {
            assert_eq!(tokenize_region(raw), set(&["岐阜県", "長野県"]), "raw={}", raw);
        }
    }

    #[test]
    fn test_full_form_substring_match() {
        assert_eq!(tokenize_region("東京都西多摩郡"), set(&["東京都"]));
    }

    #[test]
    fn test_unknown_region_is_empty_set() {
        assert!(tokenize_region("Nowhere Prefecture").is_empty());
        assert!(tokenize_region("").is_empty());
    }

    #[test]
    fn test_subset_matching_covers_granularity_difference() {
        assert!(region_sets_match("長野県", "長野県・岐阜県"));
        assert!(region_sets_match("長野県・岐阜県", "長野"));
        assert!(!region_sets_match("青森県", "長野県・岐阜県"));
    }

    #[test]
    fn test_unknown_side_never_matches() {
        assert!(!region_sets_match("", "長野県"));
        assert!(!region_sets_match("Nowhere", "長野県"));
    }

    #[test]
    fn test_raw_containment_fallback() {
        // Overlapping but non-subset sets still match when the corpus raw
        // text carries the incoming token.
        assert!(region_sets_match("長野県・富山県", "長野県・岐阜県"));
    }

    #[test]
    fn test_canonical_join_sorted_and_preserving() {
        assert_eq!(canonical_region_join("岐阜・長野"), "岐阜県・長野県");
        assert_eq!(canonical_region_join("長野・岐阜"), "岐阜県・長野県");
        assert_eq!(canonical_region_join("Nowhere Prefecture"), "Nowhere Prefecture");
    }
}
