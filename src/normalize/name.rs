//! Mountain name normalization.
//!
//! Turns a free-text name into a comparison key: parenthetical aliases go,
//! whitespace and separator punctuation go, interchangeable character
//! variants are unified, and one generic topographic suffix is stripped.
//! The same input-method inconsistencies show up batch after batch (ヶ vs ケ,
//! 嶽 vs 岳, assorted dashes and middle dots), so the rules live here once.

use once_cell::sync::Lazy;
use regex::Regex;

static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[（(].*?[）)]").unwrap());

/// Generic topographic suffixes, longest first so 連峰/連山 win over 山.
/// 嶽 is unified to 岳 before this table is consulted.
const GENERIC_SUFFIXES: [&str; 5] = ["連峰", "連山", "岳", "峰", "嶺"];
const GENERIC_SUFFIXES_SHORT: [&str; 1] = ["山"];

/// Characters dropped outright: middle dots, long-vowel marks, dash
/// variants, and common punctuation.
const DROPPED_CHARS: [char; 10] = ['・', '･', '·', 'ー', '−', '‐', '、', ',', '。', '．'];

/// Canonicalizes a display name into a comparison key.
///
/// Total and pure: any input (including empty) yields a string, and
/// `normalize_name(normalize_name(s)) == normalize_name(s)` for all `s`.
pub fn normalize_name(raw: &str) -> String {
    let stripped = PAREN_RE.replace_all(raw, "");
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c.is_whitespace() || DROPPED_CHARS.contains(&c) {
            continue;
        }
        out.push(match c {
            'ヶ' => 'ケ',
            '嶽' => '岳',
            _ => c,
        });
    }
    strip_generic_suffix(&out)
}

/// Strips the parenthetical alias annotation but keeps the rest of the
/// display name intact. Used when stamping the `name` field of a newly
/// created record.
pub fn strip_parens(raw: &str) -> String {
    PAREN_RE.replace_all(raw, "").trim().to_string()
}

/// Phonetic readings only need whitespace collapsed before comparison.
pub fn normalize_kana(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Spelling-variant forms of a name, the original spelling first. Bounded:
/// each rule contributes at most one extra form.
pub fn char_variants(name: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |v: String| {
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    };
    push(name.to_string());
    push(name.replace('ヶ', "ケ"));
    push(name.replace('ケ', "ヶ"));
    push(name.replace('嶽', "岳"));
    push(name.replace('岳', "嶽"));
    push(name.replace("御嶽山", "御岳山"));
    push(name.replace("御岳山", "御嶽山"));
    out
}

/// Removes one trailing generic suffix. The strip is skipped when the
/// remainder would be empty or would itself end in a suffix word; that guard
/// keeps a single application idempotent (白山岳 must not collapse to 白 via
/// two passes) and keeps names like 白山 distinct from 白.
fn strip_generic_suffix(s: &str) -> String {
    for suffix in GENERIC_SUFFIXES.iter().chain(GENERIC_SUFFIXES_SHORT.iter()) {
        if let Some(rest) = s.strip_suffix(suffix) {
            if rest.is_empty() || ends_with_suffix(rest) {
                return s.to_string();
            }
            return rest.to_string();
        }
    }
    s.to_string()
}

fn ends_with_suffix(s: &str) -> bool {
    GENERIC_SUFFIXES
        .iter()
        .chain(GENERIC_SUFFIXES_SHORT.iter())
        .any(|suf| s.ends_with(suf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_parenthetical_alias() {
        assert_eq!(normalize_name("高尾山（たかおさん）"), "高尾");
        assert_eq!(normalize_name("高尾山(Takaosan)"), "高尾");
    }

    #[test]
    fn test_collapses_whitespace_and_separators() {
        assert_eq!(normalize_name("槍 ヶ 岳"), "槍ケ");
        assert_eq!(normalize_name("大山\u{3000}"), "大");
        assert_eq!(normalize_name("トムラウシ・山"), "トムラウシ");
    }

    #[test]
    fn test_unifies_character_variants() {
        assert_eq!(normalize_name("槍ヶ岳"), normalize_name("槍ケ岳"));
        assert_eq!(normalize_name("御嶽"), normalize_name("御岳"));
    }

    #[test]
    fn test_strips_one_generic_suffix() {
        assert_eq!(normalize_name("乗鞍岳"), "乗鞍");
        assert_eq!(normalize_name("朝日連峰"), "朝日");
        assert_eq!(normalize_name("筑波山"), "筑波");
    }

    #[test]
    fn test_suffix_guard_protects_short_and_nested_names() {
        // Remainder would be empty.
        assert_eq!(normalize_name("山"), "山");
        // Remainder would still end in a suffix word.
        assert_eq!(normalize_name("白山岳"), "白山岳");
        assert_eq!(normalize_name("白山"), "白");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "高尾山（たかおさん）",
            "槍ヶ岳",
            "白山岳",
            "朝日連峰",
            "飯豊山",
            "山",
            "",
            "Mt. Fuji (富士山)",
            "大・雪・山",
        ];
        for s in samples {
            let once = normalize_name(s);
            assert_eq!(normalize_name(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_total_on_empty() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_char_variants_bounded_and_deduped() {
        let vars = char_variants("槍ヶ岳");
        assert!(vars.contains(&"槍ヶ岳".to_string()));
        assert!(vars.contains(&"槍ケ岳".to_string()));
        assert!(vars.contains(&"槍ヶ嶽".to_string()));
        assert_eq!(vars.iter().collect::<std::collections::HashSet<_>>().len(), vars.len());

        let plain = char_variants("富士");
        assert_eq!(plain, vec!["富士".to_string()]);
    }

    #[test]
    fn test_normalize_kana() {
        assert_eq!(normalize_kana("たかお さん"), "たかおさん");
    }
}
