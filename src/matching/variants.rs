//! Candidate-name generation for the exact-name match stage.

use crate::normalize::name::char_variants;
use crate::normalize::region::{short_form, tokenize_region};

/// Document stores cap membership queries around ten values, so the
/// variant set is bounded to match.
pub const NAME_QUERY_LIMIT: usize = 10;

/// Generates a bounded, ordered set of plausible stored spellings of a
/// name: its character variants, then each variant prefixed with the
/// region's short and full forms (corpus records sometimes carry names like
/// 会津駒ヶ岳 stored as 福島会津駒ヶ岳 after careless imports).
pub fn candidate_names(name: &str, pref: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |v: String| {
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    };

    let variants = char_variants(name);
    for v in &variants {
        push(v.clone());
    }

    if let Some(pref) = pref {
        if let Some(full) = tokenize_region(pref).into_iter().next() {
            let base = short_form(&full).unwrap_or(full.as_str());
            for v in &variants {
                push(format!("{}{}", base, v));
                push(format!("{}{}", full, v));
            }
        }
    }

    out.truncate(NAME_QUERY_LIMIT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_spelling_comes_first() {
        let vars = candidate_names("槍ヶ岳", Some("長野県"));
        assert_eq!(vars[0], "槍ヶ岳");
        assert!(vars.contains(&"槍ケ岳".to_string()));
    }

    #[test]
    fn test_region_prefixed_forms() {
        let vars = candidate_names("駒ヶ岳", Some("福島県"));
        assert!(vars.contains(&"福島駒ヶ岳".to_string()));
        assert!(vars.contains(&"福島県駒ヶ岳".to_string()));
    }

    #[test]
    fn test_bounded_to_query_limit() {
        let vars = candidate_names("御嶽山ヶ岳", Some("長野県・岐阜県"));
        assert!(vars.len() <= NAME_QUERY_LIMIT);
    }

    #[test]
    fn test_no_region_means_plain_variants() {
        let vars = candidate_names("富士山", None);
        assert_eq!(vars, vec!["富士山".to_string()]);
    }
}
