//! Stable identifier derivation.
//!
//! A record's durable primary key is the SHA-1 digest of its normalized
//! name and canonical region join. The same logical mountain therefore
//! hashes to the same document id no matter which batch or operator
//! computed it, which is what makes re-imports and the legacy-id migration
//! idempotent. Collisions are not detected; the 160-bit space is vast
//! relative to a catalog of a few thousand records.

use sha1::{Digest, Sha1};

/// Separator between the two identity components inside the hash input.
const ID_KEY_SEPARATOR: &str = "__";

pub fn stable_id(normalized_name: &str, canonical_region_join: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(normalized_name.as_bytes());
    hasher.update(ID_KEY_SEPARATOR.as_bytes());
    hasher.update(canonical_region_join.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = stable_id("高尾", "東京都");
        let b = stable_id("高尾", "東京都");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_either_component_changes_the_id() {
        let base = stable_id("高尾", "東京都");
        assert_ne!(base, stable_id("高雄", "東京都"));
        assert_ne!(base, stable_id("高尾", "京都府"));
    }

    #[test]
    fn test_separator_prevents_component_bleed() {
        // (ab, c) and (a, bc) must not collide via concatenation.
        assert_ne!(stable_id("ab", "c"), stable_id("a", "bc"));
    }
}
