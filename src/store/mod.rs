//! Record store collaborator.
//!
//! The reconciliation core only assumes a document store with point
//! lookups, a tag (array-contains) query, and upsert-with-merge writes —
//! never whole-document replacement. `MemoryStore` is the bundled
//! implementation, loaded from and saved to a JSON corpus snapshot.

pub mod json_file;
pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::models::core::{dedup_preserve, Mountain};
use crate::models::matching::Patch;

pub use memory::MemoryStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Full corpus snapshot in stable (insertion) order.
    async fn fetch_all(&self) -> Result<Vec<Mountain>>;

    /// Point lookup by document id.
    async fn get(&self, id: &str) -> Result<Option<Mountain>>;

    /// Records whose tag set contains `tag` (array-contains query).
    async fn fetch_by_tag(&self, tag: &str) -> Result<Vec<Mountain>>;

    /// Inserts a new record under its own id.
    async fn insert(&self, record: Mountain) -> Result<String>;

    /// Writes only the fields named by the patch; other fields are left
    /// untouched. Creates the document when it does not exist.
    async fn upsert_merge(&self, id: &str, patch: &Patch) -> Result<()>;

    /// Hard delete. Only the explicit destructive operations call this.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Applies a field-level patch to a record in place, then re-establishes
/// the set invariants on tags/styles/purposes/legacy_ids.
pub fn apply_patch(record: &mut Mountain, patch: &Patch) -> Result<()> {
    let mut value = serde_json::to_value(&*record).context("Failed to serialize record")?;
    if let Value::Object(map) = &mut value {
        for (field, new_value) in patch {
            map.insert(field.clone(), new_value.clone());
        }
    }
    let mut merged: Mountain =
        serde_json::from_value(value).context("Failed to deserialize patched record")?;
    merged.tags = dedup_preserve(&merged.tags);
    merged.styles = dedup_preserve(&merged.styles);
    merged.purposes = dedup_preserve(&merged.purposes);
    merged.legacy_ids = dedup_preserve(&merged.legacy_ids);
    *record = merged;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_patch_touches_only_listed_fields() {
        let mut m = Mountain {
            id: "x".to_string(),
            name: "高尾山".to_string(),
            pref: "東京都".to_string(),
            description: Some("keep me".to_string()),
            ..Default::default()
        };
        let mut patch = Patch::new();
        patch.insert("name_kana".to_string(), json!("たかおさん"));
        apply_patch(&mut m, &patch).unwrap();

        assert_eq!(m.name_kana.as_deref(), Some("たかおさん"));
        assert_eq!(m.description.as_deref(), Some("keep me"));
        assert_eq!(m.name, "高尾山");
    }

    #[test]
    fn test_apply_patch_restores_tag_set_invariant() {
        let mut m = Mountain::default();
        let mut patch = Patch::new();
        patch.insert(
            "tags".to_string(),
            json!(["日本百名山", "日本百名山", "花の百名山"]),
        );
        apply_patch(&mut m, &patch).unwrap();
        assert_eq!(m.tags, vec!["日本百名山", "花の百名山"]);
    }
}
