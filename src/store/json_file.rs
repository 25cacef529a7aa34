//! Corpus snapshot persistence: a JSON array of records on disk.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

use super::{MemoryStore, RecordStore};
use crate::models::core::Mountain;

/// Loads a corpus snapshot into a `MemoryStore`. A missing file yields an
/// empty store so a first import can bootstrap the corpus.
pub fn load(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        info!("Corpus file {} not found, starting empty", path.display());
        return Ok(MemoryStore::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file {}", path.display()))?;
    let records: Vec<Mountain> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse corpus file {}", path.display()))?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(MemoryStore::from_records(records))
}

pub async fn save(store: &MemoryStore, path: &Path) -> Result<()> {
    let records = store.fetch_all().await?;
    let text = serde_json::to_string_pretty(&records).context("Failed to serialize corpus")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, text)
        .with_context(|| format!("Failed to write corpus file {}", path.display()))?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = std::env::temp_dir().join("mountain_reconcile_store_test");
        let path = dir.join("corpus.json");
        let store = MemoryStore::from_records(vec![Mountain {
            id: "a".to_string(),
            name: "高尾山".to_string(),
            pref: "東京都".to_string(),
            ..Default::default()
        }]);
        save(&store, &path).await.unwrap();

        let reloaded = load(&path).unwrap();
        let all = reloaded.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "高尾山");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let store = load(Path::new("/nonexistent/corpus.json")).unwrap();
        assert!(store.is_empty().await);
    }
}
