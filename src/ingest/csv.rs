//! CSV batch reader.
//!
//! Rows with no resolvable name are kept (as malformed) rather than dropped
//! so the import pass can count them; parsing never aborts a batch.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use serde_json::Value;

use crate::models::core::{coerce_flag, dedup_preserve, IncomingRecord, Trailhead};

/// Known header spellings, canonical name first.
const HEADER_ALIASES: &[(&str, &[&str])] = &[
    ("name", &["name", "mountain_name", "山名", "山岳名", "名称"]),
    ("name_kana", &["name_kana", "kana", "よみがな", "ふりがな", "読み"]),
    ("pref", &["pref", "prefecture", "所在地", "都道府県", "県"]),
    ("elevation", &["elevation", "elevation_m", "標高", "標高m"]),
    ("lat", &["lat", "latitude", "緯度"]),
    ("lng", &["lng", "lon", "longitude", "経度"]),
    ("level", &["level", "grade", "難易度"]),
    ("tags", &["tags", "tag", "タグ"]),
    ("styles", &["styles", "style"]),
    ("purposes", &["purposes", "purpose"]),
    ("access", &["access", "アクセス"]),
    ("description", &["description", "概要", "説明"]),
    ("has_hut", &["has_hut", "hut", "山小屋"]),
    ("has_onsen", &["has_onsen", "onsen", "温泉"]),
    ("has_ropeway", &["has_ropeway", "ropeway", "ロープウェイ"]),
    ("has_cablecar", &["has_cablecar", "cablecar", "ケーブルカー"]),
    ("has_tent", &["has_tent", "tent", "テント場"]),
    ("trailhead_name", &["trailhead_name", "trailhead", "登山口"]),
    ("trailhead_lat", &["trailhead_lat", "登山口緯度"]),
    ("trailhead_lng", &["trailhead_lng", "登山口経度"]),
];

/// One parsed row, keeping the 1-based data row number for reporting.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub row_number: usize,
    pub record: IncomingRecord,
}

pub fn read_batch(path: &Path) -> Result<Vec<ParsedRow>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open batch CSV {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers from {}", path.display()))?
        .clone();
    let columns = resolve_headers(&headers);
    if !columns.contains_key("name") {
        anyhow::bail!(
            "No name column found in {} (headers: {:?})",
            path.display(),
            headers
        );
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row_number = i + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // A torn row still counts against the batch.
                warn!("⚠️ Row {}: unreadable CSV record: {}", row_number, e);
                rows.push(ParsedRow {
                    row_number,
                    record: IncomingRecord::default(),
                });
                continue;
            }
        };
        rows.push(ParsedRow {
            row_number,
            record: parse_row(&record, &columns),
        });
    }
    debug!("Parsed {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Maps canonical field names to column indices. The first header cell may
/// carry a UTF-8 BOM from spreadsheet exports.
fn resolve_headers(headers: &StringRecord) -> HashMap<&'static str, usize> {
    let mut out = HashMap::new();
    for (idx, raw) in headers.iter().enumerate() {
        let cell = raw.trim_start_matches('\u{feff}').trim().to_lowercase();
        for (canonical, aliases) in HEADER_ALIASES {
            if aliases.iter().any(|a| *a == cell) {
                out.entry(*canonical).or_insert(idx);
            }
        }
    }
    out
}

fn parse_row(record: &StringRecord, columns: &HashMap<&'static str, usize>) -> IncomingRecord {
    let field = |name: &str| -> Option<&str> {
        columns
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let string_field = |name: &str| field(name).map(str::to_string);
    let flag_field =
        |name: &str| field(name).and_then(|s| coerce_flag(&Value::String(s.to_string())));

    let trailhead = field("trailhead_name").map(|name| Trailhead {
        name: name.to_string(),
        lat: field("trailhead_lat").and_then(parse_coord),
        lng: field("trailhead_lng").and_then(parse_coord),
        source: None,
    });

    IncomingRecord {
        name: field("name").unwrap_or_default().to_string(),
        name_kana: string_field("name_kana"),
        pref: string_field("pref"),
        elevation: field("elevation").and_then(parse_elevation),
        lat: field("lat").and_then(parse_coord),
        lng: field("lng").and_then(parse_coord),
        level: string_field("level"),
        tags: list_field(field("tags")),
        styles: list_field(field("styles")),
        purposes: list_field(field("purposes")),
        access: string_field("access"),
        description: string_field("description"),
        has_hut: flag_field("has_hut"),
        has_onsen: flag_field("has_onsen"),
        has_ropeway: flag_field("has_ropeway"),
        has_cablecar: flag_field("has_cablecar"),
        has_tent: flag_field("has_tent"),
        trailhead,
    }
}

fn parse_coord(s: &str) -> Option<f64> {
    let parsed = s.parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

fn parse_elevation(s: &str) -> Option<u32> {
    // Exports sometimes write "3,776" or "3776m".
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    cleaned.parse::<u32>().ok()
}

/// Multi-valued cells are pipe- or dot-separated lists.
fn list_field(cell: Option<&str>) -> Vec<String> {
    let Some(cell) = cell else {
        return Vec::new();
    };
    let parts: Vec<String> = cell
        .split(['|', '・', '、', ';'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    dedup_preserve(&parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> tempfile_path::TempCsv {
        tempfile_path::TempCsv::new(content)
    }

    // Minimal scratch-file helper so tests do not depend on a tempdir crate.
    mod tempfile_path {
        use std::path::PathBuf;

        pub struct TempCsv(pub PathBuf);

        impl TempCsv {
            pub fn new(content: &str) -> Self {
                let path = std::env::temp_dir().join(format!(
                    "reconcile-ingest-{}-{}.csv",
                    std::process::id(),
                    uuid::Uuid::new_v4()
                ));
                std::fs::write(&path, content).unwrap();
                Self(path)
            }
        }

        impl Drop for TempCsv {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    #[test]
    fn test_japanese_headers_resolve() {
        let csv = write_csv("山名,よみがな,所在地,標高\n高尾山,たかおさん,東京都,599\n");
        let rows = read_batch(&csv.0).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0].record;
        assert_eq!(r.name, "高尾山");
        assert_eq!(r.name_kana.as_deref(), Some("たかおさん"));
        assert_eq!(r.pref.as_deref(), Some("東京都"));
        assert_eq!(r.elevation, Some(599));
    }

    #[test]
    fn test_bom_on_first_header_is_stripped() {
        let mut content = String::new();
        content.push('\u{feff}');
        content.push_str("name,pref\n富士山,静岡県・山梨県\n");
        let csv = write_csv(&content);
        let rows = read_batch(&csv.0).unwrap();
        assert_eq!(rows[0].record.name, "富士山");
    }

    #[test]
    fn test_flags_and_lists_coerce() {
        let csv = write_csv(
            "name,tags,has_hut,has_onsen,has_tent,lat\n\
             立山,日本百名山|花の百名山|日本百名山,1,false,maybe,36.5728\n",
        );
        let rows = read_batch(&csv.0).unwrap();
        let r = &rows[0].record;
        assert_eq!(r.tags, vec!["日本百名山", "花の百名山"]);
        assert_eq!(r.has_hut, Some(true));
        assert_eq!(r.has_onsen, Some(false));
        assert_eq!(r.has_tent, None);
        assert_eq!(r.lat, Some(36.5728));
    }

    #[test]
    fn test_nameless_row_kept_as_malformed() {
        let csv = write_csv("name,pref\n高尾山,東京都\n,東京都\n");
        let rows = read_batch(&csv.0).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].record.is_malformed());
        assert!(rows[1].record.is_malformed());
        assert_eq!(rows[1].row_number, 2);
    }

    #[test]
    fn test_trailhead_columns() {
        let csv = write_csv(
            "name,登山口,trailhead_lat,trailhead_lng\n谷川岳,土合口,36.8380,138.9310\n",
        );
        let rows = read_batch(&csv.0).unwrap();
        let th = rows[0].record.trailhead.as_ref().unwrap();
        assert_eq!(th.name, "土合口");
        assert_eq!(th.lat, Some(36.8380));
    }

    #[test]
    fn test_missing_name_column_is_an_error() {
        let csv = write_csv("pref,elevation\n東京都,599\n");
        assert!(read_batch(&csv.0).is_err());
    }

    #[test]
    fn test_elevation_with_formatting() {
        let csv = write_csv("name,elevation\n富士山,\"3,776m\"\n");
        let rows = read_batch(&csv.0).unwrap();
        assert_eq!(rows[0].record.elevation, Some(3776));
    }
}
