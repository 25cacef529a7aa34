//! Record schema for the mountain catalog.
//!
//! The backing store grew out of loosely-typed documents, so a few fields
//! need explicit coercion rules: coordinates may arrive as text instead of
//! numbers, and amenity flags may arrive as booleans, numbers, or strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::identity::stable_id;
use crate::normalize::name::normalize_name;
use crate::normalize::region::canonical_region_join;

/// A latitude or longitude as it actually appears in the corpus.
///
/// `Text` is a data-quality defect, not a valid state: it is treated as
/// absent for merge purposes and surfaced separately for the coordinate
/// repair pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Num(f64),
    Text(String),
}

impl Coordinate {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Coordinate::Num(n) => Some(*n),
            Coordinate::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Coordinate::Text(_))
    }

    /// A text coordinate that still holds a parseable number.
    pub fn repairable(&self) -> Option<f64> {
        match self {
            Coordinate::Num(_) => None,
            Coordinate::Text(s) => {
                let parsed = s.trim().parse::<f64>().ok()?;
                parsed.is_finite().then_some(parsed)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trailhead {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One catalog record. Field names match the stored documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mountain {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_kana: Option<String>,
    #[serde(default)]
    pub pref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub purposes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub has_hut: Option<bool>,
    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub has_onsen: Option<bool>,
    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub has_ropeway: Option<bool>,
    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub has_cablecar: Option<bool>,
    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub has_tent: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailheads: Vec<Trailhead>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Mountain {
    /// The deterministic identifier this record would carry in
    /// durable-identity mode.
    pub fn derived_stable_id(&self) -> String {
        stable_id(&normalize_name(&self.name), &canonical_region_join(&self.pref))
    }

    /// Whether the record already sits at its derived stable id.
    pub fn has_stable_id(&self) -> bool {
        !self.id.is_empty() && self.id == self.derived_stable_id()
    }

    pub fn lat_f64(&self) -> Option<f64> {
        self.lat.as_ref().and_then(Coordinate::as_f64)
    }

    pub fn lng_f64(&self) -> Option<f64> {
        self.lng.as_ref().and_then(Coordinate::as_f64)
    }
}

/// One row of an incoming batch, after CSV parsing and coercion.
#[derive(Debug, Clone, Default)]
pub struct IncomingRecord {
    pub name: String,
    pub name_kana: Option<String>,
    pub pref: Option<String>,
    pub elevation: Option<u32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub level: Option<String>,
    pub tags: Vec<String>,
    pub styles: Vec<String>,
    pub purposes: Vec<String>,
    pub access: Option<String>,
    pub description: Option<String>,
    pub has_hut: Option<bool>,
    pub has_onsen: Option<bool>,
    pub has_ropeway: Option<bool>,
    pub has_cablecar: Option<bool>,
    pub has_tent: Option<bool>,
    pub trailhead: Option<Trailhead>,
}

impl IncomingRecord {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn region_join(&self) -> String {
        canonical_region_join(self.pref.as_deref().unwrap_or(""))
    }

    pub fn stable_id(&self) -> String {
        stable_id(&self.normalized_name(), &self.region_join())
    }

    pub fn is_malformed(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Deduplicates while keeping first-occurrence order. Set-valued fields
/// (tags, styles, purposes, legacy_ids) must never hold duplicates after a
/// write.
pub fn dedup_preserve(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter(|s| !s.is_empty() && seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Coerces a loosely-typed flag value: booleans, numbers, and the strings
/// "true"/"1"/"false"/"0" are accepted; anything else is absent.
pub fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn de_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_flag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinate_text_is_defect() {
        let c = Coordinate::Text("35.36".to_string());
        assert!(c.is_text());
        assert_eq!(c.as_f64(), None);
        assert_eq!(c.repairable(), Some(35.36));

        let garbage = Coordinate::Text("unknown".to_string());
        assert_eq!(garbage.repairable(), None);
    }

    #[test]
    fn test_mountain_deserializes_loose_types() {
        let m: Mountain = serde_json::from_value(json!({
            "id": "abc",
            "name": "高尾山",
            "pref": "東京都",
            "lat": "35.625",
            "lng": 139.243,
            "has_hut": 1,
            "has_onsen": "true",
            "has_ropeway": false,
            "tags": ["日本百名山"]
        }))
        .unwrap();

        assert!(m.lat.as_ref().unwrap().is_text());
        assert_eq!(m.lng_f64(), Some(139.243));
        assert_eq!(m.has_hut, Some(true));
        assert_eq!(m.has_onsen, Some(true));
        assert_eq!(m.has_ropeway, Some(false));
        assert_eq!(m.has_tent, None);
    }

    #[test]
    fn test_stable_id_idempotent_on_record() {
        let m = Mountain {
            id: String::new(),
            name: "高尾山".to_string(),
            pref: "東京都".to_string(),
            ..Default::default()
        };
        let sid = m.derived_stable_id();
        let relocated = Mountain { id: sid.clone(), ..m };
        assert!(relocated.has_stable_id());
        assert_eq!(relocated.derived_stable_id(), sid);
    }

    #[test]
    fn test_dedup_preserve_keeps_order() {
        let v = vec![
            "日本百名山".to_string(),
            "花の百名山".to_string(),
            "日本百名山".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedup_preserve(&v), vec!["日本百名山", "花の百名山"]);
    }
}
