//! GeoJSON feature matching by canonical identifier.
//!
//! Boundary and point files carry the same loosely-named identifiers as the
//! CSV tables, tucked into each feature's `properties` bag. The id property
//! key is resolved once per collection with the same alias/fuzzy strategy as
//! CSV headers, then features are matched by canonical-id equality.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    canon::canon_id,
    fields::{FieldSpec, resolve_header},
};

/// Candidate id property keys on district boundary features.
pub const GEO_DISTRICT_ID: FieldSpec = FieldSpec {
    label: "DISTRICT_ID",
    aliases: &[
        "DISTRICT_N",
        "DISTRICT_ID",
        "LEAID",
        "LEA",
        "USER_District_Number",
    ],
    fuzzy: &[r"district.*(number|id|code)"],
};

/// Candidate id property keys on campus point features.
pub const GEO_CAMPUS_ID: FieldSpec = FieldSpec {
    label: "CAMPUS_ID",
    aliases: &[
        "CAMPUS_ID",
        "USER_School_Number",
        "USER_Campus_Number",
        "SCHOOL_NUMBER",
        "School Number",
    ],
    fuzzy: &[r"campus.*(id|number)", r"school.*(id|number)"],
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_kind")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Value,
}

fn feature_collection_kind() -> String {
    "FeatureCollection".to_string()
}

fn feature_kind() -> String {
    "Feature".to_string()
}

impl FeatureCollection {
    pub fn from_features(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: feature_collection_kind(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Feature {
    /// A point feature with the given coordinates and properties.
    pub fn point(longitude: f64, latitude: f64, properties: Map<String, Value>) -> Self {
        let mut geometry = Map::new();
        geometry.insert("type".to_string(), Value::String("Point".to_string()));
        geometry.insert(
            "coordinates".to_string(),
            Value::Array(vec![longitude.into(), latitude.into()]),
        );
        Feature {
            kind: feature_kind(),
            properties,
            geometry: Value::Object(geometry),
        }
    }

    fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Resolves the identifier property key for a collection by running the
/// header resolver over the first feature's property keys. `None` when the
/// collection is empty or nothing plausible exists.
pub fn resolve_id_property(collection: &FeatureCollection, spec: &FieldSpec) -> Option<String> {
    let first = collection
        .features
        .iter()
        .find(|f| !f.properties.is_empty())?;
    let keys: Vec<String> = first.properties.keys().cloned().collect();
    resolve_header(&keys, spec).map(|idx| keys[idx].clone())
}

/// First feature whose resolved id property canonicalizes to `canonical_id`,
/// scanning in collection order. `None` is the "no geometry available" case,
/// never an error.
pub fn find_feature<'a>(
    collection: &'a FeatureCollection,
    spec: &FieldSpec,
    canonical_id: &str,
) -> Option<&'a Feature> {
    if canonical_id.is_empty() {
        return None;
    }
    let key = resolve_id_property(collection, spec)?;
    collection
        .features
        .iter()
        .find(|f| matches!(f.property_text(&key), Some(v) if canon_id(&v) == canonical_id))
}

/// All features whose resolved id property canonicalizes to `canonical_id`,
/// in collection order. Used to pull a district's campus points out of a
/// statewide point file.
pub fn filter_features(
    collection: &FeatureCollection,
    spec: &FieldSpec,
    canonical_id: &str,
) -> FeatureCollection {
    let matched = resolve_id_property(collection, spec)
        .map(|key| {
            collection
                .features
                .iter()
                .filter(|f| matches!(f.property_text(&key), Some(v) if canon_id(&v) == canonical_id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    FeatureCollection::from_features(matched)
}
