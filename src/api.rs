//! Client for the optional backend JSON API.
//!
//! The backend's path prefix is not fixed across deployments, so it is probed
//! once per process against a small candidate list by requesting the
//! read-only districts listing. Response shapes are loosely specified and
//! drift between revisions; every field is optional and identifiers may
//! arrive as strings or numbers.

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{canon::canon_id, fetch::FetchError, fetch::Fetcher, geo::FeatureCollection};

const CANDIDATE_PREFIXES: &[&str] = &["", "/api", "/v1", "/api/v1", "/v1/api"];

pub struct ApiClient {
    base: String,
    fetcher: Fetcher,
    // Detected once per process; the only cross-call cached string.
    prefix: OnceCell<&'static str>,
}

impl ApiClient {
    pub fn new(base: &str, fetcher: Fetcher) -> Self {
        ApiClient {
            base: base.trim_end_matches('/').to_string(),
            fetcher,
            prefix: OnceCell::new(),
        }
    }

    /// The detected path prefix, probing on first use. Candidates are tried
    /// in order; the first that answers `/districts` with parseable JSON
    /// wins. When none match, the empty prefix is kept so later requests
    /// surface their real errors.
    pub async fn prefix(&self) -> &str {
        *self
            .prefix
            .get_or_init(|| async {
                for candidate in CANDIDATE_PREFIXES {
                    let url = format!("{}{}/districts", self.base, candidate);
                    if self
                        .fetcher
                        .json::<Value>(&url)
                        .await
                        .is_ok()
                    {
                        return *candidate;
                    }
                }
                ""
            })
            .await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let prefix = self.prefix().await;
        let url = format!("{}{}{}", self.base, prefix, path);
        self.fetcher.json(&url).await
    }

    pub async fn list_districts(&self) -> Result<Vec<ApiDistrict>, FetchError> {
        let listing: DistrictListing = self.get("/districts").await?;
        Ok(listing.into_vec())
    }

    pub async fn district(&self, raw_id: &str) -> Result<ApiDistrict, FetchError> {
        self.get(&format!("/districts/{}", canon_id(raw_id))).await
    }

    pub async fn campus(&self, raw_id: &str) -> Result<ApiCampus, FetchError> {
        self.get(&format!("/campuses/{}", canon_id(raw_id))).await
    }

    pub async fn state_stats(&self) -> Result<ApiStateStats, FetchError> {
        self.get("/stats/state").await
    }

    pub async fn districts_geojson(&self) -> Result<FeatureCollection, FetchError> {
        self.get("/geojson/districts").await
    }
}

/// The listing endpoint answers either a bare array or a wrapped object,
/// depending on backend revision.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DistrictListing {
    Plain(Vec<ApiDistrict>),
    Wrapped { districts: Vec<ApiDistrict> },
}

impl DistrictListing {
    fn into_vec(self) -> Vec<ApiDistrict> {
        match self {
            DistrictListing::Plain(list) => list,
            DistrictListing::Wrapped { districts } => districts,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiDistrict {
    #[serde(default, alias = "district_id", alias = "district_n")]
    pub id: Option<Value>,
    #[serde(default, alias = "district_name")]
    pub name: Option<String>,
    #[serde(default, alias = "county_name")]
    pub county: Option<String>,
    #[serde(default, alias = "spending")]
    pub total_spending: Option<f64>,
    #[serde(default, alias = "students")]
    pub enrollment: Option<f64>,
}

impl ApiDistrict {
    pub fn canonical_id(&self) -> Option<String> {
        let text = value_text(self.id.as_ref()?)?;
        let id = canon_id(&text);
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCampus {
    #[serde(default, alias = "campus_id", alias = "campus_number")]
    pub id: Option<Value>,
    #[serde(default, alias = "campus_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub district_id: Option<Value>,
    #[serde(default, alias = "campus_score")]
    pub score: Option<f64>,
    #[serde(default, alias = "campus_grade")]
    pub grade: Option<String>,
}

impl ApiCampus {
    pub fn canonical_id(&self) -> Option<String> {
        let text = value_text(self.id.as_ref()?)?;
        let id = canon_id(&text);
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStateStats {
    #[serde(default, alias = "district_count")]
    pub districts: Option<u64>,
    #[serde(default, alias = "campus_count")]
    pub campuses: Option<u64>,
    #[serde(default, alias = "total_spending_sum")]
    pub total_spending: Option<f64>,
    #[serde(default, alias = "enrollment_total")]
    pub enrollment: Option<f64>,
    #[serde(default, alias = "per_student_spending_avg")]
    pub per_student_spending: Option<f64>,
}
