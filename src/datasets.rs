//! Dataset assembly: parsed tables joined with their resolved field maps,
//! canonical-id indexes, and the entity views the query engine runs over.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use itertools::Itertools;
use log::info;
use serde_json::{Map, Value};

use crate::{
    canon::canon_id,
    fields::{self, CampusFields, DistrictFields, SpendingFields},
    geo::{Feature, FeatureCollection},
    index::EntityIndex,
    query::{Queryable, SortValue, parse_datetime},
    stats::{self, PerStudentSpending, StatSummary, parse_amount},
    tabular::{RawTable, parse_csv},
};

/// The district dataset: table, field resolution, canonical index, sorted
/// county list, and the statewide summary (fixed per-student mode; callers
/// wanting the computed mode re-aggregate, which is cheap and pure).
#[derive(Debug, Clone)]
pub struct DistrictTable {
    pub table: RawTable,
    pub fields: DistrictFields,
    pub index: EntityIndex,
    pub counties: Vec<String>,
    pub stats: StatSummary,
}

impl DistrictTable {
    pub fn from_csv(text: &str) -> Self {
        let table = parse_csv(text);
        let fields = DistrictFields::detect(&table.headers);
        let index = EntityIndex::build(&table, fields.id, None);
        let counties = table
            .rows
            .iter()
            .filter_map(|row| table.cell(row, fields.county))
            .map(|county| county.to_string())
            .sorted()
            .dedup()
            .collect();
        let stats = stats::aggregate(&table, &fields, PerStudentSpending::Fixed);
        info!(
            "loaded {} district row(s), {} indexed id(s)",
            table.len(),
            index.id_count()
        );
        DistrictTable {
            table,
            fields,
            index,
            counties,
            stats,
        }
    }

    /// Row for a raw identifier in any textual shape, or `None` when absent.
    pub fn find(&self, raw_id: &str) -> Option<&Vec<String>> {
        let row_idx = self.index.get(&canon_id(raw_id))?;
        self.table.rows.get(row_idx)
    }

    /// Owned entity views for searching/sorting the district list.
    pub fn entities(&self) -> Vec<DistrictEntity> {
        self.table
            .rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = |column| {
                    self.table
                        .cell(cells, column)
                        .unwrap_or_default()
                        .to_string()
                };
                let numeric =
                    |column| self.table.cell(cells, column).and_then(parse_amount);
                DistrictEntity {
                    raw_id: cell(self.fields.id),
                    canonical_id: canon_id(&cell(self.fields.id)),
                    name: cell(self.fields.name),
                    county: cell(self.fields.county),
                    enrollment: numeric(self.fields.enrollment),
                    total_spending: numeric(self.fields.total_spending),
                    row,
                }
            })
            .collect()
    }
}

/// One district as the query engine sees it.
#[derive(Debug, Clone)]
pub struct DistrictEntity {
    pub canonical_id: String,
    pub raw_id: String,
    pub name: String,
    pub county: String,
    pub enrollment: Option<f64>,
    pub total_spending: Option<f64>,
    pub row: usize,
}

impl Queryable for DistrictEntity {
    fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn haystacks(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.raw_id.as_str(), self.county.as_str()]
    }

    fn id_haystacks(&self) -> Vec<&str> {
        vec![self.raw_id.as_str()]
    }

    /// County doubles as the categorical filter dimension for districts.
    fn category(&self) -> Option<&str> {
        (!self.county.is_empty()).then_some(self.county.as_str())
    }

    fn amount(&self) -> Option<f64> {
        self.enrollment
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "name" => SortValue::Text(self.name.clone()),
            "county" => SortValue::Text(self.county.clone()),
            "enrollment" => self
                .enrollment
                .map(SortValue::Number)
                .unwrap_or(SortValue::Missing),
            "spending" => self
                .total_spending
                .map(SortValue::Number)
                .unwrap_or(SortValue::Missing),
            _ => SortValue::Missing,
        }
    }
}

/// The campus dataset, grouped under districts by canonical id.
#[derive(Debug, Clone)]
pub struct CampusTable {
    pub table: RawTable,
    pub fields: CampusFields,
    pub index: EntityIndex,
}

impl CampusTable {
    pub fn from_csv(text: &str) -> Self {
        let table = parse_csv(text);
        let fields = CampusFields::detect(&table.headers);
        let index = EntityIndex::build(&table, fields.campus_id, fields.district_id);
        info!(
            "loaded {} campus row(s) across {} district group(s)",
            table.len(),
            index.parent_count()
        );
        CampusTable {
            table,
            fields,
            index,
        }
    }

    pub fn find(&self, raw_id: &str) -> Option<&Vec<String>> {
        let row_idx = self.index.get(&canon_id(raw_id))?;
        self.table.rows.get(row_idx)
    }

    fn entity(&self, row: usize) -> Option<CampusEntity> {
        let cells = self.table.rows.get(row)?;
        let cell = |column| {
            self.table
                .cell(cells, column)
                .unwrap_or_default()
                .to_string()
        };
        let raw_id = cell(self.fields.campus_id);
        let district_raw = cell(self.fields.district_id);
        let score = self
            .table
            .cell(cells, self.fields.campus_score)
            .and_then(score_value);
        // Effective letter grade: the dataset's own grade column when it has
        // one, otherwise derived from the numeric score.
        let grade = self
            .table
            .cell(cells, self.fields.campus_grade)
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .or_else(|| score.map(|s| grade_from_score(s).to_string()));
        Some(CampusEntity {
            canonical_id: canon_id(&raw_id),
            raw_id,
            name: cell(self.fields.campus_name),
            district_canonical: canon_id(&district_raw),
            district_raw,
            district_name: cell(self.fields.district_name),
            score,
            grade,
            row,
        })
    }

    pub fn entities(&self) -> Vec<CampusEntity> {
        (0..self.table.len()).filter_map(|row| self.entity(row)).collect()
    }

    /// Campuses belonging to a district, ordered by campus score descending
    /// with unscored campuses last (source order breaking ties).
    pub fn for_district(&self, raw_district_id: &str) -> Vec<CampusEntity> {
        let mut campuses: Vec<CampusEntity> = self
            .index
            .children(&canon_id(raw_district_id))
            .iter()
            .filter_map(|&row| self.entity(row))
            .collect();
        campuses.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        campuses
    }

    /// Synthesizes campus Point features for a district from CSV lat/lon
    /// columns. `None` when coordinates are undetectable or no campus in the
    /// district carries a usable pair.
    pub fn point_features(&self, raw_district_id: &str) -> Option<FeatureCollection> {
        let lat = fields::resolve_header(&self.table.headers, &fields::LATITUDE)?;
        let lon = fields::resolve_header(&self.table.headers, &fields::LONGITUDE)?;
        let features: Vec<Feature> = self
            .index
            .children(&canon_id(raw_district_id))
            .iter()
            .filter_map(|&row| {
                let cells = self.table.rows.get(row)?;
                let latitude: f64 = self.table.cell(cells, Some(lat))?.trim().parse().ok()?;
                let longitude: f64 = self.table.cell(cells, Some(lon))?.trim().parse().ok()?;
                let mut props = Map::new();
                for (key, column) in [
                    ("CAMPUS_ID", self.fields.campus_id),
                    ("CAMPUS_NAME", self.fields.campus_name),
                    ("CAMPUS_SCORE", self.fields.campus_score),
                ] {
                    let value = self.table.cell(cells, column).unwrap_or_default();
                    props.insert(key.to_string(), Value::String(value.to_string()));
                }
                Some(Feature::point(longitude, latitude, props))
            })
            .collect();
        if features.is_empty() {
            None
        } else {
            Some(FeatureCollection::from_features(features))
        }
    }
}

/// One campus as the query engine sees it. `grade` is the effective letter
/// grade (dataset column first, score-derived otherwise).
#[derive(Debug, Clone)]
pub struct CampusEntity {
    pub canonical_id: String,
    pub raw_id: String,
    pub name: String,
    pub district_canonical: String,
    pub district_raw: String,
    pub district_name: String,
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub row: usize,
}

impl Queryable for CampusEntity {
    fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn haystacks(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.raw_id.as_str(),
            self.district_raw.as_str(),
            self.district_name.as_str(),
        ]
    }

    fn id_haystacks(&self) -> Vec<&str> {
        vec![self.raw_id.as_str(), self.district_raw.as_str()]
    }

    fn category(&self) -> Option<&str> {
        self.grade.as_deref()
    }

    fn amount(&self) -> Option<f64> {
        self.score
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "name" => SortValue::Text(self.name.clone()),
            "district" => SortValue::Text(self.district_name.clone()),
            "score" => self.score.map(SortValue::Number).unwrap_or(SortValue::Missing),
            _ => SortValue::Missing,
        }
    }
}

/// Numeric score from a raw cell that may carry stray annotation characters.
fn score_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Letter grade thresholds used when a dataset has scores but no grades.
pub fn grade_from_score(score: f64) -> char {
    if score >= 90.0 {
        'A'
    } else if score >= 80.0 {
        'B'
    } else if score >= 70.0 {
        'C'
    } else if score >= 60.0 {
        'D'
    } else {
        'F'
    }
}

/// One spending line item, normalized at load: canonical district id, parsed
/// date (kept alongside the raw text), and a numeric amount with the
/// original's empty-means-zero behavior.
#[derive(Debug, Clone)]
pub struct SpendingRecord {
    pub district: String,
    pub district_raw: String,
    pub date_raw: String,
    pub date: Option<NaiveDateTime>,
    pub vendor: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
}

impl Queryable for SpendingRecord {
    fn canonical_id(&self) -> &str {
        &self.district
    }

    fn display_name(&self) -> &str {
        &self.vendor
    }

    fn haystacks(&self) -> Vec<&str> {
        vec![
            self.vendor.as_str(),
            self.description.as_str(),
            self.category.as_str(),
        ]
    }

    fn id_haystacks(&self) -> Vec<&str> {
        vec![self.district_raw.as_str()]
    }

    fn category(&self) -> Option<&str> {
        (!self.category.is_empty()).then_some(self.category.as_str())
    }

    fn amount(&self) -> Option<f64> {
        Some(self.amount)
    }

    fn date(&self) -> Option<NaiveDateTime> {
        self.date
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "date" => self.date.map(SortValue::Date).unwrap_or(SortValue::Missing),
            "amount" => SortValue::Number(self.amount),
            "vendor" => SortValue::Text(self.vendor.clone()),
            "category" => SortValue::Text(self.category.clone()),
            _ => SortValue::Missing,
        }
    }
}

/// The spending dataset: normalized records grouped by canonical district id,
/// plus the distinct category list the filter UI offers.
#[derive(Debug, Clone)]
pub struct SpendingTable {
    pub headers: Vec<String>,
    pub records: Vec<SpendingRecord>,
    pub by_district: HashMap<String, Vec<usize>>,
    pub categories: Vec<String>,
    pub fields: SpendingFields,
}

impl SpendingTable {
    pub fn from_csv(text: &str) -> Self {
        let table = parse_csv(text);
        let fields = SpendingFields::detect(&table.headers);

        let records: Vec<SpendingRecord> = table
            .rows
            .iter()
            .map(|cells| {
                let cell = |column| {
                    table.cell(cells, column).unwrap_or_default().to_string()
                };
                let district_raw = cell(fields.district_id);
                let date_raw = cell(fields.date);
                SpendingRecord {
                    district: canon_id(&district_raw),
                    district_raw,
                    date: parse_datetime(&date_raw),
                    date_raw,
                    vendor: cell(fields.vendor),
                    category: cell(fields.category),
                    amount: table
                        .cell(cells, fields.amount)
                        .and_then(parse_amount)
                        .unwrap_or(0.0),
                    description: cell(fields.description),
                }
            })
            .collect();

        let mut by_district: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if !record.district.is_empty() {
                by_district.entry(record.district.clone()).or_default().push(idx);
            }
        }

        let categories = records
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .sorted()
            .dedup()
            .collect();

        info!(
            "loaded {} spending record(s) across {} district(s)",
            records.len(),
            by_district.len()
        );
        SpendingTable {
            headers: table.headers,
            records,
            by_district,
            categories,
            fields,
        }
    }

    /// Line items for a district in source order.
    pub fn for_district(&self, raw_district_id: &str) -> Vec<&SpendingRecord> {
        self.by_district
            .get(&canon_id(raw_district_id))
            .map(|rows| rows.iter().map(|&idx| &self.records[idx]).collect())
            .unwrap_or_default()
    }
}
