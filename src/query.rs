//! Pure in-memory query engine: free-text search, categorical and range
//! filters, multi-type sort, and pagination over any entity collection.
//!
//! Every call re-evaluates the whole pipeline synchronously; tables top out in
//! the tens of thousands of rows, so there is no incremental evaluation. The
//! engine performs no I/O and holds no state.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::canon::{canon_id, looks_like_id};

/// Sort direction, ascending unless toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// A single comparable cell produced by an entity for a sort key. Text
/// compares case-insensitively, numbers numerically, dates chronologically.
/// `Missing` orders before any present value (so descending sorts push the
/// holes to the end).
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Missing,
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> std::cmp::Ordering {
        use SortValue::*;
        use std::cmp::Ordering;
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Missing, _) => Ordering::Less,
            (_, Missing) => Ordering::Greater,
            (Text(a), Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            // A fixed sort key never mixes variants; treat as a tie if it does.
            _ => Ordering::Equal,
        }
    }
}

/// What the engine can do to an entity collection: match it against search
/// text and filters, and produce sort cells. Implementations decide which
/// fields are searchable and which identifier fields the bare-number search
/// mode consults.
pub trait Queryable {
    /// Canonical identifier used for exact-match promotion.
    fn canonical_id(&self) -> &str;

    /// Display name; also the universal sort tiebreak.
    fn display_name(&self) -> &str;

    /// Fields scanned by free-text search.
    fn haystacks(&self) -> Vec<&str>;

    /// Identifier fields favored when the search text is a bare number.
    fn id_haystacks(&self) -> Vec<&str> {
        Vec::new()
    }

    fn category(&self) -> Option<&str> {
        None
    }

    fn amount(&self) -> Option<f64> {
        None
    }

    fn date(&self) -> Option<NaiveDateTime> {
        None
    }

    /// Sort cell for a named key. Unknown keys yield `Missing`, which leaves
    /// the name tiebreak in charge.
    fn sort_value(&self, _key: &str) -> SortValue {
        SortValue::Missing
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// One query over an entity collection. Absent members disable their
/// respective stage; `page` is 1-based.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub text: Option<String>,
    pub categories: Vec<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub sort_key: Option<String>,
    pub sort_dir: SortDir,
    pub page: usize,
    pub page_size: usize,
}

/// One page of results plus the size of the whole filtered set.
#[derive(Debug)]
pub struct QueryResult<'a, T> {
    pub items: Vec<&'a T>,
    pub total_count: usize,
}

/// Filters, sorts, and paginates `entities`. The pipeline: text search, then
/// category / amount / date filters, then a stable sort with name-ascending
/// tiebreak, then exact-id promotion, then the page slice. An entity whose
/// canonical id equals the (canonicalized) search text is moved to the front
/// of the whole filtered set, ahead of whatever the sort decided.
pub fn run_query<'a, T: Queryable>(entities: &'a [T], params: &QueryParams) -> QueryResult<'a, T> {
    let needle = params
        .text
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());
    let numeric_needle = needle.as_deref().filter(|n| looks_like_id(n));
    let exact_target = numeric_needle.map(canon_id);

    let canon_needle = exact_target.clone().unwrap_or_default();

    let mut filtered: Vec<&T> = entities
        .iter()
        .filter(|entity| match (&needle, numeric_needle) {
            (Some(_), Some(digits)) => matches_identifier(*entity, digits, &canon_needle),
            (Some(text), None) => matches_text(*entity, text),
            (None, _) => true,
        })
        .filter(|entity| matches_categories(*entity, &params.categories))
        .filter(|entity| matches_amount(*entity, params.min_amount, params.max_amount))
        .filter(|entity| matches_dates(*entity, params.from_date, params.to_date))
        .collect();

    if let Some(key) = params.sort_key.as_deref() {
        filtered.sort_by(|a, b| {
            let ordering = a.sort_value(key).compare(&b.sort_value(key));
            let directed = match params.sort_dir {
                SortDir::Asc => ordering,
                SortDir::Desc => ordering.reverse(),
            };
            directed.then_with(|| {
                a.display_name()
                    .to_lowercase()
                    .cmp(&b.display_name().to_lowercase())
            })
        });
    }

    if let Some(target) = exact_target.filter(|t| !t.is_empty()) {
        // Stable partition keeps the sorted order within each half.
        let (front, back): (Vec<&T>, Vec<&T>) = filtered
            .into_iter()
            .partition(|entity| entity.canonical_id() == target);
        filtered = front;
        filtered.extend(back);
    }

    let total_count = filtered.len();
    let page = params.page.max(1);
    let page_size = if params.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        params.page_size
    };
    let items = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    QueryResult { items, total_count }
}

fn matches_text<T: Queryable>(entity: &T, needle: &str) -> bool {
    entity
        .haystacks()
        .iter()
        .any(|hay| hay.to_lowercase().contains(needle))
}

fn matches_identifier<T: Queryable>(entity: &T, digits: &str, canon_needle: &str) -> bool {
    entity.id_haystacks().iter().any(|hay| {
        if hay.contains(digits) {
            return true;
        }
        let canon = canon_id(hay);
        canon.contains(digits) || (!canon_needle.is_empty() && canon.contains(canon_needle))
    })
}

fn matches_categories<T: Queryable>(entity: &T, categories: &[String]) -> bool {
    if categories.is_empty() {
        return true;
    }
    match entity.category() {
        Some(cat) => categories.iter().any(|c| c == cat),
        None => false,
    }
}

fn matches_amount<T: Queryable>(entity: &T, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(amount) = entity.amount() else {
        return false;
    };
    if let Some(min) = min {
        if amount < min {
            return false;
        }
    }
    if let Some(max) = max {
        if amount > max {
            return false;
        }
    }
    true
}

fn matches_dates<T: Queryable>(
    entity: &T,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    // Once any date filter is active, undated rows drop out.
    let Some(date) = entity.date() else {
        return false;
    };
    if let Some(from) = from {
        if date < from.and_time(NaiveTime::MIN) {
            return false;
        }
    }
    if let Some(to) = to {
        // Inclusive upper bound: extend to the end of the day.
        let end = to.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_else(|| {
            to.and_time(NaiveTime::MIN)
        });
        if date > end {
            return false;
        }
    }
    true
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Best-effort datetime parse over the formats seen in the source data.
/// Bare dates land on midnight. Returns `None` rather than erroring; callers
/// treat unparseable dates as absent.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Date-only parse for range bound inputs.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item {
        id: String,
        name: String,
        category: Option<String>,
        amount: Option<f64>,
        date: Option<NaiveDateTime>,
    }

    impl Item {
        fn new(id: &str, name: &str) -> Self {
            Item {
                id: canon_id(id),
                name: name.to_string(),
                category: None,
                amount: None,
                date: None,
            }
        }

        fn with_category(mut self, category: &str) -> Self {
            self.category = Some(category.to_string());
            self
        }

        fn with_amount(mut self, amount: f64) -> Self {
            self.amount = Some(amount);
            self
        }

        fn with_date(mut self, raw: &str) -> Self {
            self.date = parse_datetime(raw);
            self
        }
    }

    impl Queryable for Item {
        fn canonical_id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            &self.name
        }

        fn haystacks(&self) -> Vec<&str> {
            vec![self.name.as_str(), self.id.as_str()]
        }

        fn id_haystacks(&self) -> Vec<&str> {
            vec![self.id.as_str()]
        }

        fn category(&self) -> Option<&str> {
            self.category.as_deref()
        }

        fn amount(&self) -> Option<f64> {
            self.amount
        }

        fn date(&self) -> Option<NaiveDateTime> {
            self.date
        }

        fn sort_value(&self, key: &str) -> SortValue {
            match key {
                "name" => SortValue::Text(self.name.clone()),
                "amount" => self.amount.map(SortValue::Number).unwrap_or(SortValue::Missing),
                "date" => self.date.map(SortValue::Date).unwrap_or(SortValue::Missing),
                _ => SortValue::Missing,
            }
        }
    }

    fn names<'a>(result: &QueryResult<'a, Item>) -> Vec<&'a str> {
        result.items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn text_search_is_case_insensitive_substring() {
        let items = vec![Item::new("1", "Austin ISD"), Item::new("2", "Houston ISD")];
        let params = QueryParams {
            text: Some("aust".to_string()),
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["Austin ISD"]);
    }

    #[test]
    fn exact_id_search_promotes_over_name_sort() {
        // Scenario: searching "227901" with name-ascending sort must place the
        // exact match first even though other matches precede it alphabetically.
        let items = vec![
            Item::new("1227901", "Aardvark ISD"),
            Item::new("227901", "Austin ISD"),
            Item::new("3227901", "Abilene ISD"),
        ];
        let mut params = QueryParams {
            text: Some("227901".to_string()),
            sort_key: Some("name".to_string()),
            ..QueryParams::default()
        };
        let result = run_query(&items, &params);
        assert_eq!(names(&result)[0], "Austin ISD");

        params.sort_dir = SortDir::Desc;
        let result = run_query(&items, &params);
        assert_eq!(names(&result)[0], "Austin ISD");
    }

    #[test]
    fn numeric_needle_matches_id_containment_not_names() {
        let items = vec![
            Item::new("555123", "District 555123"),
            Item::new("9", "Campus 123 Elementary"),
        ];
        let params = QueryParams {
            text: Some("555".to_string()),
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["District 555123"]);
    }

    #[test]
    fn zero_padded_lookup_matches_via_canonicalization() {
        let items = vec![Item::new("'015901", "Alamo Heights ISD")];
        let params = QueryParams {
            text: Some("015901".to_string()),
            ..QueryParams::default()
        };
        let result = run_query(&items, &params);
        assert_eq!(result.total_count, 1);
        assert_eq!(names(&result)[0], "Alamo Heights ISD");
    }

    #[test]
    fn category_filter_is_or_combined() {
        let items = vec![
            Item::new("1", "a").with_category("Payroll"),
            Item::new("2", "b").with_category("Supplies"),
            Item::new("3", "c").with_category("Transport"),
            Item::new("4", "d"),
        ];
        let params = QueryParams {
            categories: vec!["Payroll".to_string(), "Transport".to_string()],
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["a", "c"]);
    }

    #[test]
    fn amount_range_is_inclusive_and_one_sided() {
        let items = vec![
            Item::new("1", "a").with_amount(10.0),
            Item::new("2", "b").with_amount(20.0),
            Item::new("3", "c").with_amount(30.0),
        ];
        let params = QueryParams {
            min_amount: Some(20.0),
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["b", "c"]);

        let params = QueryParams {
            min_amount: Some(10.0),
            max_amount: Some(20.0),
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["a", "b"]);
    }

    #[test]
    fn date_range_upper_bound_extends_to_end_of_day() {
        // Scenario: Jan 1 – Jan 31 includes 23:00 on the 31st, excludes one
        // second past midnight on Feb 1.
        let items = vec![
            Item::new("1", "late january").with_date("2024-01-31T23:00:00"),
            Item::new("2", "early february").with_date("2024-02-01T00:00:01"),
            Item::new("3", "undated"),
        ];
        let params = QueryParams {
            from_date: parse_date("2024-01-01"),
            to_date: parse_date("2024-01-31"),
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["late january"]);
    }

    #[test]
    fn sort_is_stable_with_name_tiebreak() {
        let items = vec![
            Item::new("1", "zeta").with_amount(5.0),
            Item::new("2", "alpha").with_amount(5.0),
            Item::new("3", "mid").with_amount(3.0),
        ];
        let params = QueryParams {
            sort_key: Some("amount".to_string()),
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["mid", "alpha", "zeta"]);

        let params = QueryParams {
            sort_key: Some("amount".to_string()),
            sort_dir: SortDir::Desc,
            ..QueryParams::default()
        };
        assert_eq!(names(&run_query(&items, &params)), vec!["alpha", "zeta", "mid"]);
    }

    #[test]
    fn pagination_slices_the_sorted_whole() {
        let items: Vec<Item> = (1..=7)
            .map(|i| Item::new(&format!("{i}"), &format!("name{i}")).with_amount(i as f64))
            .collect();
        let params = QueryParams {
            sort_key: Some("amount".to_string()),
            page: 2,
            page_size: 3,
            ..QueryParams::default()
        };
        let result = run_query(&items, &params);
        assert_eq!(result.total_count, 7);
        assert_eq!(names(&result), vec!["name4", "name5", "name6"]);
    }

    #[test]
    fn out_of_range_page_is_empty_not_error() {
        let items = vec![Item::new("1", "only")];
        let params = QueryParams {
            page: 9,
            page_size: 10,
            ..QueryParams::default()
        };
        let result = run_query(&items, &params);
        assert_eq!(result.total_count, 1);
        assert!(result.items.is_empty());
    }

    #[test]
    fn parse_datetime_accepts_dates_and_timestamps() {
        assert!(parse_datetime("2024-01-31").is_some());
        assert!(parse_datetime("2024-01-31T23:00:00").is_some());
        assert!(parse_datetime("01/31/2024").is_some());
        assert!(parse_datetime("soon").is_none());
        assert!(parse_datetime("").is_none());
    }
}
