//! Heuristic header resolution.
//!
//! Dataset revisions rename columns freely: `DISTRICT_N`, `District Number`,
//! `USER_District_Number`, and `district-id` all mean the same thing. Each
//! logical field carries an ordered exact-alias list plus ordered fallback
//! regex patterns; [`resolve_header`] maps the field onto the one real column
//! that best represents it, or reports that the field is undetectable.
//!
//! Resolution is deterministic and runs once per dataset load; the resulting
//! field maps ride along with the cached table.

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static DEDUP_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d+$").expect("dedup suffix pattern"));

/// One logical field: a display label, exact candidate headers in priority
/// order, and fallback patterns in priority order. Alias matching is
/// case- and punctuation-insensitive; patterns run case-insensitively against
/// the raw header text.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub label: &'static str,
    pub aliases: &'static [&'static str],
    pub fuzzy: &'static [&'static str],
}

/// Collapses a header to its comparable form: the provider de-duplication
/// suffix (`-1`, `-2`, ...) is dropped, then everything but ASCII
/// alphanumerics, lower-cased.
pub fn normalize_header(name: &str) -> String {
    let base = DEDUP_SUFFIX.replace(name, "");
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Picks the column for one logical field. Exact aliases win in declared
/// order; when none hits, fuzzy patterns are tried in declared order, each
/// scanning the headers in source order. The first occurrence of a normalized
/// header wins when duplicates collapse to the same form. Returns the column
/// index, or `None` when the field is not detectable in this dataset.
pub fn resolve_header(headers: &[String], spec: &FieldSpec) -> Option<usize> {
    let mut by_norm: HashMap<String, usize> = HashMap::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        by_norm.entry(normalize_header(header)).or_insert(idx);
    }

    for alias in spec.aliases {
        if let Some(&idx) = by_norm.get(&normalize_header(alias)) {
            return Some(idx);
        }
    }

    for pattern in spec.fuzzy {
        let regex = match Regex::new(&format!("(?i){pattern}")) {
            Ok(regex) => regex,
            Err(err) => {
                debug!("skipping malformed pattern '{pattern}' for {}: {err}", spec.label);
                continue;
            }
        };
        if let Some(idx) = headers.iter().position(|h| regex.is_match(h)) {
            return Some(idx);
        }
    }

    None
}

macro_rules! field_map {
    ($(#[$meta:meta])* $name:ident { $($slot:ident => $spec:expr,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            $(pub $slot: Option<usize>,)+
        }

        impl $name {
            /// Resolves every logical field against the dataset's headers.
            pub fn detect(headers: &[String]) -> Self {
                Self {
                    $($slot: resolve_header(headers, &$spec),)+
                }
            }

            /// Label / resolved-header pairs for reporting, in field order.
            pub fn describe<'a>(&self, headers: &'a [String]) -> Vec<(&'static str, Option<&'a str>)> {
                vec![
                    $(($spec.label, self.$slot.and_then(|idx| headers.get(idx)).map(|h| h.as_str())),)+
                ]
            }
        }
    };
}

pub const DISTRICT_ID: FieldSpec = FieldSpec {
    label: "DISTRICT_ID",
    aliases: &["DISTRICT_N", "DISTRICT_ID", "DISTRICTCODE", "ID"],
    fuzzy: &[r"district.*(number|id|code)"],
};

pub const DISTRICT_NAME: FieldSpec = FieldSpec {
    label: "NAME",
    aliases: &["NAME", "DISTRICT_NAME", "DISTRICT", "DISTNAME"],
    fuzzy: &[r"district.*name", r"distname"],
};

pub const DISTRICT_COUNTY: FieldSpec = FieldSpec {
    label: "COUNTY",
    aliases: &["COUNTY", "COUNTY_NAME"],
    fuzzy: &[r"county"],
};

pub const TOTAL_SPENDING: FieldSpec = FieldSpec {
    label: "TOTAL_SPENDING",
    aliases: &[
        "Total Spending",
        "TOTAL_SPENDING",
        "TOTAL EXPENDITURES",
        "TOTAL_EXPENDITURES",
        "TOTAL OUTLAYS",
        "TOTAL_OUTLAYS",
        "SPENDING_TOTAL",
        "EXPENDITURES_TOTAL",
        "TOTAL_EXPENSE",
        "TOTAL_EXPENSES",
    ],
    fuzzy: &[r"total.*(spend|expend|outlay)", r"(spend|expend).*total"],
};

pub const ENROLLMENT: FieldSpec = FieldSpec {
    label: "ENROLLMENT",
    aliases: &[
        "Enrollment",
        "ENROLLMENT",
        "TOTAL_ENROLLMENT",
        "STUDENTS",
        "TOTAL_STUDENTS",
    ],
    fuzzy: &[r"enroll", r"student"],
};

pub const DISTRICT_DEBT: FieldSpec = FieldSpec {
    label: "DISTRICT_DEBT",
    // "Distrit Debt" is a real header typo in a published revision.
    aliases: &[
        "Distrit Debt",
        "District Debt",
        "TOTAL_DEBT",
        "DEBT_TOTAL",
        "OUTSTANDING_DEBT",
        "DEBT OUTSTANDING",
        "DEBT_OUTSTANDING",
    ],
    fuzzy: &[r"(district|total|outstanding).*debt", r"debt.*(total|outstanding)"],
};

pub const PER_PUPIL_DEBT: FieldSpec = FieldSpec {
    label: "PER_PUPIL_DEBT",
    aliases: &[
        "Per-Pupil Debt",
        "PER_PUPIL_DEBT",
        "DEBT_PER_STUDENT",
        "DEBT PER STUDENT",
    ],
    fuzzy: &[r"per.*(pupil|student).*debt", r"debt.*per.*(pupil|student)"],
};

pub const TEACHER_SALARY: FieldSpec = FieldSpec {
    label: "TEACHER_SALARY",
    aliases: &[
        "Average Teacher Salary",
        "AVG_TEACHER_SALARY",
        "AVERAGE_TEACHER_SALARY",
        "TEACHER_AVG_SALARY",
        "TEACHER SALARY (AVG)",
        "TEACHER_SALARY_AVG",
        "TEACHER_SALARY",
    ],
    fuzzy: &[r"teacher.*salary"],
};

pub const PRINCIPAL_SALARY: FieldSpec = FieldSpec {
    label: "PRINCIPAL_SALARY",
    aliases: &[
        "Average Principal Salary",
        "AVG_PRINCIPAL_SALARY",
        "AVERAGE_PRINCIPAL_SALARY",
        "PRINCIPAL_AVG_SALARY",
        "PRINCIPAL SALARY (AVG)",
        "PRINCIPAL_SALARY_AVG",
        "PRINCIPAL_SALARY",
    ],
    fuzzy: &[r"principal.*salary"],
};

pub const SUPERINTENDENT_SALARY: FieldSpec = FieldSpec {
    label: "SUPERINTENDENT_SALARY",
    aliases: &[
        "Superintendent Salary",
        "AVG_SUPERINTENDENT_SALARY",
        "AVERAGE_SUPERINTENDENT_SALARY",
        "SUPERINTENDENT_AVG_SALARY",
        "SUPERINTENDENT SALARY (AVG)",
        "SUPERINTENDENT_SALARY_AVG",
        "SUPERINTENDENT_SALARY",
    ],
    fuzzy: &[r"superintendent.*salary"],
};

pub const CAMPUS_DISTRICT_ID: FieldSpec = FieldSpec {
    label: "DISTRICT_ID",
    aliases: &[
        "USER_District_Number",
        "DISTRICT_N",
        "DISTRICT_ID",
        "LEAID",
        "LEA",
        "LEA CODE",
        "LEA_ID",
    ],
    fuzzy: &[r"district.*(number|id|code)", r"\blea(\s*id|\s*code)?\b"],
};

pub const CAMPUS_DISTRICT_NAME: FieldSpec = FieldSpec {
    label: "DISTRICT_NAME",
    aliases: &["District Name", "DISTRICT", "DISTNAME", "LEA_NAME", "LEA NAME"],
    fuzzy: &[r"district.*name", r"lea.*name"],
};

pub const CAMPUS_ID: FieldSpec = FieldSpec {
    label: "CAMPUS_ID",
    aliases: &[
        "USER_School_Number",
        "USER_Campus_Number",
        "CAMPUS_ID",
        "Campus ID",
        "SCHOOL_NUMBER",
        "SCHOOL ID",
        "School Number",
    ],
    fuzzy: &[r"campus.*(id|number)", r"school.*(id|number)"],
};

pub const CAMPUS_NAME: FieldSpec = FieldSpec {
    label: "CAMPUS_NAME",
    aliases: &[
        "USER_School_Name",
        "Campus Name",
        "CAMPUS_NAME",
        "SCHOOL_NAME",
        "NAME",
    ],
    fuzzy: &[r"campus.*name", r"school.*name"],
};

pub const CAMPUS_SCORE: FieldSpec = FieldSpec {
    label: "CAMPUS_SCORE",
    aliases: &[
        "Campus Score",
        "CAMPUS_SCORE",
        "CampusScore",
        "SCORE",
        "RATING",
        "GRADE",
    ],
    fuzzy: &[r"score", r"rating", r"grade"],
};

pub const CAMPUS_GRADE: FieldSpec = FieldSpec {
    label: "CAMPUS_GRADE",
    aliases: &[
        "Campus Grade",
        "Overall Grade",
        "GRADE",
        "RATING",
        "Letter Grade",
        "LETTER_GRADE",
    ],
    fuzzy: &[r"(^|\s)(overall\s*)?grade", r"rating"],
};

pub const READING_OGR: FieldSpec = FieldSpec {
    label: "READING_OGR",
    aliases: &[
        "Reading OGL",
        "Reading On Grade-Level",
        "READING_OGL",
        "READING OGL",
    ],
    fuzzy: &[r"read.*(on.*grade|ogl)"],
};

pub const MATH_OGR: FieldSpec = FieldSpec {
    label: "MATH_OGR",
    aliases: &["Math OGL", "MATH_OGL", "Math On Grade-Level", "MATH OGL"],
    fuzzy: &[r"math.*(on.*grade|ogl)"],
};

pub const TEACHER_COUNT: FieldSpec = FieldSpec {
    label: "TEACHER_COUNT",
    aliases: &["Teacher Count", "TEACHERS", "TEACHER_COUNT"],
    fuzzy: &[r"teacher.*count"],
};

pub const ADMIN_COUNT: FieldSpec = FieldSpec {
    label: "ADMIN_COUNT",
    aliases: &["Admin Count", "ADMIN_COUNT", "Administrators"],
    fuzzy: &[r"admin.*count"],
};

pub const AVG_ADMIN_SAL: FieldSpec = FieldSpec {
    label: "AVG_ADMIN_SAL",
    aliases: &["Average Admin Salary", "ADMIN_AVG_SALARY", "AVG_ADMIN_SAL"],
    fuzzy: &[r"admin.*salary"],
};

pub const AVG_TEACH_SAL: FieldSpec = FieldSpec {
    label: "AVG_TEACH_SAL",
    aliases: &["Average Teacher Salary", "TEACHER_AVG_SALARY", "AVG_TEACH_SAL"],
    fuzzy: &[r"teacher.*salary"],
};

pub const SPENDING_DISTRICT_ID: FieldSpec = FieldSpec {
    label: "DISTRICT_ID",
    aliases: &["DISTRICT_N", "DISTRICT_ID", "DISTRICTCODE", "DISTRICT"],
    fuzzy: &[r"district"],
};

pub const SPENDING_DATE: FieldSpec = FieldSpec {
    label: "DATE",
    aliases: &["DATE", "TxDate", "POST_DATE", "INVOICE_DATE"],
    fuzzy: &[r"date"],
};

pub const SPENDING_VENDOR: FieldSpec = FieldSpec {
    label: "VENDOR",
    aliases: &["VENDOR", "PAYEE", "SUPPLIER"],
    fuzzy: &[r"vendor|payee|supplier"],
};

pub const SPENDING_CATEGORY: FieldSpec = FieldSpec {
    label: "CATEGORY",
    aliases: &["CATEGORY", "OBJECT", "ACCOUNT", "FUNCTION"],
    fuzzy: &[r"categor|object|account|function"],
};

pub const SPENDING_AMOUNT: FieldSpec = FieldSpec {
    label: "AMOUNT",
    aliases: &["AMOUNT", "TOTAL", "EXPENSE", "DEBIT", "LINE_AMOUNT"],
    fuzzy: &[r"amount|total|expense|debit"],
};

pub const SPENDING_DESCRIPTION: FieldSpec = FieldSpec {
    label: "DESCRIPTION",
    aliases: &["DESCRIPTION", "DESC", "MEMO", "LINE_DESCRIPTION"],
    fuzzy: &[r"desc|memo"],
};

pub const LATITUDE: FieldSpec = FieldSpec {
    label: "LAT",
    aliases: &["LAT", "Latitude", "Y"],
    fuzzy: &[r"^lat$", r"latitude"],
};

pub const LONGITUDE: FieldSpec = FieldSpec {
    label: "LON",
    aliases: &["LON", "LONG", "Longitude", "X"],
    fuzzy: &[r"^lon$|^lng$", r"longitude", r"long"],
};

field_map! {
    /// Per-dataset column resolution for the district table.
    DistrictFields {
        id => DISTRICT_ID,
        name => DISTRICT_NAME,
        county => DISTRICT_COUNTY,
        total_spending => TOTAL_SPENDING,
        enrollment => ENROLLMENT,
        district_debt => DISTRICT_DEBT,
        per_pupil_debt => PER_PUPIL_DEBT,
        teacher_salary => TEACHER_SALARY,
        principal_salary => PRINCIPAL_SALARY,
        superintendent_salary => SUPERINTENDENT_SALARY,
    }
}

field_map! {
    /// Per-dataset column resolution for the campus table.
    CampusFields {
        campus_id => CAMPUS_ID,
        campus_name => CAMPUS_NAME,
        district_id => CAMPUS_DISTRICT_ID,
        district_name => CAMPUS_DISTRICT_NAME,
        campus_score => CAMPUS_SCORE,
        campus_grade => CAMPUS_GRADE,
        reading_ogr => READING_OGR,
        math_ogr => MATH_OGR,
        teacher_count => TEACHER_COUNT,
        admin_count => ADMIN_COUNT,
        avg_admin_sal => AVG_ADMIN_SAL,
        avg_teach_sal => AVG_TEACH_SAL,
    }
}

field_map! {
    /// Per-dataset column resolution for the spending line-item table.
    SpendingFields {
        district_id => SPENDING_DISTRICT_ID,
        date => SPENDING_DATE,
        vendor => SPENDING_VENDOR,
        category => SPENDING_CATEGORY,
        amount => SPENDING_AMOUNT,
        description => SPENDING_DESCRIPTION,
    }
}
