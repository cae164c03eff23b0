//! Statewide aggregates over the district table.

use log::debug;

use crate::{fields::DistrictFields, tabular::RawTable};

/// Published statewide average per-student spending figure used when the
/// computed mode is not requested.
pub const PER_STUDENT_SPENDING_FIXED: f64 = 18_125.0;

/// How the statewide per-student spending figure is produced: the published
/// constant, or total spending divided by total enrollment from the loaded
/// table. Both appear across dataset revisions; the constant is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerStudentSpending {
    #[default]
    Fixed,
    Computed,
}

/// Fixed set of statewide aggregates, recomputed from scratch on each load.
/// Sums cover spending, enrollment, and debt; salary-type metrics are
/// arithmetic means over the rows that carry a value, rounded to the nearest
/// whole dollar. An undetectable or never-populated field aggregates to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatSummary {
    pub district_count: usize,
    pub total_spending: f64,
    pub enrollment_total: f64,
    pub per_student_spending: f64,
    pub district_debt_total: f64,
    pub per_pupil_debt_avg: i64,
    pub teacher_salary_avg: i64,
    pub principal_salary_avg: i64,
    pub superintendent_salary_avg: i64,
}

/// Parses a money-ish cell: `$` and thousands separators stripped, then a
/// plain float parse. Empty or non-numeric cells yield `None` and are kept out
/// of both numerators and denominators.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[derive(Debug, Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Mean rounded to the nearest integer; zero when nothing accumulated.
    fn rounded(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            (self.sum / self.count as f64).round() as i64
        }
    }
}

/// Computes the statewide summary over a fully-loaded district table. Never
/// fails: missing fields and unparseable cells simply contribute nothing.
pub fn aggregate(
    table: &RawTable,
    fields: &DistrictFields,
    per_student: PerStudentSpending,
) -> StatSummary {
    let mut summary = StatSummary {
        district_count: table.len(),
        ..StatSummary::default()
    };

    let mut per_pupil_debt = MeanAccumulator::default();
    let mut teacher_salary = MeanAccumulator::default();
    let mut principal_salary = MeanAccumulator::default();
    let mut superintendent_salary = MeanAccumulator::default();

    for row in &table.rows {
        let numeric = |column: Option<usize>| table.cell(row, column).and_then(parse_amount);

        if let Some(value) = numeric(fields.total_spending) {
            summary.total_spending += value;
        }
        if let Some(value) = numeric(fields.enrollment) {
            summary.enrollment_total += value;
        }
        if let Some(value) = numeric(fields.district_debt) {
            summary.district_debt_total += value;
        }
        if let Some(value) = numeric(fields.per_pupil_debt) {
            per_pupil_debt.push(value);
        }
        if let Some(value) = numeric(fields.teacher_salary) {
            teacher_salary.push(value);
        }
        if let Some(value) = numeric(fields.principal_salary) {
            principal_salary.push(value);
        }
        if let Some(value) = numeric(fields.superintendent_salary) {
            superintendent_salary.push(value);
        }
    }

    summary.per_pupil_debt_avg = per_pupil_debt.rounded();
    summary.teacher_salary_avg = teacher_salary.rounded();
    summary.principal_salary_avg = principal_salary.rounded();
    summary.superintendent_salary_avg = superintendent_salary.rounded();

    summary.per_student_spending = match per_student {
        PerStudentSpending::Fixed => PER_STUDENT_SPENDING_FIXED,
        PerStudentSpending::Computed => {
            if summary.enrollment_total > 0.0 {
                (summary.total_spending / summary.enrollment_total).round()
            } else {
                0.0
            }
        }
    };

    debug!(
        "aggregated {} district row(s): spending={}, enrollment={}",
        summary.district_count, summary.total_spending, summary.enrollment_total
    );
    summary
}

/// Per-district per-student spending for a single row: row total spending
/// divided by row enrollment, rounded, or `None` when enrollment is missing
/// or zero.
pub fn row_per_student_spending(
    table: &RawTable,
    fields: &DistrictFields,
    row: &[String],
) -> Option<f64> {
    let spending = table.cell(row, fields.total_spending).and_then(parse_amount)?;
    let enrollment = table.cell(row, fields.enrollment).and_then(parse_amount)?;
    if enrollment > 0.0 {
        Some((spending / enrollment).round())
    } else {
        None
    }
}
