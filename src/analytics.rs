//! Batch attendance analytics over an inclusive date range.
//!
//! Dates are compared as strings, which matches chronological order only
//! for zero-padded `YYYY-MM-DD` values. The ledger enforces that format on
//! write; nothing here validates it.

use crate::error::AttendError;
use crate::model::{AttendanceRecord, AttendanceStatus, Student};
use crate::roster;
use crate::store::{self, RecordStore};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Range used when the caller does not pick one.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// The `DEFAULT_RANGE_DAYS` days ending at `today`.
    pub fn ending_at(today: NaiveDate) -> Self {
        let start = today - Duration::days(DEFAULT_RANGE_DAYS);
        Self::new(
            start.format("%Y-%m-%d").to_string(),
            today.format("%Y-%m-%d").to_string(),
        )
    }

    pub fn contains(&self, date: &str) -> bool {
        date >= self.start.as_str() && date <= self.end.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub student_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub present_count: usize,
    /// Held classes the student was not present for, LATE included.
    pub absent_count: usize,
    pub late_count: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: String,
    pub label: String,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnalytics {
    pub batch_id: String,
    pub range: DateRange,
    pub total_classes_held: usize,
    pub total_present: usize,
    pub overall_rate: f64,
    /// Worst attendance first; ties keep roster order.
    pub per_student: Vec<StudentStats>,
    /// Ascending by date.
    pub trend: Vec<TrendPoint>,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// `"Mar 5"` for `"2024-03-05"`; the raw string when it is not a date.
pub fn chart_label(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%b %-d").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Pure aggregation over a roster and the batch's records.
pub fn aggregate(
    batch_id: &str,
    students: &[Student],
    records: &[AttendanceRecord],
    range: &DateRange,
) -> BatchAnalytics {
    let in_range: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.batch_id == batch_id && range.contains(&r.date))
        .collect();

    let held: BTreeSet<&str> = in_range.iter().map(|r| r.date.as_str()).collect();
    let total_classes_held = held.len();

    let mut present_by_student: HashMap<&str, usize> = HashMap::new();
    let mut late_by_student: HashMap<&str, usize> = HashMap::new();
    for r in &in_range {
        match r.status {
            AttendanceStatus::Present => {
                *present_by_student.entry(r.student_id.as_str()).or_default() += 1
            }
            AttendanceStatus::Late => {
                *late_by_student.entry(r.student_id.as_str()).or_default() += 1
            }
            AttendanceStatus::Absent => {}
        }
    }

    let mut per_student: Vec<StudentStats> = students
        .iter()
        .map(|s| {
            let present_count = present_by_student
                .get(s.id.as_str())
                .copied()
                .unwrap_or(0);
            StudentStats {
                student_id: s.id.clone(),
                name: s.name.clone(),
                email: s.email.clone(),
                photo_url: s.photo_url.clone(),
                present_count,
                absent_count: total_classes_held.saturating_sub(present_count),
                late_count: late_by_student.get(s.id.as_str()).copied().unwrap_or(0),
                rate: percent(present_count, total_classes_held),
            }
        })
        .collect();
    // sort_by is stable, so equal rates stay in roster order.
    per_student.sort_by(|a, b| a.rate.total_cmp(&b.rate));

    let mut by_date: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for r in &in_range {
        let slot = by_date.entry(r.date.as_str()).or_default();
        if r.status == AttendanceStatus::Present {
            slot.0 += 1;
        } else {
            slot.1 += 1;
        }
    }
    let trend: Vec<TrendPoint> = by_date
        .into_iter()
        .map(|(date, (present, absent))| TrendPoint {
            date: date.to_string(),
            label: chart_label(date),
            present,
            absent,
        })
        .collect();

    let total_present = in_range
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    let overall_rate = percent(total_present, total_classes_held * students.len());

    BatchAnalytics {
        batch_id: batch_id.to_string(),
        range: range.clone(),
        total_classes_held,
        total_present,
        overall_rate,
        per_student,
        trend,
    }
}

/// Load the batch's roster and records and aggregate them.
pub fn compute_batch_analytics(
    store: &dyn RecordStore,
    batch_id: &str,
    range: &DateRange,
) -> Result<BatchAnalytics, AttendError> {
    let students = roster::list_students(store, batch_id)?;
    let records: Vec<AttendanceRecord> = store::get::<AttendanceRecord>(store)?
        .into_iter()
        .filter(|r| r.batch_id == batch_id)
        .collect();
    let analytics = aggregate(batch_id, &students, &records, range);
    tracing::debug!(
        batch_id,
        start = %range.start,
        end = %range.end,
        classes_held = analytics.total_classes_held,
        students = students.len(),
        "batch analytics computed"
    );
    Ok(analytics)
}

/// The last `n` trend points.
pub fn trend_tail(trend: &[TrendPoint], n: usize) -> &[TrendPoint] {
    &trend[trend.len().saturating_sub(n)..]
}
