//! Attendance write path.
//!
//! A record is identified by `(studentId, date)`. Submitting a record for a
//! key that already exists replaces the stored one; nothing is ever appended
//! twice for the same key.

use crate::error::AttendError;
use crate::model::{AttendanceRecord, AttendanceStatus, Batch, Student};
use crate::store::{self, RecordStore};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitSummary {
    pub written: usize,
    pub replaced: usize,
}

/// `true` for a real calendar date written as zero-padded `YYYY-MM-DD`.
pub fn is_canonical_date(date: &str) -> bool {
    // chrono tolerates padding spaces and a signed year; the round-trip
    // rejects both so one calendar day has exactly one key.
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%Y-%m-%d").to_string() == date,
        Err(_) => false,
    }
}

pub fn validate_date(date: &str) -> Result<(), AttendError> {
    if is_canonical_date(date) {
        Ok(())
    } else {
        Err(AttendError::Validation(format!(
            "date must be YYYY-MM-DD, got {:?}",
            date
        )))
    }
}

pub fn submit_attendance(
    store: &dyn RecordStore,
    records: Vec<AttendanceRecord>,
) -> Result<SubmitSummary, AttendError> {
    if records.is_empty() {
        return Ok(SubmitSummary::default());
    }
    for r in &records {
        validate_date(&r.date)?;
    }

    // Within one submission the last record for a key wins.
    let mut last_index: HashMap<(String, String), usize> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        last_index.insert((r.student_id.clone(), r.date.clone()), i);
    }
    let incoming: Vec<AttendanceRecord> = records
        .into_iter()
        .enumerate()
        .filter(|(i, r)| last_index.get(&(r.student_id.clone(), r.date.clone())) == Some(i))
        .map(|(_, r)| r)
        .collect();

    let keys: HashSet<(&str, &str)> = incoming.iter().map(|r| r.key()).collect();
    let existing = store::get::<AttendanceRecord>(store)?;
    let before = existing.len();
    let mut kept: Vec<AttendanceRecord> = existing
        .into_iter()
        .filter(|r| !keys.contains(&r.key()))
        .collect();
    let replaced = before - kept.len();
    let written = incoming.len();
    kept.extend(incoming);
    store::put(store, &kept)?;

    Ok(SubmitSummary { written, replaced })
}

/// All stored records, optionally narrowed to one batch.
pub fn list_records(
    store: &dyn RecordStore,
    batch_id: Option<&str>,
) -> Result<Vec<AttendanceRecord>, AttendError> {
    let all = store::get::<AttendanceRecord>(store)?;
    Ok(match batch_id {
        Some(id) => all.into_iter().filter(|r| r.batch_id == id).collect(),
        None => all,
    })
}

/// One record per roster student for `date`. Unmarked students default to
/// present, the same as a fresh marking sheet.
pub fn records_for_day(
    batch: &Batch,
    roster: &[Student],
    date: &str,
    marks: &HashMap<String, AttendanceStatus>,
    timestamp: i64,
) -> Result<Vec<AttendanceRecord>, AttendError> {
    validate_date(date)?;
    let on_roster: HashSet<&str> = roster.iter().map(|s| s.id.as_str()).collect();
    if let Some(stray) = marks.keys().find(|id| !on_roster.contains(id.as_str())) {
        return Err(AttendError::Validation(format!(
            "student {} is not on the roster of batch {}",
            stray, batch.id
        )));
    }
    Ok(roster
        .iter()
        .map(|s| AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            student_id: s.id.clone(),
            batch_id: batch.id.clone(),
            date: date.to_string(),
            status: marks
                .get(&s.id)
                .copied()
                .unwrap_or(AttendanceStatus::Present),
            timestamp,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySheetRow {
    pub student: Student,
    pub status: Option<AttendanceStatus>,
}

/// Roster for `date` with whatever status is currently stored.
pub fn day_sheet(
    roster: Vec<Student>,
    records: &[AttendanceRecord],
    date: &str,
) -> Vec<DaySheetRow> {
    let by_student: HashMap<&str, AttendanceStatus> = records
        .iter()
        .filter(|r| r.date == date)
        .map(|r| (r.student_id.as_str(), r.status))
        .collect();
    roster
        .into_iter()
        .map(|student| {
            let status = by_student.get(student.id.as_str()).copied();
            DaySheetRow { student, status }
        })
        .collect()
}
