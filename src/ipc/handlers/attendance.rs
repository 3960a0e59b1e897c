use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::model::AttendanceStatus;
use crate::roster;
use crate::store::SqliteStore;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;

fn parse_marks(
    params: &serde_json::Value,
) -> Result<HashMap<String, AttendanceStatus>, HandlerErr> {
    let Some(raw) = params.get("marks") else {
        return Ok(HashMap::new());
    };
    let Some(obj) = raw.as_object() else {
        return Err(HandlerErr::bad_params(
            "marks must be an object of studentId -> status",
        ));
    };
    let mut out = HashMap::with_capacity(obj.len());
    for (student_id, v) in obj {
        let status = v
            .as_str()
            .and_then(AttendanceStatus::parse)
            .ok_or_else(|| HandlerErr {
                code: "bad_params",
                message: "status must be PRESENT, ABSENT or LATE".to_string(),
                details: Some(json!({ "studentId": student_id, "status": v })),
            })?;
        out.insert(student_id.clone(), status);
    }
    Ok(out)
}

fn attendance_day_open(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    let date = get_required_str(params, "date")?;
    ledger::validate_date(&date)?;
    roster::find_batch(store, &batch_id)?;

    let students = roster::list_students(store, &batch_id)?;
    let records = ledger::list_records(store, Some(&batch_id))?;
    let rows: Vec<serde_json::Value> = ledger::day_sheet(students, &records, &date)
        .into_iter()
        .map(|row| {
            json!({
                "studentId": row.student.id,
                "name": row.student.name,
                "photoUrl": row.student.photo_url,
                "status": row.status.map(AttendanceStatus::as_str)
            })
        })
        .collect();
    let marked = rows.iter().any(|r| !r["status"].is_null());

    Ok(json!({
        "batchId": batch_id,
        "date": date,
        "marked": marked,
        "rows": rows
    }))
}

fn attendance_submit(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    let date = get_required_str(params, "date")?;
    let marks = parse_marks(params)?;

    let batch = roster::find_batch(store, &batch_id)?;
    let students = roster::list_students(store, &batch_id)?;
    let records = ledger::records_for_day(
        &batch,
        &students,
        &date,
        &marks,
        Utc::now().timestamp_millis(),
    )?;
    let summary = ledger::submit_attendance(store, records)?;
    tracing::info!(
        batch_id = %batch_id,
        date = %date,
        written = summary.written,
        replaced = summary.replaced,
        "attendance submitted"
    );
    Ok(json!({
        "written": summary.written,
        "replaced": summary.replaced
    }))
}

fn attendance_list(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_optional_str(params, "batchId")?;
    let records = ledger::list_records(store, batch_id.as_deref())?;
    Ok(json!({ "records": records }))
}

fn handle_attendance_day_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, attendance_day_open)
}

fn handle_attendance_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, attendance_submit)
}

fn handle_attendance_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, attendance_list)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.dayOpen" => Some(handle_attendance_day_open(state, req)),
        "attendance.submit" => Some(handle_attendance_submit(state, req)),
        "attendance.list" => Some(handle_attendance_list(state, req)),
        _ => None,
    }
}
