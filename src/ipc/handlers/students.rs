use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::NewStudent;
use crate::roster;
use crate::store::SqliteStore;
use serde_json::json;

fn students_list(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    roster::find_batch(store, &batch_id)?;
    let students = roster::list_students(store, &batch_id)?;
    Ok(json!({ "students": students }))
}

fn students_create(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    let name = get_required_str(params, "name")?;
    let new_student = NewStudent {
        name,
        email: get_optional_str(params, "email")?,
        photo_url: get_optional_str(params, "photoUrl")?,
    };
    let mut created = roster::add_students(store, &batch_id, vec![new_student])?;
    Ok(json!({ "student": created.pop() }))
}

fn students_import(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    let Some(text) = params.get("text").and_then(|v| v.as_str()) else {
        return Err(HandlerErr::bad_params("missing text"));
    };
    let parsed = roster::parse_roster_text(text);
    if parsed.is_empty() {
        return Err(HandlerErr {
            code: "bad_params",
            message: "no student names found in text".to_string(),
            details: None,
        });
    }
    let created = roster::add_students(store, &batch_id, parsed)?;
    Ok(json!({
        "imported": created.len(),
        "students": created
    }))
}

fn students_update_photo(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let Some(photo_url) = params.get("photoUrl").and_then(|v| v.as_str()) else {
        return Err(HandlerErr::bad_params("missing photoUrl"));
    };
    roster::update_student_photo(store, &student_id, photo_url)?;
    Ok(json!({ "ok": true }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, students_list)
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, students_create)
}

fn handle_students_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, students_import)
}

fn handle_students_update_photo(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, students_update_photo)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.import" => Some(handle_students_import(state, req)),
        "students.updatePhoto" => Some(handle_students_update_photo(state, req)),
        _ => None,
    }
}
