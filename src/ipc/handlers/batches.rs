use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use crate::store::SqliteStore;
use serde_json::json;

fn batches_list(
    store: &SqliteStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batches = roster::list_batches(store)?;
    let students = roster::all_students(store)?;
    let rows: Vec<serde_json::Value> = batches
        .iter()
        .map(|b| {
            let student_count = students.iter().filter(|s| s.batch_id == b.id).count();
            json!({
                "id": b.id,
                "name": b.name,
                "description": b.description,
                "createdAt": b.created_at,
                "studentCount": student_count
            })
        })
        .collect();
    Ok(json!({ "batches": rows }))
}

fn batches_create(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let description = get_optional_str(params, "description")?;
    let batch = roster::create_batch(store, &name, description)?;
    Ok(json!({ "batch": batch }))
}

fn handle_batches_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.store.is_none() {
        return ok(&req.id, json!({ "batches": [] }));
    }
    with_store(state, req, batches_list)
}

fn handle_batches_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, batches_create)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "batches.list" => Some(handle_batches_list(state, req)),
        "batches.create" => Some(handle_batches_create(state, req)),
        _ => None,
    }
}
