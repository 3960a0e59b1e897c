use crate::analytics::{self, DateRange};
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str, with_store};
use crate::ipc::types::{AppState, Reply, Request};
use crate::insight::{self, InsightRequest};
use crate::ledger;
use crate::risk;
use crate::roster;
use crate::store::SqliteStore;
use chrono::{Local, NaiveDate};
use serde_json::json;

fn parse_range(params: &serde_json::Value) -> Result<DateRange, HandlerErr> {
    let start = get_optional_str(params, "start")?;
    let end = get_optional_str(params, "end")?;
    for d in start.iter().chain(end.iter()) {
        ledger::validate_date(d)?;
    }
    let end_date = match &end {
        Some(e) => NaiveDate::parse_from_str(e, "%Y-%m-%d")
            .map_err(|e| HandlerErr::bad_params(e.to_string()))?,
        None => Local::now().date_naive(),
    };
    let mut range = DateRange::ending_at(end_date);
    if let Some(s) = start {
        range.start = s;
    }
    if range.start > range.end {
        return Err(HandlerErr {
            code: "bad_params",
            message: "start must not be after end".to_string(),
            details: Some(json!({ "start": range.start, "end": range.end })),
        });
    }
    Ok(range)
}

fn analytics_batch_open(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    let range = parse_range(params)?;
    let batch = roster::find_batch(store, &batch_id)?;
    let stats = analytics::compute_batch_analytics(store, &batch_id, &range)?;
    let at_risk = risk::at_risk_students(&stats);

    Ok(json!({
        "batch": { "id": batch.id, "name": batch.name },
        "range": stats.range,
        "totalClassesHeld": stats.total_classes_held,
        "totalPresent": stats.total_present,
        "overallRate": stats.overall_rate,
        "atRiskCount": at_risk.len(),
        "atRisk": at_risk,
        "perStudent": stats.per_student,
        "trend": stats.trend,
    }))
}

fn insight_request(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<InsightRequest, HandlerErr> {
    let batch_id = get_required_str(params, "batchId")?;
    let range = parse_range(params)?;
    let batch = roster::find_batch(store, &batch_id)?;
    let stats = analytics::compute_batch_analytics(store, &batch_id, &range)?;
    Ok(InsightRequest::from_analytics(&batch.name, &stats))
}

fn handle_analytics_batch_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, analytics_batch_open)
}

/// Builds the summary now and answers from a worker thread once the
/// gateway returns, so other requests keep flowing meanwhile.
fn handle_analytics_batch_insight(state: &mut AppState, req: &Request) -> Reply {
    let Some(store) = state.store.as_ref() else {
        return Reply::Ready(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let request = match insight_request(store, &req.params) {
        Ok(r) => r,
        Err(e) => return Reply::Ready(e.response(&req.id)),
    };

    let gateway = state.gateway.clone();
    let outbox = state.outbox.clone();
    let id = req.id.clone();
    let worker = std::thread::Builder::new()
        .name("insight".to_string())
        .spawn(move || {
            let text = insight::narrative_or_fallback(gateway.as_ref(), &request);
            let _ = outbox.send(ok(&id, json!({ "text": text })));
        });
    match worker {
        Ok(_) => Reply::Pending,
        Err(e) => {
            tracing::warn!(error = %e, "could not start insight worker");
            Reply::Ready(ok(
                &req.id,
                json!({ "text": insight::FALLBACK_NARRATIVE }),
            ))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "analytics.batch.open" => Some(Reply::Ready(handle_analytics_batch_open(state, req))),
        "analytics.batch.insight" => Some(handle_analytics_batch_insight(state, req)),
        _ => None,
    }
}
