use super::handlers;
use super::types::{AppState, Reply, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> Reply {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return Reply::Ready(resp);
    }
    if let Some(resp) = handlers::batches::try_handle(state, &req) {
        return Reply::Ready(resp);
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return Reply::Ready(resp);
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return Reply::Ready(resp);
    }
    if let Some(reply) = handlers::analytics::try_handle(state, &req) {
        return reply;
    }

    Reply::Ready(err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    ))
}
