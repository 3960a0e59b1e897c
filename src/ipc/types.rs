use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::Config;
use crate::insight::InsightGateway;
use crate::store::SqliteStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteStore>,
    pub config: Config,
    pub gateway: Arc<dyn InsightGateway>,
    /// Channel to the stdout writer, for replies produced off the main loop.
    pub outbox: Sender<serde_json::Value>,
}

pub enum Reply {
    Ready(serde_json::Value),
    /// The handler sends the response through `AppState::outbox` itself.
    Pending,
}
