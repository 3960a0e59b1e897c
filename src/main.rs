mod analytics;
mod config;
mod db;
mod error;
mod insight;
mod ipc;
mod ledger;
mod model;
mod risk;
mod roster;
mod store;

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("attendd=info"));
    // stdout carries the protocol; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn main() {
    let config = config::Config::from_env();
    init_tracing(&config.log_filter);
    for w in &config.warnings {
        tracing::warn!("{}", w);
    }

    let (outbox, replies) = mpsc::channel::<serde_json::Value>();
    let writer = std::thread::spawn(move || {
        let mut stdout = io::stdout();
        for resp in replies {
            let _ = writeln!(
                stdout,
                "{}",
                serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
            );
            let _ = stdout.flush();
        }
    });

    let mut state = ipc::AppState {
        workspace: None,
        store: None,
        gateway: Arc::from(insight::gateway_from_config(&config)),
        config,
        outbox: outbox.clone(),
    };
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = %state.config.namespace,
        "attendd ready"
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let _ = outbox.send(serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
                continue;
            }
        };

        if let ipc::Reply::Ready(resp) = ipc::handle_request(&mut state, req) {
            let _ = outbox.send(resp);
        }
    }

    // Pending insight workers hold their own senders; the writer drains
    // until the last one is gone.
    drop(state);
    drop(outbox);
    let _ = writer.join();
}
