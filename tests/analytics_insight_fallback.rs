mod test_support;

use serde_json::json;
use std::net::TcpListener;
use std::time::{Duration, Instant};
use test_support::{read_response, request_ok, seed_batch, send, spawn_sidecar, spawn_sidecar_with_env, temp_dir};

const FALLBACK: &str = "Could not generate AI insights at this time.";

#[test]
fn unconfigured_gateway_answers_with_fallback_text() {
    let workspace = temp_dir("attendd-insight-disabled");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (batch_id, _) = seed_batch(&mut stdin, &mut reader, &workspace, &["Ada", "Bob"]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.submit",
        json!({ "batchId": batch_id, "date": "2024-03-04" }),
    );

    let insight = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "analytics.batch.insight",
        json!({ "batchId": batch_id, "start": "2024-03-01", "end": "2024-03-31" }),
    );
    assert_eq!(insight["text"], FALLBACK);
}

/// Accepts connections and never answers them.
fn hanging_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://{}/insight", addr)
}

#[test]
fn hanging_gateway_times_out_without_blocking_or_touching_data() {
    let workspace = temp_dir("attendd-insight-hanging");
    let url = hanging_endpoint();
    let (_child, mut stdin, mut reader) = spawn_sidecar_with_env(&[
        ("ATTENDD_INSIGHT_URL", url.as_str()),
        ("ATTENDD_INSIGHT_TIMEOUT_MS", "1500"),
    ]);
    let (batch_id, ids) = seed_batch(&mut stdin, &mut reader, &workspace, &["Ada", "Bob"]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.submit",
        json!({ "batchId": batch_id, "date": "2024-03-04", "marks": { ids[0].as_str(): "ABSENT" } }),
    );
    let before = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.list",
        json!({ "batchId": batch_id }),
    );

    let started = Instant::now();
    send(
        &mut stdin,
        "insight",
        "analytics.batch.insight",
        json!({ "batchId": batch_id, "start": "2024-03-01", "end": "2024-03-31" }),
    );
    send(&mut stdin, "health", "health", json!({}));

    // The gateway is still waiting, so health must be answered first.
    let first = read_response(&mut reader);
    assert_eq!(first["id"], "health");
    assert_eq!(first["ok"], true);
    assert_eq!(first["result"]["insightConfigured"], true);

    let second = read_response(&mut reader);
    assert_eq!(second["id"], "insight");
    assert_eq!(second["ok"], true);
    assert_eq!(second["result"]["text"], FALLBACK);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(1000), "answered after {:?}", waited);
    assert!(waited < Duration::from_secs(10), "answered after {:?}", waited);

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.list",
        json!({ "batchId": batch_id }),
    );
    assert_eq!(before, after);
}

#[test]
fn refused_connection_falls_back() {
    let workspace = temp_dir("attendd-insight-refused");
    let (_child, mut stdin, mut reader) = spawn_sidecar_with_env(&[
        ("ATTENDD_INSIGHT_URL", "http://127.0.0.1:9/insight"),
        ("ATTENDD_INSIGHT_TIMEOUT_MS", "500"),
    ]);
    let (batch_id, _) = seed_batch(&mut stdin, &mut reader, &workspace, &["Ada"]);
    let insight = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "analytics.batch.insight",
        json!({ "batchId": batch_id }),
    );
    assert_eq!(insight["text"], FALLBACK);
}

#[test]
fn insight_for_unknown_batch_is_not_found() {
    let workspace = temp_dir("attendd-insight-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = seed_batch(&mut stdin, &mut reader, &workspace, &[]);
    send(
        &mut stdin,
        "x",
        "analytics.batch.insight",
        json!({ "batchId": "nope" }),
    );
    let v = read_response(&mut reader);
    assert_eq!(v["id"], "x");
    assert_eq!(v["ok"], false);
    assert_eq!(v["error"]["code"], "not_found");
}
