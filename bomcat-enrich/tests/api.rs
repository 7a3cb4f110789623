//! HTTP API integration tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use common::{full_payload, hit, test_state, ScriptedAdapter};

use bomcat_enrich::build_router;
use bomcat_enrich::suppliers::{SupplierAdapter, TierError};

fn production_adapters() -> Vec<Arc<dyn SupplierAdapter>> {
    vec![
        ScriptedAdapter::new("DigiSupply", 1, |q| {
            hit(full_payload("DigiSupply", 1, &q.mpn), 95.0)
        }),
        ScriptedAdapter::new("ElectroMart", 2, |_| Err(TierError::Miss)),
    ]
}

fn review_adapters() -> Vec<Arc<dyn SupplierAdapter>> {
    vec![ScriptedAdapter::new("PartHub", 3, |q| {
        let mut payload = full_payload("PartHub", 3, &q.mpn);
        payload.pricing.clear();
        payload.image_url = None;
        hit(payload, 72.0)
    })]
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Poll the status endpoint until the job reports the wanted status
async fn wait_for_job(app: &axum::Router, job_id: &str, status: &str) -> Value {
    for _ in 0..600 {
        let response = get(app, &format!("/enrich/jobs/{}", job_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let progress = body_json(response).await;
        if progress["status"] == status {
            return progress;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never reached {}", job_id, status);
}

#[tokio::test]
async fn health_reports_ok() {
    let state = test_state(production_adapters(), 2).await;
    let app = build_router(state);

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn start_job_rejects_empty_items() {
    let state = test_state(production_adapters(), 2).await;
    let app = build_router(state);

    let response = post_json(&app, "/enrich/jobs", json!({ "items": [] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_job_returns_not_found() {
    let state = test_state(production_adapters(), 2).await;
    let app = build_router(state);

    let response = get(
        &app,
        "/enrich/jobs/00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn job_flow_start_to_completion_with_audit() {
    let state = test_state(production_adapters(), 2).await;
    let app = build_router(state);

    let response = post_json(
        &app,
        "/enrich/jobs",
        json!({
            "items": [
                { "mpn": "LM358DR", "manufacturer": "Texas Instruments" },
                { "mpn": "NE555P" }
            ]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    assert_eq!(body["progress"]["total_items"], 2);

    let done = wait_for_job(&app, &job_id, "completed").await;
    assert_eq!(done["enriched_items"], 2);
    assert_eq!(done["failed_items"], 0);
    assert_eq!(done["percent_complete"], 100.0);

    // Audit runs for the job
    let response = get(&app, &format!("/enrich/audit/jobs/{}/runs", job_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let runs = body_json(response).await;
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r["successful"] == true));

    // Field comparisons for one run
    let run_id = runs[0]["id"].as_str().unwrap();
    let response = get(&app, &format!("/enrich/audit/runs/{}/fields", run_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fields = body_json(response).await;
    assert_eq!(fields.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn pause_resume_flow_over_http() {
    // Adapter slow enough that the job is still running when we pause
    let adapters: Vec<Arc<dyn SupplierAdapter>> = vec![ScriptedAdapter::new(
        "DigiSupply",
        1,
        |q| hit(full_payload("DigiSupply", 1, &q.mpn), 95.0),
    )];
    let state = test_state(adapters, 1).await;
    let app = build_router(state);

    let items: Vec<Value> = (0..6)
        .map(|i| json!({ "mpn": format!("PART-{:03}", i) }))
        .collect();
    let response = post_json(&app, "/enrich/jobs", json!({ "items": items })).await;
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = post_json(&app, &format!("/enrich/jobs/{}/pause", job_id), json!({})).await;
    // The job may have already completed; both outcomes are legitimate
    if response.status() == StatusCode::OK {
        let paused = body_json(response).await;
        assert_eq!(paused["status"], "paused");

        let response =
            post_json(&app, &format!("/enrich/jobs/{}/resume", job_id), json!({})).await;
        assert_eq!(response.status(), StatusCode::OK);
    } else {
        // Pausing a finished job is a state conflict
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    let done = wait_for_job(&app, &job_id, "completed").await;
    assert_eq!(done["enriched_items"], 6);
}

#[tokio::test]
async fn review_queue_resolve_accept_promotes() {
    let state = test_state(review_adapters(), 1).await;
    let db = state.db.clone();
    let app = build_router(state);

    let response = post_json(
        &app,
        "/enrich/jobs",
        json!({ "items": [{ "mpn": "STM32F103C8T6" }] }),
    )
    .await;
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();
    wait_for_job(&app, &job_id, "completed").await;

    // Candidate is waiting for review
    let response = get(&app, "/enrich/reviews").await;
    let pending = body_json(response).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["mpn"], "STM32F103C8T6");
    let entry_id = pending[0]["id"].as_str().unwrap();

    // Accept it
    let response = post_json(
        &app,
        &format!("/enrich/reviews/{}", entry_id),
        json!({ "accepted": true, "reviewed_by": "reviewer@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Promoted to the catalog, queue drained
    let component = bomcat_enrich::db::catalog::get_component(&db, "STM32F103C8T6")
        .await
        .unwrap();
    assert!(component.is_some());

    let response = get(&app, "/enrich/reviews").await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn daily_rollup_endpoint_is_idempotent() {
    let state = test_state(production_adapters(), 2).await;
    let app = build_router(state);

    let response = post_json(
        &app,
        "/enrich/jobs",
        json!({ "items": [{ "mpn": "LM358DR" }] }),
    )
    .await;
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();
    wait_for_job(&app, &job_id, "completed").await;

    let date = chrono::Utc::now().date_naive().to_string();
    let uri = format!("/enrich/audit/daily/{}/rollup", date);

    let first = body_json(post_json(&app, &uri, json!({})).await).await;
    let second = body_json(post_json(&app, &uri, json!({})).await).await;
    assert_eq!(first, second);

    let stored = body_json(get(&app, &format!("/enrich/audit/daily/{}", date)).await).await;
    assert_eq!(stored, first);

    // Malformed date is a client error
    let response = get(&app, "/enrich/audit/daily/not-a-date").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stop_job_is_terminal_over_http() {
    let state = test_state(production_adapters(), 1).await;
    let app = build_router(state);

    let items: Vec<Value> = (0..4)
        .map(|i| json!({ "mpn": format!("PART-{:03}", i) }))
        .collect();
    let response = post_json(&app, "/enrich/jobs", json!({ "items": items })).await;
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = post_json(&app, &format!("/enrich/jobs/{}/stop", job_id), json!({})).await;
    if response.status() == StatusCode::OK {
        let stopped = body_json(response).await;
        assert_eq!(stopped["status"], "stopped");

        // A stopped job cannot be resumed
        let response =
            post_json(&app, &format!("/enrich/jobs/{}/resume", job_id), json!({})).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    } else {
        // Already completed before the stop arrived
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
