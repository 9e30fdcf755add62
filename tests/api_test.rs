use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use task_gateway::app::build_app;
use task_gateway::executor::LogExecutor;
use task_gateway::scheduler::{Scheduler, SchedulerConfig};
use task_gateway::state::AppState;
use task_gateway::task_log::MemoryTaskLog;

fn test_app() -> (axum::Router, Arc<Scheduler>, Arc<MemoryTaskLog>) {
    let log = Arc::new(MemoryTaskLog::new());
    let scheduler = Arc::new(Scheduler::new(
        SchedulerConfig::default(),
        Arc::new(LogExecutor),
        log.clone(),
    ));
    let app = build_app(Arc::new(AppState {
        scheduler: Arc::clone(&scheduler),
    }));
    (app, scheduler, log)
}

async fn submit(app: &axum::Router, body: Body) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/task")
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let retry_after = res
        .headers()
        .get(header::RETRY_AFTER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    (status, retry_after, payload)
}

async fn submit_for(app: &axum::Router, user_id: &str) -> (StatusCode, Option<String>, Value) {
    submit(app, Body::from(json!({ "user_id": user_id }).to_string())).await
}

#[tokio::test(start_paused = true)]
async fn second_submission_within_a_second_is_rejected() {
    let (app, _scheduler, log) = test_app();

    let (status, _, body) = submit_for(&app, "u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task added to queue.");

    let (status, retry_after, body) = submit_for(&app, "u1").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Rate limit exceeded. Try again later.");
    assert_eq!(retry_after.as_deref(), Some("1"));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let (status, _, _) = submit_for(&app, "u1").await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(log.entries().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn twenty_first_submission_in_a_window_is_rejected() {
    let (app, scheduler, log) = test_app();

    for i in 0..20 {
        let (status, _, _) = submit_for(&app, "u2").await;
        assert_eq!(status, StatusCode::OK, "submission {i}");
        tokio::time::sleep(Duration::from_millis(1001)).await;
    }

    let (status, retry_after, _) = submit_for(&app, "u2").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    // 60s window opened about 20s ago
    assert_eq!(retry_after.as_deref(), Some("40"));
    assert!(!scheduler.queues().contains("u2"));
    assert_eq!(scheduler.limiter().entry("u2").unwrap().count, 20);

    tokio::time::sleep(Duration::from_secs(41)).await;
    let (status, _, _) = submit_for(&app, "u2").await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(log.entries().len(), 21);
}

#[tokio::test(start_paused = true)]
async fn missing_user_id_is_a_client_error() {
    let (app, scheduler, _log) = test_app();

    for body in [
        Body::from(json!({}).to_string()),
        Body::from(json!({ "user_id": "" }).to_string()),
        Body::from("not json"),
        Body::empty(),
    ] {
        let (status, retry_after, payload) = submit(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["message"], "User ID is required");
        assert!(retry_after.is_none());
    }

    assert_eq!(scheduler.queues().active_users(), 0);
    assert_eq!(scheduler.limiter().tracked_users(), 0);
}

#[tokio::test(start_paused = true)]
async fn users_are_limited_independently() {
    let (app, _scheduler, _log) = test_app();

    assert_eq!(submit_for(&app, "alice").await.0, StatusCode::OK);
    assert_eq!(submit_for(&app, "bob").await.0, StatusCode::OK);
    assert_eq!(submit_for(&app, "alice").await.0, StatusCode::TOO_MANY_REQUESTS);

    let (status, _, _) = submit(&app, Body::from(json!({ "user_id": 7 }).to_string())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let (app, _scheduler, _log) = test_app();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["status"], "healthy");

    // make sure at least one counter has been touched
    submit_for(&app, "metrics-user").await;

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("task_gateway_submissions_total"));
}
