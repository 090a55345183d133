//! Teardown ordering and error suppression, against in-memory fakes

mod common;

use serde_json::json;

use gallery_e2e::teardown::{stop_unopened, teardown};
use gallery_e2e::E2eError;

use common::{instance, FakeAdmin, FakeControl};

#[tokio::test]
async fn teardown_prints_logs_stops_and_deletes() {
    let admin = FakeAdmin {
        logs: vec!["a".into(), "b".into(), "a".into()],
        ..Default::default()
    };
    let control = FakeControl::answering(Ok(json!({})));

    let report = teardown(&admin, &control, &instance()).await;

    assert_eq!(report.logs_printed, 2);
    assert!(report.stop_clicked);
    assert!(report.deleted);
    assert!(report.delete_error.is_none());
    assert_eq!(admin.calls(), vec!["fetch_logs", "click_stop"]);
    assert_eq!(
        *control.deleted.lock().unwrap(),
        vec![("proj-1".to_string(), "my-app-abc123".to_string())]
    );
}

#[tokio::test]
async fn teardown_deletes_even_when_stop_times_out() {
    let admin = FakeAdmin {
        stop_fails: true,
        logs_fail: true,
        ..Default::default()
    };
    let control = FakeControl::answering(Ok(json!({})));

    let report = teardown(&admin, &control, &instance()).await;

    assert!(!report.stop_clicked);
    assert_eq!(report.logs_printed, 0);
    assert!(report.deleted);
    assert_eq!(control.deletes(), 1);
}

#[tokio::test]
async fn teardown_swallows_api_errors() {
    let admin = FakeAdmin::default();
    let control = FakeControl::answering(Err(E2eError::Api {
        status: 404,
        body: "app instance not found".into(),
    }));

    let report = teardown(&admin, &control, &instance()).await;

    assert!(!report.deleted);
    let err = report.delete_error.expect("delete error recorded");
    assert!(err.contains("404"));
}

#[tokio::test]
async fn teardown_flags_non_empty_delete_response() {
    let admin = FakeAdmin::default();
    let control = FakeControl::answering(Ok(json!({ "status": "pending" })));

    let report = teardown(&admin, &control, &instance()).await;

    assert!(!report.deleted);
    assert!(report.delete_error.unwrap().contains("empty object"));
}

#[tokio::test]
async fn stop_unopened_drains_and_stops_without_deleting() {
    let admin = FakeAdmin {
        logs: vec!["booting".into(), "booting".into()],
        ..Default::default()
    };

    let report = stop_unopened(&admin).await;

    assert_eq!(report.logs_printed, 1);
    assert!(report.stop_clicked);
    assert!(!report.deleted);
    assert!(report.delete_error.is_none());
    assert_eq!(admin.calls(), vec!["fetch_logs", "click_stop"]);
}
