//! Clone-and-run scoping: teardown on every exit path, and cleanup when
//! "Open App" never enables

mod common;

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde_json::json;

use gallery_e2e::gallery::{open_running_app, run_with_teardown, BodyOutcome};
use gallery_e2e::{E2eError, E2eResult};

use common::{instance, DisabledButton, FakeAdmin, FakeControl};

async fn create_notebook(app: &'static str) -> E2eResult<usize> {
    assert_eq!(app, "app-page");
    Ok(1)
}

async fn count_mismatch(_app: &'static str) -> E2eResult<usize> {
    Err(E2eError::AssertionFailed("expected exactly 1 JUPYTERLAB button, found 0".into()))
}

async fn validation_panics(_app: &'static str) -> E2eResult<usize> {
    panic!("validation blew up")
}

#[tokio::test]
async fn completed_body_is_torn_down() {
    let admin = FakeAdmin::default();
    let control = FakeControl::answering(Ok(json!({})));

    let (body, report) = run_with_teardown(&admin, &control, &instance(), "app-page", create_notebook).await;

    assert!(matches!(body, BodyOutcome::Completed(1)));
    assert!(report.deleted);
    assert_eq!(admin.calls(), vec!["fetch_logs", "click_stop"]);
}

#[tokio::test]
async fn failing_body_is_torn_down_and_reported() {
    let admin = FakeAdmin::default();
    let control = FakeControl::answering(Ok(json!({})));

    let (body, report) = run_with_teardown(&admin, &control, &instance(), "app-page", count_mismatch).await;

    assert!(matches!(body, BodyOutcome::Failed(E2eError::AssertionFailed(_))));
    assert!(report.stop_clicked);
    assert!(report.deleted);
    assert_eq!(control.deletes(), 1);
}

#[tokio::test]
async fn panicking_body_is_torn_down_then_resumed() {
    let admin = FakeAdmin::default();
    let control = FakeControl::answering(Ok(json!({})));

    let caught = AssertUnwindSafe(run_with_teardown(
        &admin,
        &control,
        &instance(),
        "app-page",
        validation_panics,
    ))
    .catch_unwind()
    .await;

    let panic = caught.expect_err("panic resurfaces after teardown");
    assert_eq!(panic.downcast_ref::<&str>(), Some(&"validation blew up"));
    assert_eq!(admin.calls(), vec!["fetch_logs", "click_stop"]);
    assert_eq!(control.deletes(), 1);
}

#[tokio::test(start_paused = true)]
async fn open_app_timeout_stops_the_instance() {
    let admin = FakeAdmin::default();
    let button = DisabledButton::default();

    let err = open_running_app(&admin, &button, Some(Duration::from_secs(12)))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::Timeout(_)));
    assert_eq!(*button.checks.lock().unwrap(), 3);
    assert_eq!(admin.calls(), vec!["fetch_logs", "click_stop"]);
}
