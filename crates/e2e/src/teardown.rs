//! Best-effort cleanup of a cloned app instance

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::control_plane::InstanceControl;
use crate::error::{E2eError, E2eResult};
use crate::instance::InstanceId;
use crate::logs::{print_logs, FETCH_LOGS_SCRIPT};
use crate::playwright::Page;

const STOP_SELECTOR: &str = "text=Stop";
const STOP_WAIT: Duration = Duration::from_secs(3);

/// The admin page operations teardown relies on
#[async_trait]
pub trait AdminControls: Send + Sync {
    /// Entries collected by the log hook so far
    async fn fetch_logs(&self) -> E2eResult<Vec<String>>;

    /// Stop the running instance from the UI
    async fn click_stop(&self) -> E2eResult<()>;
}

#[async_trait]
impl AdminControls for Page {
    async fn fetch_logs(&self) -> E2eResult<Vec<String>> {
        self.evaluate(FETCH_LOGS_SCRIPT, ()).await
    }

    async fn click_stop(&self) -> E2eResult<()> {
        let stop = self.locator(STOP_SELECTOR);
        stop.wait_for(STOP_WAIT).await?;
        stop.click(None).await
    }
}

/// What teardown managed to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub logs_printed: usize,
    pub stop_clicked: bool,
    pub deleted: bool,
    pub delete_error: Option<String>,
}

/// Drain logs, stop the instance, and delete it through the control plane.
///
/// Never fails: each step's error is logged and the next step still runs.
pub async fn teardown<A, C>(admin: &A, control: &C, instance_id: &InstanceId) -> TeardownReport
where
    A: AdminControls + ?Sized,
    C: InstanceControl + ?Sized,
{
    println!("##################### DELETING APP {}", instance_id);
    let mut report = drain_and_stop(admin).await;

    match delete_instance(control, instance_id).await {
        Ok(()) => {
            info!("Deleted app {}", instance_id);
            report.deleted = true;
        }
        Err(e) => {
            if !e.is_api() {
                warn!("Delete did not reach a control-plane verdict");
            }
            println!("Failed to delete app {}. Exception {}", instance_id, e);
            report.delete_error = Some(e.to_string());
        }
    }

    report
}

/// Drain logs and stop an instance whose id was never learned.
///
/// Used when the app never opened, so there is nothing to delete by id.
pub async fn stop_unopened<A>(admin: &A) -> TeardownReport
where
    A: AdminControls + ?Sized,
{
    println!("##################### STOPPING UNOPENED APP");
    drain_and_stop(admin).await
}

async fn drain_and_stop<A>(admin: &A) -> TeardownReport
where
    A: AdminControls + ?Sized,
{
    let mut report = TeardownReport::default();

    match admin.fetch_logs().await {
        Ok(logs) => report.logs_printed = print_logs(&logs),
        Err(e) => warn!("Could not fetch captured logs: {}", e),
    }

    match admin.click_stop().await {
        Ok(()) => report.stop_clicked = true,
        Err(e) => debug!("Stop button unavailable: {}", e),
    }

    report
}

async fn delete_instance<C>(control: &C, instance_id: &InstanceId) -> E2eResult<()>
where
    C: InstanceControl + ?Sized,
{
    let project = control.current_project().await?;
    let response = control
        .delete_instance(&project.project_id, instance_id.as_str())
        .await?;

    if response.as_object().is_some_and(|o| o.is_empty()) {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "delete returned {} instead of an empty object",
            response
        )))
    }
}
