//! Checks run against the app's own page once it is up

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::playwright::Page;

const APP_FRAME: &str = "iframe";
const NAME_INPUT_SELECTOR: &str = "text=Enter your name";
const CREATE_NOTEBOOK_SELECTOR: &str = r#"button:has-text("Create Jupyter Notebook")"#;
const NOTEBOOK_BUTTON_SELECTOR: &str = "button:has-text('JUPYTERLAB')";

const RELOAD_SETTLE: Duration = Duration::from_secs(5);
const NAME_INPUT_WAIT: Duration = Duration::from_secs(30);
const CREATE_BUTTON_WAIT: Duration = Duration::from_secs(5);
const AFTER_CREATE: Duration = Duration::from_secs(2);

/// Create a notebook through the app UI and check exactly one shows up.
pub async fn validate_app_functionalities(app_page: &Page) -> E2eResult<()> {
    wait_for_app_ui(app_page).await?;

    let create_button = app_page
        .frame_locator(APP_FRAME)
        .locator(CREATE_NOTEBOOK_SELECTOR);
    create_button.wait_for(CREATE_BUTTON_WAIT).await?;
    create_button.click(None).await?;
    info!("Requested a new notebook");

    sleep(AFTER_CREATE).await;
    app_page.reload().await?;
    sleep(RELOAD_SETTLE).await;

    let notebooks = app_page.locator(NOTEBOOK_BUTTON_SELECTOR).count().await?;
    check_notebook_count(notebooks)
}

/// Reload until the app frame renders its name input. Retries forever.
async fn wait_for_app_ui(app_page: &Page) -> E2eResult<()> {
    let input = app_page.frame_locator(APP_FRAME).locator(NAME_INPUT_SELECTOR);
    let mut attempts: u64 = 0;

    loop {
        attempts += 1;
        let attempt = async {
            app_page.reload().await?;
            sleep(RELOAD_SETTLE).await;
            input.wait_for(NAME_INPUT_WAIT).await
        };

        match attempt.await {
            Ok(()) => {
                info!("App UI ready after {} reload(s)", attempts);
                return Ok(());
            }
            Err(e) if e.is_transient() => debug!("App UI not ready: {}", e),
            Err(e) => return Err(e),
        }
    }
}

fn check_notebook_count(count: usize) -> E2eResult<()> {
    if count == 1 {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "expected exactly 1 JUPYTERLAB button, found {}",
            count
        )))
    }
}
