//! Gallery workflows: opening an app listing, launching it, cloning and running it

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::auth;
use crate::config::GalleryConfig;
use crate::control_plane::InstanceControl;
use crate::error::{E2eError, E2eResult};
use crate::instance::InstanceId;
use crate::logs::LOG_HOOK_SCRIPT;
use crate::playwright::{Browser, Locator, Page, PlaywrightConfig};
use crate::teardown::{stop_unopened, teardown, AdminControls, TeardownReport};

const LAUNCH_SELECTOR: &str = "text=Launch";
const CLONE_AND_RUN_SELECTOR: &str = "text=Clone & Run";
const OPEN_APP_SELECTOR: &str = "text=Open App";

/// Pause after Clone & Run before touching the admin page
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Sleep between checks while "Open App" is still disabled
pub const OPEN_APP_POLL_INTERVAL: Duration = Duration::from_secs(5);

const OPEN_APP_VISIBLE_WAIT: Duration = Duration::from_secs(1);

/// The browser plus the gallery tab, positioned on one app's detail page
pub struct GallerySession {
    pub browser: Browser,
    pub gallery_page: Page,
}

impl GallerySession {
    pub async fn close(self) -> E2eResult<()> {
        self.browser.close().await
    }
}

/// Log in, seed the browser session and open `app_name` in the gallery.
pub async fn open_gallery_app_page(config: &GalleryConfig, app_name: &str) -> E2eResult<GallerySession> {
    if app_name.trim().is_empty() {
        return Err(E2eError::Config("app name must not be empty".into()));
    }

    let browser = Browser::launch(&PlaywrightConfig::for_app(config, app_name)).await?;
    let gallery_page = browser.new_page().await?;

    let http = reqwest::Client::new();
    let credentials = auth::login(&http, config).await?;

    gallery_page.goto(&config.url).await?;
    credentials.seed(&gallery_page).await?;
    gallery_page.goto(&config.endpoint("/apps")).await?;

    info!("Opening '{}' in the gallery", app_name);
    gallery_page
        .locator(&format!("text={}", app_name))
        .first()
        .click(None)
        .await?;

    Ok(GallerySession { browser, gallery_page })
}

/// Run `fut`, giving up on it if Ctrl-C arrives first.
pub async fn until_interrupted<F: Future>(fut: F) -> Option<F::Output> {
    tokio::pin!(fut);
    tokio::select! {
        out = &mut fut => Some(out),
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                warn!("Interrupted, moving on to cleanup");
                None
            }
            Err(e) => {
                warn!("Cannot listen for Ctrl-C: {}", e);
                Some(fut.await)
            }
        },
    }
}

/// How the scope body ended
#[derive(Debug)]
pub enum BodyOutcome<T> {
    Completed(T),
    Failed(E2eError),
    Interrupted,
}

impl<T> BodyOutcome<T> {
    fn from_run(run: Option<E2eResult<T>>) -> Self {
        match run {
            Some(Ok(value)) => BodyOutcome::Completed(value),
            Some(Err(e)) => BodyOutcome::Failed(e),
            None => BodyOutcome::Interrupted,
        }
    }

    /// Interruption counts as success; only a body error fails.
    pub fn into_result(self) -> E2eResult<Option<T>> {
        match self {
            BodyOutcome::Completed(value) => Ok(Some(value)),
            BodyOutcome::Failed(e) => Err(e),
            BodyOutcome::Interrupted => Ok(None),
        }
    }
}

/// Click Launch and run `body` against the tab it opens.
pub async fn launch_from_gallery_app_page<F, Fut, T>(gallery_page: &Page, body: F) -> E2eResult<BodyOutcome<T>>
where
    F: FnOnce(Page) -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let app_page = gallery_page
        .locator(LAUNCH_SELECTOR)
        .click_expect_page(None)
        .await?;
    app_page.wait_for_load_state(Some(Duration::ZERO)).await?;

    Ok(BodyOutcome::from_run(until_interrupted(body(app_page)).await))
}

/// The cloned instance: its admin tab, its own tab, and its id
#[derive(Clone, Debug)]
pub struct RunningApp {
    pub admin_page: Page,
    pub app_page: Page,
    pub instance_id: InstanceId,
}

impl RunningApp {
    pub async fn fetch_logs(&self) -> E2eResult<Vec<String>> {
        self.admin_page.fetch_logs().await
    }
}

/// Result of a clone-and-run scope
#[derive(Debug)]
pub struct CloneAndRunOutcome<T> {
    pub instance_id: InstanceId,
    pub body: BodyOutcome<T>,
    pub teardown: TeardownReport,
}

/// Clone & Run the app shown on `app_gallery_page`, run `body` against the
/// running instance, then tear the instance down.
///
/// Teardown runs whether `body` returns, fails, panics or is interrupted;
/// a panic is resumed once teardown is done.
pub async fn clone_and_run_from_gallery_app_page<C, F, Fut, T>(
    app_gallery_page: &Page,
    config: &GalleryConfig,
    control: &C,
    body: F,
) -> E2eResult<CloneAndRunOutcome<T>>
where
    C: InstanceControl + ?Sized,
    F: FnOnce(RunningApp) -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let running = start_clone_and_run(app_gallery_page, config.open_app_max_wait()).await?;
    let instance_id = running.instance_id.clone();
    let admin_page = running.admin_page.clone();

    let (body, report) = run_with_teardown(&admin_page, control, &instance_id, running, body).await;

    Ok(CloneAndRunOutcome {
        instance_id,
        body,
        teardown: report,
    })
}

/// Run `body(app)` and then `teardown`, whatever way the body ends.
///
/// Interruption and errors come back in the outcome; a panic is resumed
/// after teardown.
pub async fn run_with_teardown<A, C, R, F, Fut, T>(
    admin: &A,
    control: &C,
    instance_id: &InstanceId,
    app: R,
    body: F,
) -> (BodyOutcome<T>, TeardownReport)
where
    A: AdminControls + ?Sized,
    C: InstanceControl + ?Sized,
    F: FnOnce(R) -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let run = AssertUnwindSafe(until_interrupted(body(app)))
        .catch_unwind()
        .await;

    let report = teardown(admin, control, instance_id).await;

    match run {
        Ok(run) => (BodyOutcome::from_run(run), report),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

async fn start_clone_and_run(app_gallery_page: &Page, max_wait: Option<Duration>) -> E2eResult<RunningApp> {
    app_gallery_page
        .locator(CLONE_AND_RUN_SELECTOR)
        .click_expect_navigation(None)
        .await?;
    let admin_page = app_gallery_page.clone();

    sleep(SETTLE_DELAY).await;
    admin_page
        .evaluate::<_, serde_json::Value>(LOG_HOOK_SCRIPT, ())
        .await?;

    let open_app = admin_page.locator(OPEN_APP_SELECTOR);
    let app_page = open_running_app(&admin_page, &open_app, max_wait).await?;

    let instance_id = InstanceId::from_app_url(&app_page.url().await?)?;
    println!("The Lightning Id Name : {}", instance_id);

    Ok(RunningApp {
        admin_page,
        app_page,
        instance_id,
    })
}

/// The "Open App" control on the admin page
#[async_trait]
pub trait OpenAppButton: Send + Sync {
    /// What clicking the button opens
    type Opened: Send;

    async fn wait_visible(&self, timeout: Duration) -> E2eResult<()>;

    async fn is_disabled(&self) -> E2eResult<bool>;

    /// Click, then wait for the opened tab to finish loading
    async fn open(&self) -> E2eResult<Self::Opened>;
}

#[async_trait]
impl OpenAppButton for Locator {
    type Opened = Page;

    async fn wait_visible(&self, timeout: Duration) -> E2eResult<()> {
        self.wait_for(timeout).await
    }

    async fn is_disabled(&self) -> E2eResult<bool> {
        Locator::is_disabled(self).await
    }

    async fn open(&self) -> E2eResult<Page> {
        let app_page = self.click_expect_page(None).await?;
        app_page.wait_for_load_state(Some(Duration::ZERO)).await?;
        Ok(app_page)
    }
}

/// Open the app, or on giving up drain logs and click Stop before
/// returning the timeout.
pub async fn open_running_app<A, B>(admin: &A, open_app: &B, max_wait: Option<Duration>) -> E2eResult<B::Opened>
where
    A: AdminControls + ?Sized,
    B: OpenAppButton + ?Sized,
{
    match wait_for_open_app(open_app, max_wait).await {
        Err(E2eError::Timeout(reason)) => {
            stop_unopened(admin).await;
            Err(E2eError::Timeout(reason))
        }
        other => other,
    }
}

/// Poll until "Open App" is enabled, click it and return what it opens.
///
/// Browser errors and timeouts are retried. With `max_wait` unset the loop
/// never gives up.
pub async fn wait_for_open_app<B>(open_app: &B, max_wait: Option<Duration>) -> E2eResult<B::Opened>
where
    B: OpenAppButton + ?Sized,
{
    let started = Instant::now();
    let mut attempts: u64 = 0;

    loop {
        if let Some(limit) = max_wait {
            if started.elapsed() >= limit {
                return Err(E2eError::Timeout(format!(
                    "{} to become enabled after {} attempts",
                    OPEN_APP_SELECTOR, attempts
                )));
            }
        }
        attempts += 1;

        match try_open_app(open_app).await {
            Ok(Some(opened)) => {
                info!("App opened after {} attempt(s)", attempts);
                return Ok(opened);
            }
            Ok(None) => {
                debug!("Open App still disabled (attempt {})", attempts);
                sleep(OPEN_APP_POLL_INTERVAL).await;
            }
            Err(e) if e.is_transient() => debug!("Open App not ready: {}", e),
            Err(e) => return Err(e),
        }
    }
}

async fn try_open_app<B>(open_app: &B) -> E2eResult<Option<B::Opened>>
where
    B: OpenAppButton + ?Sized,
{
    open_app.wait_visible(OPEN_APP_VISIBLE_WAIT).await?;

    if open_app.is_disabled().await? {
        return Ok(None);
    }

    open_app.open().await.map(Some)
}
