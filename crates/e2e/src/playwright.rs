//! Playwright browser automation
//!
//! The browser is driven by a long-lived Node process running `driver.js`.
//! Requests and replies are single JSON lines on the child's stdin/stdout:
//!
//! ```text
//! -> {"id":3,"method":"click","params":{"page":1,"selector":"text=Stop","timeout":3000}}
//! <- {"id":3,"ok":true,"result":null}
//! <- {"id":4,"ok":false,"error":{"name":"TimeoutError","message":"..."}}
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::GalleryConfig;
use crate::error::{E2eError, E2eResult};

const DRIVER_SOURCE: &str = include_str!("driver.js");
const DRIVER_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Configuration for launching Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub launch_timeout: Duration,
    pub slow_mo: Duration,
    pub record_video_dir: Option<PathBuf>,
    pub record_har_path: Option<PathBuf>,
    /// Directory `playwright` is resolved from
    pub node_project_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            launch_timeout: Duration::from_secs(5),
            slow_mo: Duration::ZERO,
            record_video_dir: None,
            record_har_path: None,
            node_project_dir: PathBuf::from("."),
        }
    }
}

impl PlaywrightConfig {
    /// Launch settings for exercising one gallery app, recording video per app.
    pub fn for_app(config: &GalleryConfig, app_name: &str) -> Self {
        Self {
            browser: config.browser,
            headless: config.headless,
            slow_mo: Duration::from_millis(config.slow_mo_ms),
            record_video_dir: Some(config.video_dir.join(app_name)),
            record_har_path: Some(config.har_path.clone()),
            node_project_dir: config.node_project_dir.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<DriverFailure>,
}

#[derive(Debug, Deserialize)]
struct DriverFailure {
    name: String,
    message: String,
}

impl DriverFailure {
    fn into_error(self) -> E2eError {
        if self.name == "TimeoutError" {
            E2eError::Timeout(self.message)
        } else {
            E2eError::Playwright(self.message)
        }
    }
}

impl Reply {
    fn into_result(self) -> E2eResult<Value> {
        if self.ok {
            return Ok(self.result);
        }
        Err(self
            .error
            .map(DriverFailure::into_error)
            .unwrap_or_else(|| E2eError::Playwright("driver reported failure without detail".into())))
    }
}

/// Playwright encodes "no timeout" as 0 and "default" as absent.
fn timeout_ms(timeout: Option<Duration>) -> Value {
    match timeout {
        Some(t) => json!(t.as_millis() as u64),
        None => Value::Null,
    }
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Handle to the Node driver process
struct Driver {
    io: Mutex<DriverIo>,
    child: Child,
    next_id: AtomicU64,
    _script_dir: tempfile::TempDir,
}

impl Driver {
    async fn spawn(node_project_dir: &Path) -> E2eResult<Self> {
        Self::check_node_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SOURCE)?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut command = TokioCommand::new("node");
        let mut child = detach_from_terminal(&mut command)
            .arg(&script_path)
            .current_dir(node_project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::DriverExited("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::DriverExited("driver stdout unavailable".into()))?;

        Ok(Self {
            io: Mutex::new(DriverIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            child,
            next_id: AtomicU64::new(1),
            _script_dir: script_dir,
        })
    }

    fn check_node_installed() -> E2eResult<()> {
        let status = Command::new("node")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn call(&self, method: &str, params: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Request { id, method, params })?;
        line.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        loop {
            let Some(raw) = io.stdout.next_line().await? else {
                return Err(E2eError::DriverExited(format!("no reply to {}", method)));
            };
            match serde_json::from_str::<Reply>(&raw) {
                Ok(reply) if reply.id == id => return reply.into_result(),
                Ok(reply) => warn!("Dropping stale driver reply {}", reply.id),
                Err(_) => debug!("[driver] {}", raw),
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        terminate(&mut self.child, DRIVER_SHUTDOWN_GRACE);
    }
}

/// Keep Ctrl-C in the terminal away from the driver so teardown can still
/// drive the browser after an interrupt.
fn detach_from_terminal(command: &mut TokioCommand) -> &mut TokioCommand {
    #[cfg(unix)]
    {
        command.process_group(0);
    }
    command
}

/// SIGTERM, wait up to `grace` for the child to exit, then SIGKILL.
fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                let deadline = std::time::Instant::now() + grace;
                while std::time::Instant::now() < deadline {
                    if matches!(child.try_wait(), Ok(Some(_))) {
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                warn!("Playwright driver ignored SIGTERM for {:?}, killing it", grace);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    let _ = child.start_kill();
}

/// A launched browser with a single recording context
pub struct Browser {
    driver: Arc<Driver>,
}

impl Browser {
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        let driver = Driver::spawn(&config.node_project_dir).await?;

        if let Some(dir) = &config.record_video_dir {
            std::fs::create_dir_all(dir)?;
        }

        driver
            .call(
                "launch",
                json!({
                    "browser": config.browser.as_str(),
                    "headless": config.headless,
                    "timeout": config.launch_timeout.as_millis() as u64,
                    "slowMo": config.slow_mo.as_millis() as u64,
                    "recordVideoDir": config.record_video_dir,
                    "recordHarPath": config.record_har_path,
                }),
            )
            .await?;

        info!("Launched {} (headless: {})", config.browser.as_str(), config.headless);
        Ok(Self { driver: Arc::new(driver) })
    }

    pub async fn new_page(&self) -> E2eResult<Page> {
        let id = self.driver.call("newPage", json!({})).await?;
        Page::from_id(self.driver.clone(), id)
    }

    /// Close the context (flushing video and HAR) and the browser.
    pub async fn close(self) -> E2eResult<()> {
        self.driver.call("close", json!({})).await?;
        Ok(())
    }
}

/// A browser tab
#[derive(Clone)]
pub struct Page {
    driver: Arc<Driver>,
    id: u64,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("id", &self.id).finish()
    }
}

impl Page {
    fn from_id(driver: Arc<Driver>, id: Value) -> E2eResult<Self> {
        let id = id
            .as_u64()
            .ok_or_else(|| E2eError::Playwright(format!("driver returned non-numeric page id: {}", id)))?;
        Ok(Self { driver, id })
    }

    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("page {} goto {}", self.id, url);
        self.driver.call("goto", json!({ "page": self.id, "url": url })).await?;
        Ok(())
    }

    pub async fn reload(&self) -> E2eResult<()> {
        self.driver.call("reload", json!({ "page": self.id })).await?;
        Ok(())
    }

    pub async fn url(&self) -> E2eResult<String> {
        let url = self.driver.call("url", json!({ "page": self.id })).await?;
        url.as_str()
            .map(str::to_string)
            .ok_or_else(|| E2eError::Playwright(format!("driver returned non-string url: {}", url)))
    }

    /// Evaluate `script` in the page, passing `arg` when it is a function.
    pub async fn evaluate<A, T>(&self, script: &str, arg: A) -> E2eResult<T>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let value = self
            .driver
            .call("evaluate", json!({ "page": self.id, "script": script, "arg": arg }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Wait for the `load` state; `Some(Duration::ZERO)` waits forever.
    pub async fn wait_for_load_state(&self, timeout: Option<Duration>) -> E2eResult<()> {
        self.driver
            .call(
                "waitForLoadState",
                json!({ "page": self.id, "state": "load", "timeout": timeout_ms(timeout) }),
            )
            .await?;
        Ok(())
    }

    pub fn locator(&self, selector: &str) -> Locator {
        Locator {
            page: self.clone(),
            frame: None,
            selector: selector.to_string(),
            first: false,
        }
    }

    pub fn frame_locator(&self, frame_selector: &str) -> FrameLocator {
        FrameLocator {
            page: self.clone(),
            frame: frame_selector.to_string(),
        }
    }
}

/// Locator scope inside an iframe
pub struct FrameLocator {
    page: Page,
    frame: String,
}

impl FrameLocator {
    pub fn locator(&self, selector: &str) -> Locator {
        Locator {
            page: self.page.clone(),
            frame: Some(self.frame.clone()),
            selector: selector.to_string(),
            first: false,
        }
    }
}

/// Lazily resolved element query, re-evaluated on every call
#[derive(Clone)]
pub struct Locator {
    page: Page,
    frame: Option<String>,
    selector: String,
    first: bool,
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("page", &self.page.id)
            .field("frame", &self.frame)
            .field("selector", &self.selector)
            .field("first", &self.first)
            .finish()
    }
}

impl Locator {
    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn params(&self, timeout: Option<Duration>) -> Value {
        json!({
            "page": self.page.id,
            "frame": self.frame,
            "selector": self.selector,
            "first": self.first,
            "timeout": timeout_ms(timeout),
        })
    }

    /// Wait until the element is visible.
    pub async fn wait_for(&self, timeout: Duration) -> E2eResult<()> {
        let mut params = self.params(Some(timeout));
        params["state"] = json!("visible");
        self.page.driver.call("waitFor", params).await?;
        Ok(())
    }

    pub async fn click(&self, timeout: Option<Duration>) -> E2eResult<()> {
        self.page.driver.call("click", self.params(timeout)).await?;
        Ok(())
    }

    pub async fn is_disabled(&self) -> E2eResult<bool> {
        let value = self.page.driver.call("isDisabled", self.params(None)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn count(&self) -> E2eResult<usize> {
        let value = self.page.driver.call("count", self.params(None)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Click and return the page the click opened.
    pub async fn click_expect_page(&self, timeout: Option<Duration>) -> E2eResult<Page> {
        let id = self.page.driver.call("clickExpectPage", self.params(timeout)).await?;
        Page::from_id(self.page.driver.clone(), id)
    }

    /// Click and wait for the owning page to navigate.
    pub async fn click_expect_navigation(&self, timeout: Option<Duration>) -> E2eResult<()> {
        self.page.driver.call("clickExpectNavigation", self.params(timeout)).await?;
        Ok(())
    }
}
