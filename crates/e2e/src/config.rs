//! Run configuration, read from flags with environment fallbacks

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::error::{E2eError, E2eResult};
use crate::playwright::BrowserKind;

/// Everything a gallery run needs to know about the target deployment
#[derive(Args, Debug, Clone)]
pub struct GalleryConfig {
    /// Base URL of the gallery and its API
    #[arg(long, env = "LIGHTNING_CLOUD_URL", default_value = "https://lightning.ai")]
    pub url: String,

    /// User id stored in the browser session
    #[arg(long, env = "LIGHTNING_USER_ID")]
    pub user_id: String,

    /// API key used for login and control-plane calls
    #[arg(long, env = "LIGHTNING_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "LIGHTNING_USERNAME")]
    pub username: String,

    /// Project to delete instances from (first membership when unset)
    #[arg(long, env = "LIGHTNING_CLOUD_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Gallery app to exercise; the scenario is skipped when unset
    #[arg(long, env = "TEST_APP_NAME")]
    pub app_name: Option<String>,

    /// Run the browser headless (`1`) or headed (`0`)
    #[arg(long, env = "HEADLESS", default_value = "0", value_parser = parse_flag, action = clap::ArgAction::Set)]
    pub headless: bool,

    #[arg(long, env = "VIDEO_LOCATION", default_value = "./artifacts/videos")]
    pub video_dir: PathBuf,

    #[arg(long, env = "HAR_LOCATION", default_value = "./artifacts/hars")]
    pub har_path: PathBuf,

    /// Delay between browser operations, in milliseconds
    #[arg(long, env = "SLOW_MO", default_value = "0")]
    pub slow_mo_ms: u64,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long, env = "GALLERY_BROWSER", default_value = "chromium")]
    pub browser: BrowserKind,

    /// Directory `playwright` is resolved from
    #[arg(long, env = "PLAYWRIGHT_NODE_DIR", default_value = ".")]
    pub node_project_dir: PathBuf,

    /// Upper bound on waiting for "Open App" (unbounded when unset)
    #[arg(long, env = "OPEN_APP_MAX_WAIT_SECS")]
    pub open_app_max_wait_secs: Option<u64>,

    /// Output directory for results
    #[arg(long, env = "GALLERY_OUTPUT_DIR", default_value = "test-results")]
    pub output_dir: PathBuf,
}

#[derive(clap::Parser)]
struct EnvOnly {
    #[command(flatten)]
    config: GalleryConfig,
}

impl GalleryConfig {
    /// Build the configuration from environment variables alone.
    pub fn from_env() -> E2eResult<Self> {
        Self::try_from_args([env!("CARGO_PKG_NAME")])
    }

    /// Parse flags (first item is the program name), falling back to the environment.
    pub fn try_from_args<I, T>(args: I) -> E2eResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        use clap::Parser;

        EnvOnly::try_parse_from(args)
            .map(|parsed| parsed.config)
            .map_err(|e| E2eError::Config(e.to_string()))
    }

    /// Whether `TEST_APP_NAME` (or `--app-name`) names a non-empty app.
    pub fn should_run(&self) -> bool {
        self.app_name.as_deref().is_some_and(is_runnable_app_name)
    }

    pub fn require_app_name(&self) -> E2eResult<&str> {
        match self.app_name.as_deref() {
            Some(name) if is_runnable_app_name(name) => Ok(name),
            _ => Err(E2eError::Config("TEST_APP_NAME environment variable is not set".into())),
        }
    }

    pub fn open_app_max_wait(&self) -> Option<Duration> {
        self.open_app_max_wait_secs.map(Duration::from_secs)
    }

    /// `<base>/<path>` with exactly one slash at the join.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// A blank name counts as unset.
pub fn is_runnable_app_name(name: &str) -> bool {
    !name.trim().is_empty()
}

/// `TEST_APP_NAME` without parsing the rest of the configuration
pub fn app_name_from_env() -> Option<String> {
    std::env::var("TEST_APP_NAME")
        .ok()
        .filter(|name| is_runnable_app_name(name))
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => other
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| format!("expected 0 or 1, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GalleryConfig {
        let mut argv = vec!["gallery-e2e", "--user-id", "u1", "--api-key", "k1", "--username", "alice"];
        argv.extend_from_slice(args);
        GalleryConfig::try_from_args(argv).unwrap()
    }

    #[test]
    fn test_parse_flag_values() {
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("0"), Ok(false));
        assert_eq!(parse_flag("2"), Ok(true));
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_headless_flag_takes_value() {
        assert!(parse(&["--headless", "1"]).headless);
        assert!(!parse(&["--headless", "0"]).headless);
    }

    #[test]
    fn test_app_name_gates_run() {
        assert!(parse(&["--app-name", "demo-app"]).should_run());
        assert!(!parse(&["--app-name", "  "]).should_run());
        assert!(parse(&["--app-name", " "]).require_app_name().is_err());
        assert_eq!(parse(&["--app-name", "demo-app"]).require_app_name().unwrap(), "demo-app");
    }

    #[test]
    fn test_blank_app_name_is_not_runnable() {
        assert!(is_runnable_app_name("demo-app"));
        assert!(!is_runnable_app_name(""));
        assert!(!is_runnable_app_name(" \t"));
    }

    #[test]
    fn test_endpoint_join() {
        let cfg = parse(&["--url", "https://gallery.example.com/"]);
        assert_eq!(cfg.endpoint("/v1/auth/login"), "https://gallery.example.com/v1/auth/login");
        assert_eq!(cfg.endpoint("apps"), "https://gallery.example.com/apps");
    }

    #[test]
    fn test_open_app_wait_defaults_unbounded() {
        assert_eq!(parse(&[]).open_app_max_wait(), None);
        assert_eq!(parse(&["--open-app-max-wait-secs", "90"]).open_app_max_wait(), Some(Duration::from_secs(90)));
    }
}
