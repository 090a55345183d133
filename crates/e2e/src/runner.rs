//! Scenario runner that ties login, gallery workflows, validation and cleanup together

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::GalleryConfig;
use crate::control_plane::ControlPlaneClient;
use crate::error::E2eResult;
use crate::gallery::{
    clone_and_run_from_gallery_app_page, launch_from_gallery_app_page, open_gallery_app_page, BodyOutcome,
};
use crate::teardown::TeardownReport;
use crate::validate::validate_app_functionalities;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Clone & Run the app, validate it, then stop and delete the instance
    CloneAndRun,
    /// Open the app with the Launch button and validate it
    Launch,
}

/// Result of running one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub app_name: String,
    pub scenario: Scenario,
    pub success: bool,
    pub interrupted: bool,
    pub instance_id: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub teardown: Option<TeardownReport>,
}

impl ScenarioResult {
    fn new(app_name: &str, scenario: Scenario) -> Self {
        Self {
            app_name: app_name.to_string(),
            scenario,
            success: false,
            interrupted: false,
            instance_id: None,
            error: None,
            started_at: Utc::now(),
            duration_ms: 0,
            teardown: None,
        }
    }

    fn record_body<T>(&mut self, body: BodyOutcome<T>) {
        match body {
            BodyOutcome::Completed(_) => self.success = true,
            BodyOutcome::Failed(e) => self.error = Some(e.to_string()),
            BodyOutcome::Interrupted => {
                self.success = true;
                self.interrupted = true;
            }
        }
    }
}

/// Runs gallery scenarios against one deployment
pub struct GalleryRunner {
    config: GalleryConfig,
}

impl GalleryRunner {
    pub fn new(config: GalleryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    /// Run `scenario` for the configured app.
    ///
    /// Configuration problems are returned as errors; anything that goes
    /// wrong in the browser is captured in the result instead.
    pub async fn run(&self, scenario: Scenario) -> E2eResult<ScenarioResult> {
        let app_name = self.config.require_app_name()?.to_string();
        let control = ControlPlaneClient::new(&self.config)?;
        let start = Instant::now();
        let mut result = ScenarioResult::new(&app_name, scenario);

        info!("Running {:?} for '{}'", scenario, app_name);

        match open_gallery_app_page(&self.config, &app_name).await {
            Ok(session) => {
                let run = match scenario {
                    Scenario::CloneAndRun => {
                        clone_and_run_from_gallery_app_page(
                            &session.gallery_page,
                            &self.config,
                            &control,
                            |app| async move { validate_app_functionalities(&app.app_page).await },
                        )
                        .await
                        .map(|outcome| {
                            result.instance_id = Some(outcome.instance_id.to_string());
                            result.teardown = Some(outcome.teardown);
                            outcome.body
                        })
                    }
                    Scenario::Launch => {
                        launch_from_gallery_app_page(&session.gallery_page, |app_page| async move {
                            validate_app_functionalities(&app_page).await
                        })
                        .await
                    }
                };

                match run {
                    Ok(body) => result.record_body(body),
                    Err(e) => result.error = Some(e.to_string()),
                }

                if let Err(e) = session.close().await {
                    warn!("Browser did not close cleanly: {}", e);
                }
            }
            Err(e) => result.error = Some(e.to_string()),
        }

        result.duration_ms = start.elapsed().as_millis() as u64;

        if result.success {
            info!("✓ {} ({} ms)", app_name, result.duration_ms);
        } else {
            error!("✗ {} - {}", app_name, result.error.as_deref().unwrap_or("unknown error"));
        }

        Ok(result)
    }

    /// Write a scenario result to JSON in the output directory
    pub fn write_results(&self, result: &ScenarioResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let file_name = format!("gallery-{}-{}.json", result.app_name, scenario_slug(result.scenario));
        let path = self.config.output_dir.join(file_name);
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

fn scenario_slug(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::CloneAndRun => "clone-and-run",
        Scenario::Launch => "launch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;

    #[test]
    fn test_interrupted_run_is_not_a_failure() {
        let mut result = ScenarioResult::new("demo-app", Scenario::CloneAndRun);
        result.record_body::<()>(BodyOutcome::Interrupted);
        assert!(result.success);
        assert!(result.interrupted);
    }

    #[test]
    fn test_failed_body_records_error() {
        let mut result = ScenarioResult::new("demo-app", Scenario::Launch);
        result.record_body::<()>(BodyOutcome::Failed(E2eError::AssertionFailed("found 0".into())));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Assertion failed: found 0"));
    }

    #[test]
    fn test_result_serializes_scenario_kebab_case() {
        let result = ScenarioResult::new("demo-app", Scenario::CloneAndRun);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scenario"], "clone-and-run");
        assert_eq!(json["app_name"], "demo-app");
    }

    #[test]
    fn test_write_results_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let config = GalleryConfig::try_from_args([
            "t", "--user-id", "u", "--api-key", "k", "--username", "n",
            "--output-dir", out.to_str().unwrap(),
        ])
        .unwrap();

        let runner = GalleryRunner::new(config);
        let result = ScenarioResult::new("demo-app", Scenario::Launch);
        let path = runner.write_results(&result).unwrap();
        assert_eq!(path, out.join("gallery-demo-app-launch.json"));

        let written: ScenarioResult = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.scenario, Scenario::Launch);
    }
}
