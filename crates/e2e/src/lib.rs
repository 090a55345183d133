//! App Gallery E2E Test Framework
//!
//! This crate drives a real browser against a hosted app gallery:
//! - Logs in over HTTP and seeds the browser session with the token
//! - Controls Playwright through a long-lived Node driver (JSON lines)
//! - Clones and runs a gallery app, or opens it with Launch
//! - Validates the running app's UI
//! - Stops and deletes the cloud instance through the control plane
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Gallery E2E Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  GalleryRunner                                              │
//! │    ├── open_gallery_app_page() -> GallerySession           │
//! │    │     ├── auth::login() -> SessionCredentials            │
//! │    │     └── Browser::launch() -> Page                      │
//! │    ├── clone_and_run_from_gallery_app_page(body)            │
//! │    │     ├── wait_for_open_app() -> RunningApp              │
//! │    │     ├── body(RunningApp)   (Ctrl-C / panic safe)       │
//! │    │     └── teardown() -> TeardownReport                   │
//! │    └── launch_from_gallery_app_page(body)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Node driver (driver.js)  <── JSON lines ──>  playwright.rs │
//! │  Control plane (REST)     <── reqwest    ──>  control_plane │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod gallery;
pub mod instance;
pub mod logs;
pub mod playwright;
pub mod runner;
pub mod teardown;
pub mod validate;

pub use config::GalleryConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{GalleryRunner, Scenario, ScenarioResult};
