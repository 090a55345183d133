//! In-memory stand-ins for the admin page, the Open App control and the control plane

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use gallery_e2e::control_plane::{InstanceControl, Membership};
use gallery_e2e::gallery::OpenAppButton;
use gallery_e2e::instance::InstanceId;
use gallery_e2e::teardown::AdminControls;
use gallery_e2e::{E2eError, E2eResult};

#[derive(Default)]
pub struct FakeAdmin {
    pub logs: Vec<String>,
    pub logs_fail: bool,
    pub stop_fails: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeAdmin {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminControls for FakeAdmin {
    async fn fetch_logs(&self) -> E2eResult<Vec<String>> {
        self.calls.lock().unwrap().push("fetch_logs");
        if self.logs_fail {
            return Err(E2eError::Playwright("Target closed".into()));
        }
        Ok(self.logs.clone())
    }

    async fn click_stop(&self) -> E2eResult<()> {
        self.calls.lock().unwrap().push("click_stop");
        if self.stop_fails {
            return Err(E2eError::Timeout("text=Stop".into()));
        }
        Ok(())
    }
}

pub struct FakeControl {
    response: E2eResult<Value>,
    pub deleted: Mutex<Vec<(String, String)>>,
}

impl FakeControl {
    pub fn answering(response: E2eResult<Value>) -> Self {
        Self {
            response,
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn deletes(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl InstanceControl for FakeControl {
    async fn current_project(&self) -> E2eResult<Membership> {
        Ok(Membership {
            project_id: "proj-1".into(),
            name: "default".into(),
        })
    }

    async fn delete_instance(&self, project_id: &str, id: &str) -> E2eResult<Value> {
        self.deleted
            .lock()
            .unwrap()
            .push((project_id.to_string(), id.to_string()));
        match &self.response {
            Ok(v) => Ok(v.clone()),
            Err(E2eError::Api { status, body }) => Err(E2eError::Api {
                status: *status,
                body: body.clone(),
            }),
            Err(e) => Err(E2eError::Playwright(e.to_string())),
        }
    }
}

/// An "Open App" button that stays disabled
#[derive(Default)]
pub struct DisabledButton {
    pub checks: Mutex<usize>,
}

#[async_trait]
impl OpenAppButton for DisabledButton {
    type Opened = ();

    async fn wait_visible(&self, _timeout: Duration) -> E2eResult<()> {
        *self.checks.lock().unwrap() += 1;
        Ok(())
    }

    async fn is_disabled(&self) -> E2eResult<bool> {
        Ok(true)
    }

    async fn open(&self) -> E2eResult<()> {
        Err(E2eError::Playwright("disabled buttons do not open".into()))
    }
}

pub fn instance() -> InstanceId {
    InstanceId::from_app_url("https://my-app-abc123.example.com/view").unwrap()
}
