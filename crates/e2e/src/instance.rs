//! Identifying the running app instance

use std::fmt;

use crate::error::{E2eError, E2eResult};

/// Instance id, the first DNS label of the running app's URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    /// `https://my-app-abc123.example.com/view` -> `my-app-abc123`
    ///
    /// Takes the text before the first `.`, then drops everything up to the
    /// last `//`.
    pub fn from_app_url(url: &str) -> E2eResult<Self> {
        let head = url.split('.').next().unwrap_or(url);
        let id = head.rsplit("//").next().unwrap_or(head);
        if id.is_empty() {
            return Err(E2eError::InvalidAppUrl(url.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
