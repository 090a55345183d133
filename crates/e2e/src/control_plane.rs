//! REST client for the cloud control plane

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::GalleryConfig;
use crate::error::{E2eError, E2eResult};

/// A project the account can deploy into
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Membership {
    #[serde(rename = "projectId", alias = "project_id")]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct MembershipList {
    #[serde(default)]
    memberships: Vec<Membership>,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: String,
    #[serde(default)]
    name: String,
}

/// Operations teardown needs from the control plane
#[async_trait]
pub trait InstanceControl: Send + Sync {
    /// Project that owns instances created by this account
    async fn current_project(&self) -> E2eResult<Membership>;

    /// Delete an app instance; the control plane answers `{}` on success
    async fn delete_instance(&self, project_id: &str, id: &str) -> E2eResult<Value>;
}

/// Control-plane client authenticated with the user's API key
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    api_key: String,
    project_id: Option<String>,
}

impl ControlPlaneClient {
    pub fn new(config: &GalleryConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &GalleryConfig) -> Self {
        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> E2eResult<T> {
        let response = request
            .basic_auth(&self.user_id, Some(&self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(E2eError::Api { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }

    pub async fn get_project(&self, project_id: &str) -> E2eResult<Membership> {
        let project: Project = self
            .send(self.http.get(self.url(&format!("/v1/projects/{}", project_id))))
            .await?;
        Ok(Membership {
            project_id: project.id,
            name: project.name,
        })
    }

    pub async fn list_memberships(&self) -> E2eResult<Vec<Membership>> {
        let list: MembershipList = self.send(self.http.get(self.url("/v1/memberships"))).await?;
        Ok(list.memberships)
    }
}

#[async_trait]
impl InstanceControl for ControlPlaneClient {
    async fn current_project(&self) -> E2eResult<Membership> {
        if let Some(project_id) = &self.project_id {
            return self.get_project(project_id).await;
        }

        let mut memberships = self.list_memberships().await?;
        if memberships.is_empty() {
            return Err(E2eError::NoProject);
        }
        if memberships.len() > 1 {
            info!("Defaulting to the project: {}", memberships[0].name);
        }
        Ok(memberships.swap_remove(0))
    }

    async fn delete_instance(&self, project_id: &str, id: &str) -> E2eResult<Value> {
        debug!("Deleting instance {} in project {}", id, project_id);
        let path = format!("/v1/projects/{}/lightningapps/{}", project_id, id);
        self.send(self.http.delete(self.url(&path))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_accepts_both_casings() {
        let camel: Membership = serde_json::from_str(r#"{"projectId":"p1","name":"default"}"#).unwrap();
        let snake: Membership = serde_json::from_str(r#"{"project_id":"p1"}"#).unwrap();
        assert_eq!(camel.project_id, "p1");
        assert_eq!(snake.project_id, "p1");
        assert_eq!(snake.name, "");
    }

    #[test]
    fn test_missing_memberships_field_is_empty() {
        let list: MembershipList = serde_json::from_str("{}").unwrap();
        assert!(list.memberships.is_empty());
    }
}
