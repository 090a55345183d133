//! Login handshake and browser session seeding

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GalleryConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::Page;

/// Token lifetime requested at login, in milliseconds
pub const TOKEN_DURATION: &str = "120000";

const SEED_LOCAL_STORAGE: &str = r#"data => {
    window.localStorage.setItem('gridUserId', data[0]);
    window.localStorage.setItem('gridUserKey', data[1]);
    window.localStorage.setItem('gridUserToken', data[2]);
}"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub api_key: &'a str,
    pub username: &'a str,
    pub duration: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

/// The `(id, key, token)` triple the gallery UI reads from local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub user_id: String,
    pub user_key: String,
    pub token: String,
}

impl SessionCredentials {
    fn storage_values(&self) -> [&str; 3] {
        [&self.user_id, &self.user_key, &self.token]
    }

    /// Write the credentials into the local storage of `page`'s origin.
    pub async fn seed(&self, page: &Page) -> E2eResult<()> {
        page.evaluate::<_, serde_json::Value>(SEED_LOCAL_STORAGE, self.storage_values())
            .await?;
        Ok(())
    }
}

/// Exchange the configured API key for a session token.
pub async fn login(http: &reqwest::Client, config: &GalleryConfig) -> E2eResult<SessionCredentials> {
    let url = config.endpoint("/v1/auth/login");
    let payload = LoginRequest {
        api_key: &config.api_key,
        username: &config.username,
        duration: TOKEN_DURATION,
    };

    let response = http.post(&url).json(&payload).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(E2eError::Login(format!("{} returned {}: {}", url, status, body)));
    }

    let token = response
        .json::<LoginResponse>()
        .await?
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| E2eError::Login("response carried no token".into()))?;

    info!("Logged in as {}", config.username);
    Ok(SessionCredentials {
        user_id: config.user_id.clone(),
        user_key: config.api_key.clone(),
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_payload_shape() {
        let payload = LoginRequest {
            api_key: "key",
            username: "alice",
            duration: TOKEN_DURATION,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "apiKey": "key", "username": "alice", "duration": "120000" })
        );
    }

    #[test]
    fn test_storage_values_order() {
        let creds = SessionCredentials {
            user_id: "id".into(),
            user_key: "key".into(),
            token: "tok".into(),
        };
        assert_eq!(creds.storage_values(), ["id", "key", "tok"]);
    }
}
