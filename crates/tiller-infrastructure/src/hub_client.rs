//! HTTP client for the hub (primary authenticated identity source).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tiller_core::client::{HubClient, RemoteAssistant};
use tiller_core::error::{Result, TillerError};
use tiller_core::organization::OrganizationDescriptor;
use tokio::sync::RwLock;

/// Session info for a signed-in hub user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSession {
    pub user_id: String,
    pub access_token: String,
}

/// `reqwest`-based [`HubClient`].
///
/// The session is swapped in and out by the host on login/logout; a full
/// cascade after the swap picks up the new identity.
pub struct HttpHubClient {
    base_url: String,
    http: reqwest::Client,
    session: RwLock<Option<HubSession>>,
}

impl HttpHubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            session: RwLock::new(None),
        }
    }

    pub async fn set_session(&self, session: Option<HubSession>) {
        *self.session.write().await = session;
    }

    async fn access_token(&self) -> Result<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| TillerError::source_unavailable("hub", "not signed in"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url.as_str())
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl HubClient for HttpHubClient {
    async fn current_user_id(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.user_id.clone())
    }

    async fn list_organizations(&self) -> Result<Vec<OrganizationDescriptor>> {
        self.get_json(format!("{}/api/organizations", self.base_url))
            .await
    }

    async fn list_assistants(&self, org_scope: Option<&str>) -> Result<Vec<RemoteAssistant>> {
        let url = match org_scope {
            Some(org_id) => format!(
                "{}/api/assistants?organization_id={}",
                self.base_url, org_id
            ),
            None => format!("{}/api/assistants", self.base_url),
        };
        self.get_json(url).await
    }
}
