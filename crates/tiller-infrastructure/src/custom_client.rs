//! HTTP client for the custom credential service.
//!
//! Login stores the issued token in the secrets file; subsequent resolution
//! passes treat a present token as "authenticated". Logout clears it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tiller_core::client::{CustomAssistant, CustomCredentialClient};
use tiller_core::error::{Result, TillerError};
use tiller_core::organization::OrganizationDescriptor;

use crate::paths::{SecretRecord, TillerPaths};

/// Reads and writes the custom auth token in `secret.json`.
pub struct TokenStore {
    paths: TillerPaths,
}

impl TokenStore {
    pub fn new(paths: TillerPaths) -> Self {
        Self { paths }
    }

    /// The stored token, if any. Read failures degrade to `None`.
    pub fn token(&self) -> Option<String> {
        let path = self.paths.secret_file().ok()?;
        let raw = std::fs::read_to_string(path).ok()?;
        let record: SecretRecord = serde_json::from_str(&raw).ok()?;
        record.custom_auth_token.filter(|t| !t.is_empty())
    }

    pub fn store_token(&self, token: &str) -> Result<()> {
        let path = self.paths.ensure_secret_file()?;
        let record = SecretRecord {
            custom_auth_token: Some(token.to_string()),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.paths.ensure_secret_file()?;
        std::fs::write(
            &path,
            serde_json::to_string_pretty(&SecretRecord::default())?,
        )?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    id: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// `reqwest`-based [`CustomCredentialClient`] with token persistence.
pub struct HttpCustomClient {
    base_url: String,
    http: reqwest::Client,
    tokens: TokenStore,
}

impl HttpCustomClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            tokens,
        }
    }

    /// Signs in and persists the issued token.
    pub async fn login(&self, id: &str, password: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&LoginRequest { id, password })
            .send()
            .await?
            .error_for_status()?;
        let login: LoginResponse = response.json().await?;
        self.tokens.store_token(&login.token)?;
        Ok(())
    }

    /// Clears the persisted token.
    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear()
    }

    fn bearer_token(&self) -> Result<String> {
        self.tokens
            .token()
            .ok_or_else(|| TillerError::source_unavailable("custom", "not signed in"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        let token = self.bearer_token()?;
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
impl CustomCredentialClient for HttpCustomClient {
    async fn is_authenticated(&self) -> bool {
        self.tokens.token().is_some()
    }

    async fn list_organizations(&self) -> Result<Vec<OrganizationDescriptor>> {
        self.get_json(format!("{}/api/organizations", self.base_url))
            .await
    }

    async fn list_assistants(&self, org_id: &str) -> Result<Vec<CustomAssistant>> {
        self.get_json(format!(
            "{}/api/organizations/{}/assistants",
            self.base_url, org_id
        ))
        .await
    }
}
