//! Profile loaders.
//!
//! A loader knows how to produce the configuration document of exactly one
//! profile. Caching and invalidation live in [`ProfileHandle`], not here.
//!
//! [`ProfileHandle`]: crate::profile::ProfileHandle

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::client::RemoteAssistant;
use crate::config::{ConfigDocument, ContextProvider, LoadedConfig};
use crate::error::Result;
use crate::profile::model::{ProfileDescriptor, ProfileKind};
use crate::source::LocalAssistantSource;

/// Reserved profile id of the global local configuration.
pub const GLOBAL_PROFILE_ID: &str = "local";

/// Loads the configuration document of one profile.
#[async_trait]
pub trait ProfileLoader: Send + Sync {
    fn description(&self) -> &ProfileDescriptor;

    /// Performs a fresh load. Failures are returned as `Err` and converted
    /// into a failed result at the handle boundary.
    async fn load(&self, extra_providers: &[Arc<dyn ContextProvider>]) -> Result<LoadedConfig>;
}

/// Loads a profile from a local YAML document.
///
/// The file is re-read through the [`LocalAssistantSource`] on every load so
/// that a cache invalidation always observes current file contents.
pub struct LocalProfileLoader {
    source: Arc<dyn LocalAssistantSource>,
    description: ProfileDescriptor,
    path: PathBuf,
}

impl LocalProfileLoader {
    /// The global profile, backed by the root configuration document.
    pub fn global(source: Arc<dyn LocalAssistantSource>) -> Self {
        let path = source.global_config_path();
        let description = ProfileDescriptor {
            id: GLOBAL_PROFILE_ID.to_string(),
            display_name: "Local Config".to_string(),
            icon_url: None,
            kind: ProfileKind::Local,
            source: path.to_string_lossy().into_owned(),
        };
        Self {
            source,
            description,
            path,
        }
    }

    /// A profile backed by one assistant file.
    ///
    /// `kind` distinguishes ordinary workspace assistants from custom-org
    /// assistants persisted into their per-organization directory.
    pub fn for_file(source: Arc<dyn LocalAssistantSource>, path: PathBuf, kind: ProfileKind) -> Self {
        let id = path.to_string_lossy().into_owned();
        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());
        let description = ProfileDescriptor {
            id: id.clone(),
            display_name,
            icon_url: None,
            kind,
            source: id,
        };
        Self {
            source,
            description,
            path,
        }
    }
}

#[async_trait]
impl ProfileLoader for LocalProfileLoader {
    fn description(&self) -> &ProfileDescriptor {
        &self.description
    }

    async fn load(&self, extra_providers: &[Arc<dyn ContextProvider>]) -> Result<LoadedConfig> {
        let raw = self.source.read(&self.path).await?;
        let document = ConfigDocument::parse_yaml(&raw)?;
        Ok(LoadedConfig::new(document, extra_providers.to_vec()))
    }
}

/// Loads a hub assistant from the document fetched with its listing.
pub struct HubProfileLoader {
    description: ProfileDescriptor,
    raw_config: String,
}

impl HubProfileLoader {
    /// `org_scope` is the organization the assistant was listed under;
    /// `None` marks the user's personal hub scope.
    pub fn new(assistant: RemoteAssistant, org_scope: Option<&str>) -> Self {
        let kind = if org_scope.is_some() {
            ProfileKind::HubShared
        } else {
            ProfileKind::HubPersonal
        };
        let description = ProfileDescriptor {
            id: assistant.profile_id(),
            display_name: assistant.package_slug.clone(),
            icon_url: assistant.icon_url.clone(),
            kind,
            source: format!("hub://{}", assistant.profile_id()),
        };
        Self {
            description,
            raw_config: assistant.raw_config,
        }
    }
}

#[async_trait]
impl ProfileLoader for HubProfileLoader {
    fn description(&self) -> &ProfileDescriptor {
        &self.description
    }

    async fn load(&self, extra_providers: &[Arc<dyn ContextProvider>]) -> Result<LoadedConfig> {
        let document = ConfigDocument::parse_yaml(&self.raw_config)?;
        Ok(LoadedConfig::new(document, extra_providers.to_vec()))
    }
}
