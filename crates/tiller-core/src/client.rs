//! Remote credential and assistant clients.
//!
//! Two alternative remote sources can enumerate organizations and their
//! assistants: the hub (primary authenticated identity) and a custom
//! credential service. The engine only depends on these trait seams; HTTP
//! implementations live in the infrastructure crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::organization::OrganizationDescriptor;

/// An assistant as listed by the hub, carrying its raw document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAssistant {
    pub owner_slug: String,
    pub package_slug: String,
    pub icon_url: Option<String>,
    /// Raw YAML document, parsed lazily by the profile loader.
    pub raw_config: String,
}

impl RemoteAssistant {
    /// Stable profile id: `owner/package`.
    pub fn profile_id(&self) -> String {
        format!("{}/{}", self.owner_slug, self.package_slug)
    }
}

/// An assistant served by a custom organization.
///
/// Custom assistants are persisted to the workspace on resolution so they
/// become ordinary local profiles on the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAssistant {
    pub slug: String,
    pub raw_config: String,
}

/// The primary authenticated remote identity source.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// The signed-in user id, or `None` when logged out.
    async fn current_user_id(&self) -> Option<String>;

    /// Organizations the current user belongs to.
    async fn list_organizations(&self) -> Result<Vec<OrganizationDescriptor>>;

    /// Assistants visible in the given organization scope.
    ///
    /// `None` scopes the listing to the user's personal space.
    async fn list_assistants(&self, org_scope: Option<&str>) -> Result<Vec<RemoteAssistant>>;
}

/// The alternative credential source.
#[async_trait]
pub trait CustomCredentialClient: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    async fn list_organizations(&self) -> Result<Vec<OrganizationDescriptor>>;

    /// Assistants of one custom organization. May fail per call; the caller
    /// isolates the failure to that organization.
    async fn list_assistants(&self, org_id: &str) -> Result<Vec<CustomAssistant>>;
}
