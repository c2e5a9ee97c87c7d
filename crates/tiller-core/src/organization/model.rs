use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Diagnostic;
use crate::profile::{ProfileDescriptor, ProfileHandle};

/// Reserved id of the local/default organization.
pub const PERSONAL_ORG_ID: &str = "personal";

/// Identity of one organization within a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDescriptor {
    /// Unique within a resolution pass; `"personal"` is reserved for the
    /// local/default organization.
    pub id: String,
    pub display_name: String,
    pub icon_url: Option<String>,
    /// Absent for the personal organization.
    pub slug: Option<String>,
}

impl OrganizationDescriptor {
    /// Descriptor of the always-present personal organization.
    pub fn personal() -> Self {
        Self {
            id: PERSONAL_ORG_ID.to_string(),
            display_name: "Personal".to_string(),
            icon_url: None,
            slug: None,
        }
    }

    pub fn is_personal(&self) -> bool {
        self.id == PERSONAL_ORG_ID
    }
}

/// One organization with its resolved profiles.
///
/// Owned by a single resolution pass and superseded wholesale on the next
/// pass; only the `current_profile` pointer is updated in place, on a
/// switch-profile pass.
#[derive(Clone)]
pub struct Organization {
    pub descriptor: OrganizationDescriptor,
    pub profiles: Vec<Arc<ProfileHandle>>,
    /// `None` only when the profile list is empty.
    pub current_profile: Option<Arc<ProfileHandle>>,
    /// Degradation records retained from resolution (e.g. a failed
    /// per-organization fetch).
    pub diagnostics: Vec<Diagnostic>,
}

impl Organization {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn find_profile(&self, profile_id: &str) -> Option<Arc<ProfileHandle>> {
        self.profiles
            .iter()
            .find(|p| p.description().id == profile_id)
            .cloned()
    }

    pub fn current_profile_id(&self) -> Option<String> {
        self.current_profile.as_ref().map(|p| p.description().id)
    }

    /// Read-only snapshot for the host UI.
    pub fn snapshot(&self) -> OrganizationSnapshot {
        OrganizationSnapshot {
            id: self.descriptor.id.clone(),
            display_name: self.descriptor.display_name.clone(),
            icon_url: self.descriptor.icon_url.clone(),
            slug: self.descriptor.slug.clone(),
            profiles: self.profiles.iter().map(|p| p.description()).collect(),
            selected_profile_id: self.current_profile_id(),
        }
    }
}

impl std::fmt::Debug for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organization")
            .field("descriptor", &self.descriptor)
            .field(
                "profiles",
                &self
                    .profiles
                    .iter()
                    .map(|p| p.description().id)
                    .collect::<Vec<_>>(),
            )
            .field("current_profile", &self.current_profile_id())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// Serializable view of an organization and its profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSnapshot {
    pub id: String,
    pub display_name: String,
    pub icon_url: Option<String>,
    pub slug: Option<String>,
    pub profiles: Vec<ProfileDescriptor>,
    pub selected_profile_id: Option<String>,
}
