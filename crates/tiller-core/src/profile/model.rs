use serde::{Deserialize, Serialize};

/// Where a profile's document comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    /// A file on disk (the global config or a workspace assistant).
    Local,
    /// A hub assistant in the user's personal scope.
    HubPersonal,
    /// A hub assistant shared through an organization.
    HubShared,
    /// An assistant served by a custom organization.
    CustomOrg,
}

impl ProfileKind {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Identity of one loadable profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDescriptor {
    /// Unique within a resolution pass: a file path for local profiles, an
    /// `owner/package` pair for hub profiles.
    pub id: String,
    pub display_name: String,
    pub icon_url: Option<String>,
    pub kind: ProfileKind,
    /// URI or reference of the backing document.
    pub source: String,
}
