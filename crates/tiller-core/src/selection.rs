//! Durable selection hints.
//!
//! The engine remembers, per workspace, which organization and which profile
//! were last selected. The store is injected at construction so tests can
//! substitute an in-memory implementation.

use async_trait::async_trait;

use crate::error::Result;

/// Durable store for the last-selected organization and profile hints.
///
/// Entries are advisory: they are validated against the live
/// organization/profile lists on every read and silently replaced by a
/// rectification fallback when stale. Implementations should degrade read
/// failures to `None` rather than surfacing them.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// The organization last selected for this workspace, if any.
    async fn organization_for(&self, workspace_id: &str) -> Option<String>;

    /// Remembers the selected organization for this workspace.
    async fn remember_organization(&self, workspace_id: &str, org_id: &str) -> Result<()>;

    /// The profile last selected for this (workspace, organization), if any.
    async fn profile_for(&self, workspace_id: &str, org_id: &str) -> Option<String>;

    /// Remembers the selected profile for this (workspace, organization).
    async fn remember_profile(
        &self,
        workspace_id: &str,
        org_id: &str,
        profile_id: &str,
    ) -> Result<()>;
}
