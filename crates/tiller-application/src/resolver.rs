//! Organization resolution.
//!
//! One resolution pass merges the active credential source with locally
//! defined profiles into a fresh, ordered organization list. The pass never
//! fails as a whole: a failing adapter or per-organization fetch degrades to
//! an empty profile list with a retained diagnostic.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tiller_core::client::{CustomCredentialClient, HubClient};
use tiller_core::config::Diagnostic;
use tiller_core::error::Result;
use tiller_core::organization::{Organization, OrganizationDescriptor};
use tiller_core::profile::{HubProfileLoader, LocalProfileLoader, ProfileHandle, ProfileKind};
use tiller_core::selection::SelectionStore;
use tiller_core::source::{AssistantScope, AssistantWriter, LocalAssistantSource};

/// Resolves the organization list for one cascade pass.
///
/// Credential precedence decides the active source: a signed-in hub identity
/// wins, then a custom credential, then the pure-local fallback. Every branch
/// ends with exactly one organization carrying the reserved `"personal"` id,
/// so the result is never empty.
pub struct OrganizationResolver {
    hub: Arc<dyn HubClient>,
    custom: Arc<dyn CustomCredentialClient>,
    local: Arc<dyn LocalAssistantSource>,
    writer: Arc<dyn AssistantWriter>,
    selection: Arc<dyn SelectionStore>,
}

impl OrganizationResolver {
    pub fn new(
        hub: Arc<dyn HubClient>,
        custom: Arc<dyn CustomCredentialClient>,
        local: Arc<dyn LocalAssistantSource>,
        writer: Arc<dyn AssistantWriter>,
        selection: Arc<dyn SelectionStore>,
    ) -> Self {
        Self {
            hub,
            custom,
            local,
            writer,
            selection,
        }
    }

    /// Runs one resolution pass.
    pub async fn resolve(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
    ) -> Vec<Organization> {
        if self.hub.current_user_id().await.is_some() {
            self.resolve_hub(workspace_id, workspace_roots).await
        } else if self.custom.is_authenticated().await {
            self.resolve_custom(workspace_id, workspace_roots).await
        } else {
            vec![self.local_organization(workspace_id, workspace_roots).await]
        }
    }

    /// Hub branch: one organization per remote descriptor, personal last.
    async fn resolve_hub(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
    ) -> Vec<Organization> {
        let (descriptors, listing_diagnostics) = match self.hub.list_organizations().await {
            Ok(descriptors) => (descriptors, Vec::new()),
            Err(err) => {
                tracing::warn!("hub organization listing failed: {err}");
                (Vec::new(), vec![Diagnostic::new("hub", err.to_string())])
            }
        };

        let mut organizations: Vec<Organization> = join_all(
            descriptors
                .into_iter()
                .map(|desc| self.hub_organization(workspace_id, workspace_roots, desc)),
        )
        .await;

        let mut personal = self
            .personal_hub_organization(workspace_id, workspace_roots)
            .await;
        personal.diagnostics.extend(listing_diagnostics);
        organizations.push(personal);
        organizations
    }

    async fn hub_organization(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
        descriptor: OrganizationDescriptor,
    ) -> Organization {
        let mut diagnostics = Vec::new();
        let mut profiles = match self.hub_profiles(Some(&descriptor.id)).await {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::warn!(org = %descriptor.id, "hub assistant listing failed: {err}");
                diagnostics.push(Diagnostic::new(&descriptor.id, err.to_string()));
                Vec::new()
            }
        };

        let (local_profiles, local_diagnostics) = self
            .local_profiles(
                workspace_roots,
                AssistantScope::WorkspaceOnly,
                false,
                ProfileKind::Local,
            )
            .await;
        profiles.extend(local_profiles);
        diagnostics.extend(local_diagnostics);

        self.rectify(descriptor, profiles, workspace_id, diagnostics)
            .await
    }

    async fn personal_hub_organization(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
    ) -> Organization {
        let mut diagnostics = Vec::new();
        let mut profiles = match self.hub_profiles(None).await {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::warn!("personal hub assistant listing failed: {err}");
                diagnostics.push(Diagnostic::new("hub", err.to_string()));
                Vec::new()
            }
        };

        let (local_profiles, local_diagnostics) = self
            .local_profiles(
                workspace_roots,
                AssistantScope::Standard,
                true,
                ProfileKind::Local,
            )
            .await;
        profiles.extend(local_profiles);
        diagnostics.extend(local_diagnostics);

        self.rectify(
            OrganizationDescriptor::personal(),
            profiles,
            workspace_id,
            diagnostics,
        )
        .await
    }

    async fn hub_profiles(&self, org_scope: Option<&str>) -> Result<Vec<Arc<ProfileHandle>>> {
        let assistants = self.hub.list_assistants(org_scope).await?;
        Ok(assistants
            .into_iter()
            .map(|assistant| {
                Arc::new(ProfileHandle::new(Arc::new(HubProfileLoader::new(
                    assistant, org_scope,
                ))))
            })
            .collect())
    }

    /// Custom branch: one organization per custom descriptor, each fetched
    /// independently so one bad organization never blocks the others;
    /// personal last.
    async fn resolve_custom(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
    ) -> Vec<Organization> {
        let (descriptors, listing_diagnostics) = match self.custom.list_organizations().await {
            Ok(descriptors) => (descriptors, Vec::new()),
            Err(err) => {
                tracing::warn!("custom organization listing failed: {err}");
                (Vec::new(), vec![Diagnostic::new("custom", err.to_string())])
            }
        };

        let mut organizations: Vec<Organization> = join_all(
            descriptors
                .into_iter()
                .map(|desc| self.custom_organization(workspace_id, workspace_roots, desc)),
        )
        .await;

        let mut personal = self.local_organization(workspace_id, workspace_roots).await;
        personal.diagnostics.extend(listing_diagnostics);
        organizations.push(personal);
        organizations
    }

    async fn custom_organization(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
        descriptor: OrganizationDescriptor,
    ) -> Organization {
        match self
            .custom_profiles(workspace_roots, &descriptor.id)
            .await
        {
            Ok(profiles) => {
                self.rectify(descriptor, profiles, workspace_id, Vec::new())
                    .await
            }
            Err(err) => {
                tracing::warn!(org = %descriptor.id, "custom organization load failed: {err}");
                let diagnostics = vec![Diagnostic::new(&descriptor.id, err.to_string())];
                self.rectify(descriptor, Vec::new(), workspace_id, diagnostics)
                    .await
            }
        }
    }

    /// Fetches one custom organization's assistants, persists them to their
    /// per-organization directory, and loads them back as local profiles.
    async fn custom_profiles(
        &self,
        workspace_roots: &[PathBuf],
        org_id: &str,
    ) -> Result<Vec<Arc<ProfileHandle>>> {
        let assistants = self.custom.list_assistants(org_id).await?;
        for assistant in &assistants {
            self.writer.save(workspace_roots, org_id, assistant).await?;
        }

        let paths = self
            .local
            .list_assistants(
                workspace_roots,
                &AssistantScope::Organization(org_id.to_string()),
            )
            .await?;
        Ok(paths
            .into_iter()
            .map(|path| {
                Arc::new(ProfileHandle::new(Arc::new(LocalProfileLoader::for_file(
                    self.local.clone(),
                    path,
                    ProfileKind::CustomOrg,
                ))))
            })
            .collect())
    }

    /// The always-available local fallback organization.
    async fn local_organization(
        &self,
        workspace_id: &str,
        workspace_roots: &[PathBuf],
    ) -> Organization {
        let (profiles, diagnostics) = self
            .local_profiles(
                workspace_roots,
                AssistantScope::WorkspaceOnly,
                true,
                ProfileKind::Local,
            )
            .await;
        self.rectify(
            OrganizationDescriptor::personal(),
            profiles,
            workspace_id,
            diagnostics,
        )
        .await
    }

    /// Locally-defined profiles: optionally the global profile, plus the
    /// assistant files within the scope.
    async fn local_profiles(
        &self,
        workspace_roots: &[PathBuf],
        scope: AssistantScope,
        include_global: bool,
        kind: ProfileKind,
    ) -> (Vec<Arc<ProfileHandle>>, Vec<Diagnostic>) {
        let mut profiles: Vec<Arc<ProfileHandle>> = Vec::new();
        let mut diagnostics = Vec::new();

        if include_global {
            profiles.push(Arc::new(ProfileHandle::new(Arc::new(
                LocalProfileLoader::global(self.local.clone()),
            ))));
        }

        match self.local.list_assistants(workspace_roots, &scope).await {
            Ok(paths) => {
                profiles.extend(paths.into_iter().map(|path| {
                    Arc::new(ProfileHandle::new(Arc::new(LocalProfileLoader::for_file(
                        self.local.clone(),
                        path,
                        kind,
                    ))))
                }));
            }
            Err(err) => {
                tracing::warn!("local assistant listing failed: {err}");
                diagnostics.push(Diagnostic::new("local", err.to_string()));
            }
        }

        (profiles, diagnostics)
    }

    /// Chooses an organization's current profile.
    ///
    /// A persisted hint matching a live profile wins; otherwise the first
    /// profile whose kind is not local, else the first profile, else none.
    /// The resolved choice is persisted back so a fallback stays sticky until
    /// a real switch.
    async fn rectify(
        &self,
        descriptor: OrganizationDescriptor,
        profiles: Vec<Arc<ProfileHandle>>,
        workspace_id: &str,
        diagnostics: Vec<Diagnostic>,
    ) -> Organization {
        let hint = self.selection.profile_for(workspace_id, &descriptor.id).await;
        let hinted = hint.and_then(|id| {
            profiles
                .iter()
                .find(|profile| profile.description().id == id)
                .cloned()
        });

        let current_profile = hinted.or_else(|| {
            profiles
                .iter()
                .find(|profile| !profile.description().kind.is_local())
                .or_else(|| profiles.first())
                .cloned()
        });

        if let Some(profile) = &current_profile {
            if let Err(err) = self
                .selection
                .remember_profile(workspace_id, &descriptor.id, &profile.description().id)
                .await
            {
                tracing::warn!(org = %descriptor.id, "failed to persist profile selection: {err}");
            }
        }

        Organization {
            descriptor,
            profiles,
            current_profile,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        MemoryAssistantSource, MemorySelectionStore, MemoryWriter, MockCustomClient,
        MockHubClient, custom_org, remote_assistant, remote_org,
    };
    use tiller_core::organization::PERSONAL_ORG_ID;

    struct Fixture {
        hub: Arc<MockHubClient>,
        custom: Arc<MockCustomClient>,
        local: Arc<MemoryAssistantSource>,
        selection: Arc<MemorySelectionStore>,
        resolver: OrganizationResolver,
        roots: Vec<PathBuf>,
    }

    fn fixture() -> Fixture {
        let hub = Arc::new(MockHubClient::default());
        let custom = Arc::new(MockCustomClient::default());
        let local = Arc::new(MemoryAssistantSource::new());
        let selection = Arc::new(MemorySelectionStore::default());
        let resolver = OrganizationResolver::new(
            hub.clone(),
            custom.clone(),
            local.clone(),
            Arc::new(MemoryWriter::new(local.clone())),
            selection.clone(),
        );
        Fixture {
            hub,
            custom,
            local,
            selection,
            resolver,
            roots: vec![PathBuf::from("/ws")],
        }
    }

    fn ids(orgs: &[Organization]) -> Vec<String> {
        orgs.iter().map(|o| o.id().to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_credentials_yields_single_personal_org() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.local.add_workspace_assistant("/ws", "b.yaml");

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(ids(&orgs), vec![PERSONAL_ORG_ID]);
        // Global profile plus the two workspace assistants.
        assert_eq!(orgs[0].profiles.len(), 3);
        assert_eq!(orgs[0].profiles[0].description().id, "local");
    }

    #[tokio::test]
    async fn test_hub_branch_orders_remote_orgs_before_personal() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub.set_organizations(vec![remote_org("acme"), remote_org("globex")]);
        fx.hub
            .set_assistants(Some("acme"), vec![remote_assistant("acme", "helper")]);
        fx.hub
            .set_assistants(None, vec![remote_assistant("user-1", "mine")]);
        fx.local.add_global_assistant("shared.yaml");

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(ids(&orgs), vec!["acme", "globex", PERSONAL_ORG_ID]);
        // Hub profiles come before local ones within an organization.
        assert_eq!(orgs[0].profiles[0].description().id, "acme/helper");
        assert_eq!(
            orgs[0].profiles[0].description().kind,
            ProfileKind::HubShared
        );
        // The personal hub org carries the personally-scoped assistant.
        let personal = &orgs[2];
        assert!(
            personal
                .profiles
                .iter()
                .any(|p| p.description().kind == ProfileKind::HubPersonal)
        );
        // Globally-defined assistants appear only in the personal org.
        let global_id = "/cfg/assistants/shared.yaml";
        assert!(
            personal
                .profiles
                .iter()
                .any(|p| p.description().id == global_id)
        );
        assert!(
            !orgs[0]
                .profiles
                .iter()
                .any(|p| p.description().id == global_id)
        );
    }

    #[tokio::test]
    async fn test_hub_org_prefers_non_local_default() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub.set_organizations(vec![remote_org("acme")]);
        fx.hub
            .set_assistants(Some("acme"), vec![remote_assistant("acme", "helper")]);
        fx.local.add_workspace_assistant("/ws", "a.yaml");

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(
            orgs[0].current_profile_id().as_deref(),
            Some("acme/helper")
        );
        // The fallback choice was persisted back.
        assert_eq!(
            fx.selection.profile_for("/ws", "acme").await.as_deref(),
            Some("acme/helper")
        );
    }

    #[tokio::test]
    async fn test_rectify_honors_valid_hint() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.local.add_workspace_assistant("/ws", "b.yaml");
        fx.selection
            .remember_profile("/ws", PERSONAL_ORG_ID, "/ws/.tiller/assistants/b.yaml")
            .await
            .unwrap();

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(
            orgs[0].current_profile_id().as_deref(),
            Some("/ws/.tiller/assistants/b.yaml")
        );
    }

    #[tokio::test]
    async fn test_rectify_replaces_stale_hint() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.selection
            .remember_profile("/ws", PERSONAL_ORG_ID, "/ws/.tiller/assistants/gone.yaml")
            .await
            .unwrap();

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        // All profiles are local, so the first profile (the global one) wins.
        assert_eq!(orgs[0].current_profile_id().as_deref(), Some("local"));
        // And the replacement became the new persisted hint.
        assert_eq!(
            fx.selection
                .profile_for("/ws", PERSONAL_ORG_ID)
                .await
                .as_deref(),
            Some("local")
        );
    }

    #[tokio::test]
    async fn test_custom_branch_saves_assistants_and_builds_profiles() {
        let fx = fixture();
        fx.custom.authenticate();
        fx.custom.set_organizations(vec![custom_org("org-1")]);
        fx.custom
            .set_assistants("org-1", vec!["helper", "reviewer"]);

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(ids(&orgs), vec!["org-1", PERSONAL_ORG_ID]);
        let custom_org = &orgs[0];
        assert_eq!(custom_org.profiles.len(), 2);
        assert!(
            custom_org
                .profiles
                .iter()
                .all(|p| p.description().kind == ProfileKind::CustomOrg)
        );
        // Assistants were persisted into the per-organization directory.
        assert!(
            custom_org.profiles[0]
                .description()
                .id
                .contains("/.tiller/org-1/assistants/")
        );
    }

    #[tokio::test]
    async fn test_custom_org_failure_is_isolated() {
        let fx = fixture();
        fx.custom.authenticate();
        fx.custom
            .set_organizations(vec![custom_org("bad"), custom_org("good")]);
        fx.custom.set_assistants("good", vec!["helper"]);
        fx.custom.fail_assistants_for("bad");

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(ids(&orgs), vec!["bad", "good", PERSONAL_ORG_ID]);
        assert!(orgs[0].profiles.is_empty());
        assert!(orgs[0].current_profile.is_none());
        assert_eq!(orgs[0].diagnostics.len(), 1);
        assert_eq!(orgs[0].diagnostics[0].source, "bad");
        assert_eq!(orgs[1].profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_hub_listing_failure_degrades_to_personal_only() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub.fail_organization_listing();

        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;

        assert_eq!(ids(&orgs), vec![PERSONAL_ORG_ID]);
        assert!(!orgs[0].diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_every_branch_contains_exactly_one_personal_org() {
        // Local branch.
        let fx = fixture();
        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;
        assert_eq!(
            orgs.iter().filter(|o| o.descriptor.is_personal()).count(),
            1
        );

        // Custom branch.
        fx.custom.authenticate();
        fx.custom.set_organizations(vec![custom_org("org-1")]);
        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;
        assert_eq!(
            orgs.iter().filter(|o| o.descriptor.is_personal()).count(),
            1
        );

        // Hub branch takes precedence over custom.
        fx.hub.sign_in("user-1");
        fx.hub.set_organizations(vec![remote_org("acme")]);
        let orgs = fx.resolver.resolve("/ws", &fx.roots).await;
        assert_eq!(
            orgs.iter().filter(|o| o.descriptor.is_personal()).count(),
            1
        );
        assert_eq!(orgs.len(), 2);
    }
}
