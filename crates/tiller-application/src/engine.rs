//! The cascading configuration engine.
//!
//! `ConfigManager` owns the live organization snapshot and the currently
//! selected profile, and orchestrates the three cascade entry points:
//! a full re-resolution (`refresh_all`), an organization switch, and a
//! profile switch. Every pass converges on one internal `reload` that
//! enforces the cache discipline and notifies listeners exactly once.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tiller_core::client::{CustomCredentialClient, HubClient};
use tiller_core::config::{ConfigResult, ContextProvider, LoadedConfig, SerializedConfig};
use tiller_core::error::{Result, TillerError};
use tiller_core::listener::ConfigListener;
use tiller_core::organization::{Organization, OrganizationDescriptor, OrganizationSnapshot};
use tiller_core::profile::{LocalProfileLoader, ProfileHandle};
use tiller_core::selection::SelectionStore;
use tiller_core::source::{AssistantWriter, LocalAssistantSource};
use tiller_core::workspace::{WorkspaceProvider, workspace_identity};
use tokio::sync::{Mutex, RwLock};

use crate::resolver::OrganizationResolver;

/// Mutable engine state, superseded wholesale by each full pass.
struct EngineState {
    /// Cached workspace roots and identity; invalidated on full cascade.
    workspace: Option<(Vec<PathBuf>, String)>,
    organizations: Vec<Organization>,
    /// Index into `organizations`; always valid.
    current_org: usize,
    current_profile: Option<Arc<ProfileHandle>>,
}

/// The cascading configuration engine.
///
/// # Concurrency
///
/// Cascade passes are serialized: one pass guard is held from entry until the
/// pass's reload has settled, and overlapping requests queue behind it in
/// FIFO order. Each pass is stamped with a generation; a pass whose profile
/// selection or generation has been superseded by the time its load settles
/// returns its result without publishing it to listeners.
pub struct ConfigManager {
    workspace: Arc<dyn WorkspaceProvider>,
    selection: Arc<dyn SelectionStore>,
    resolver: OrganizationResolver,
    state: RwLock<EngineState>,
    /// Serializes cascade passes.
    pass_guard: Mutex<()>,
    generation: AtomicU64,
    listeners: std::sync::Mutex<Vec<Arc<dyn ConfigListener>>>,
    extra_providers: std::sync::Mutex<Vec<Arc<dyn ContextProvider>>>,
}

impl ConfigManager {
    /// Creates the engine, seeded with a personal organization around the
    /// global local profile so consumers always observe at least one
    /// organization. Run `refresh_all` afterwards to resolve the real list.
    pub fn new(
        workspace: Arc<dyn WorkspaceProvider>,
        selection: Arc<dyn SelectionStore>,
        hub: Arc<dyn HubClient>,
        custom: Arc<dyn CustomCredentialClient>,
        local: Arc<dyn LocalAssistantSource>,
        writer: Arc<dyn AssistantWriter>,
    ) -> Self {
        let resolver = OrganizationResolver::new(
            hub,
            custom,
            local.clone(),
            writer,
            selection.clone(),
        );

        let global_profile = Arc::new(ProfileHandle::new(Arc::new(LocalProfileLoader::global(
            local,
        ))));
        let personal = Organization {
            descriptor: OrganizationDescriptor::personal(),
            profiles: vec![global_profile.clone()],
            current_profile: Some(global_profile.clone()),
            diagnostics: Vec::new(),
        };

        Self {
            workspace,
            selection,
            resolver,
            state: RwLock::new(EngineState {
                workspace: None,
                organizations: vec![personal],
                current_org: 0,
                current_profile: Some(global_profile),
            }),
            pass_guard: Mutex::new(()),
            generation: AtomicU64::new(0),
            listeners: std::sync::Mutex::new(Vec::new()),
            extra_providers: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cached workspace roots and identity, computed on first use after an
    /// invalidation.
    async fn workspace_identity(&self) -> (Vec<PathBuf>, String) {
        {
            let state = self.state.read().await;
            if let Some(cached) = &state.workspace {
                return cached.clone();
            }
        }
        let roots = self.workspace.workspace_roots().await;
        let id = workspace_identity(&roots);
        let mut state = self.state.write().await;
        state.workspace = Some((roots.clone(), id.clone()));
        (roots, id)
    }

    /// Full cascade: re-resolve organizations, re-apply the persisted
    /// organization selection, and reload the selected profile.
    pub async fn refresh_all(&self) -> ConfigResult<LoadedConfig> {
        let _pass = self.pass_guard.lock().await;
        let generation = self.next_generation();
        self.cascade_init(generation).await
    }

    async fn cascade_init(&self, generation: u64) -> ConfigResult<LoadedConfig> {
        // Force a workspace identity reload.
        {
            let mut state = self.state.write().await;
            state.workspace = None;
        }
        let (roots, workspace_id) = self.workspace_identity().await;

        let organizations = self.resolver.resolve(&workspace_id, &roots).await;

        // Pick the selected organization: a persisted hint validated against
        // the fresh list, else the first non-personal organization, else the
        // first one.
        let hint = self.selection.organization_for(&workspace_id).await;
        let fallback = organizations
            .iter()
            .position(|org| !org.descriptor.is_personal())
            .unwrap_or(0);
        let selected = hint
            .and_then(|id| organizations.iter().position(|org| org.id() == id))
            .unwrap_or(fallback);

        if let Err(err) = self
            .selection
            .remember_organization(&workspace_id, organizations[selected].id())
            .await
        {
            tracing::warn!("failed to persist organization selection: {err}");
        }

        tracing::debug!(
            organizations = organizations.len(),
            selected = %organizations[selected].id(),
            "resolved organizations"
        );

        // Swap in the new snapshot only once the full pass has succeeded.
        let current_profile = organizations[selected].current_profile.clone();
        {
            let mut state = self.state.write().await;
            state.organizations = organizations;
            state.current_org = selected;
            state.current_profile = current_profile;
        }

        self.reload(generation).await
    }

    /// Switch organization: no-op when already current, `OrgNotFound` when
    /// the id is absent from the live list.
    pub async fn select_organization(
        &self,
        org_id: &str,
        profile_id: Option<&str>,
    ) -> Result<()> {
        let _pass = self.pass_guard.lock().await;

        let selected = {
            let state = self.state.read().await;
            if state.organizations[state.current_org].id() == org_id {
                return Ok(());
            }
            state
                .organizations
                .iter()
                .position(|org| org.id() == org_id)
                .ok_or_else(|| TillerError::org_not_found(org_id))?
        };

        let (_, workspace_id) = self.workspace_identity().await;
        if let Err(err) = self
            .selection
            .remember_organization(&workspace_id, org_id)
            .await
        {
            tracing::warn!("failed to persist organization selection: {err}");
        }

        {
            let mut state = self.state.write().await;
            state.current_org = selected;
        }

        let generation = self.next_generation();
        if let Some(profile_id) = profile_id {
            self.switch_profile(profile_id, generation).await?;
        } else {
            // Adopt the target organization's own current profile.
            {
                let mut state = self.state.write().await;
                let adopted = state.organizations[selected].current_profile.clone();
                state.current_profile = adopted;
            }
            self.reload(generation).await;
        }
        Ok(())
    }

    /// Switch profile within the current organization: no-op when already
    /// current, `ProfileNotFound` when the id is absent from the
    /// organization's profile list.
    pub async fn select_profile(&self, profile_id: &str) -> Result<()> {
        let _pass = self.pass_guard.lock().await;
        let generation = self.next_generation();
        self.switch_profile(profile_id, generation).await
    }

    /// Profile switch body; the pass guard must already be held.
    async fn switch_profile(&self, profile_id: &str, generation: u64) -> Result<()> {
        let (profile, org_id) = {
            let state = self.state.read().await;
            if state
                .current_profile
                .as_ref()
                .map(|p| p.description().id)
                .as_deref()
                == Some(profile_id)
            {
                return Ok(());
            }
            let org = &state.organizations[state.current_org];
            let profile = org
                .find_profile(profile_id)
                .ok_or_else(|| TillerError::profile_not_found(profile_id))?;
            (profile, org.id().to_string())
        };

        let (_, workspace_id) = self.workspace_identity().await;
        if let Err(err) = self
            .selection
            .remember_profile(&workspace_id, &org_id, profile_id)
            .await
        {
            tracing::warn!("failed to persist profile selection: {err}");
        }

        {
            let mut state = self.state.write().await;
            state.current_profile = Some(profile.clone());
            let current_org = state.current_org;
            state.organizations[current_org].current_profile = Some(profile);
        }

        self.reload(generation).await;
        Ok(())
    }

    /// Bottom of every cascade.
    ///
    /// Clears every non-selected profile cache across all organizations
    /// (bounding memory to one live configuration and guaranteeing a switch
    /// back re-reads fresh data), loads the selected profile, and notifies
    /// listeners unless the pass was superseded meanwhile.
    async fn reload(&self, generation: u64) -> ConfigResult<LoadedConfig> {
        let (current, all_profiles) = {
            let state = self.state.read().await;
            let all: Vec<Arc<ProfileHandle>> = state
                .organizations
                .iter()
                .flat_map(|org| org.profiles.iter().cloned())
                .collect();
            (state.current_profile.clone(), all)
        };

        let Some(profile) = current else {
            return ConfigResult::interrupted();
        };
        let current_id = profile.description().id;

        for handle in all_profiles {
            if handle.description().id != current_id {
                handle.clear_cache().await;
            }
        }

        let providers = self.context_providers();
        let result = profile.load(&providers).await;

        let still_current = {
            let state = self.state.read().await;
            state.current_profile.as_ref().map(|p| p.description().id) == Some(current_id)
                && self.generation.load(Ordering::SeqCst) == generation
        };
        if still_current {
            self.notify_listeners(&result);
        } else {
            tracing::debug!("discarding superseded reload result");
        }
        result
    }

    fn notify_listeners(&self, result: &ConfigResult<LoadedConfig>) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_config_update(result);
        }
    }

    fn context_providers(&self) -> Vec<Arc<dyn ContextProvider>> {
        self.extra_providers.lock().unwrap().clone()
    }

    /// Subscribes a listener; no de-duplication, no unsubscribe.
    pub fn subscribe(&self, listener: Arc<dyn ConfigListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Registers an extra context provider and reloads the current profile
    /// so the addition takes effect.
    pub async fn register_context_provider(&self, provider: Arc<dyn ContextProvider>) {
        self.extra_providers.lock().unwrap().push(provider);
        let _pass = self.pass_guard.lock().await;
        let generation = self.next_generation();
        // The provider set changed, so the cached result is stale.
        if let Some(profile) = self.state.read().await.current_profile.clone() {
            profile.clear_cache().await;
        }
        self.reload(generation).await;
    }

    /// Read-only snapshot of the live organization list.
    pub async fn get_organizations(&self) -> Vec<OrganizationSnapshot> {
        let state = self.state.read().await;
        state.organizations.iter().map(Organization::snapshot).collect()
    }

    pub async fn current_organization_id(&self) -> String {
        let state = self.state.read().await;
        state.organizations[state.current_org].id().to_string()
    }

    pub async fn current_profile_id(&self) -> Option<String> {
        let state = self.state.read().await;
        state.current_profile.as_ref().map(|p| p.description().id)
    }

    /// The current profile's configuration, from cache when available.
    pub async fn get_current_config(&self) -> ConfigResult<LoadedConfig> {
        let profile = {
            let state = self.state.read().await;
            state.current_profile.clone()
        };
        let Some(profile) = profile else {
            return ConfigResult::interrupted();
        };
        let result = profile.load(&self.context_providers()).await;
        if !result.errors.is_empty() {
            tracing::warn!(
                profile = %profile.description().id,
                errors = result.errors.len(),
                "current config carries load errors"
            );
        }
        result
    }

    /// Like `get_current_config`, projected for transport.
    pub async fn get_current_config_serialized(&self) -> ConfigResult<SerializedConfig> {
        let profile = {
            let state = self.state.read().await;
            state.current_profile.clone()
        };
        let Some(profile) = profile else {
            return ConfigResult::interrupted();
        };
        profile.serialize(&self.context_providers()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        MemoryAssistantSource, MemorySelectionStore, MemoryWriter, MockCustomClient,
        MockHubClient, RecordingListener, custom_org, remote_assistant, remote_org,
    };
    use tiller_core::organization::PERSONAL_ORG_ID;
    use tiller_infrastructure::StaticWorkspaceProvider;

    struct Fixture {
        hub: Arc<MockHubClient>,
        custom: Arc<MockCustomClient>,
        local: Arc<MemoryAssistantSource>,
        selection: Arc<MemorySelectionStore>,
        manager: ConfigManager,
    }

    fn fixture() -> Fixture {
        let hub = Arc::new(MockHubClient::default());
        let custom = Arc::new(MockCustomClient::default());
        let local = Arc::new(MemoryAssistantSource::new());
        let selection = Arc::new(MemorySelectionStore::default());
        let manager = ConfigManager::new(
            Arc::new(StaticWorkspaceProvider::new(vec![PathBuf::from("/ws")])),
            selection.clone(),
            hub.clone(),
            custom.clone(),
            local.clone(),
            Arc::new(MemoryWriter::new(local.clone())),
        );
        Fixture {
            hub,
            custom,
            local,
            selection,
            manager,
        }
    }

    fn assistant_id(name: &str) -> String {
        format!("/ws/.tiller/assistants/{name}")
    }

    #[tokio::test]
    async fn test_seeded_state_before_first_cascade() {
        let fx = fixture();
        let orgs = fx.manager.get_organizations().await;
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, PERSONAL_ORG_ID);
        assert_eq!(orgs[0].selected_profile_id.as_deref(), Some("local"));
    }

    #[tokio::test]
    async fn test_no_credentials_workspace() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.local.add_workspace_assistant("/ws", "b.yaml");

        fx.manager.refresh_all().await;

        let orgs = fx.manager.get_organizations().await;
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, PERSONAL_ORG_ID);
        assert_eq!(orgs[0].profiles.len(), 3);
        // All profiles local, so the first (global) one is selected.
        assert_eq!(orgs[0].selected_profile_id.as_deref(), Some("local"));

        let config = fx.manager.get_current_config().await;
        assert_eq!(
            config.config.unwrap().document.name.as_deref(),
            Some("root")
        );
    }

    #[tokio::test]
    async fn test_refresh_all_is_idempotent() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.hub.sign_in("user-1");
        fx.hub.set_organizations(vec![remote_org("acme")]);
        fx.hub
            .set_assistants(Some("acme"), vec![remote_assistant("acme", "helper")]);

        fx.manager.refresh_all().await;
        let first = fx.manager.get_organizations().await;
        fx.manager.refresh_all().await;
        let second = fx.manager.get_organizations().await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_profile_selection_sticks_across_refresh() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.local.add_workspace_assistant("/ws", "b.yaml");
        fx.manager.refresh_all().await;

        fx.manager
            .select_profile(&assistant_id("b.yaml"))
            .await
            .unwrap();
        fx.manager.refresh_all().await;

        assert_eq!(
            fx.manager.current_profile_id().await.as_deref(),
            Some(assistant_id("b.yaml").as_str())
        );
    }

    #[tokio::test]
    async fn test_fallback_when_selected_profile_disappears() {
        let fx = fixture();
        let path_b = fx.local.add_workspace_assistant("/ws", "b.yaml");
        fx.manager.refresh_all().await;
        fx.manager
            .select_profile(&assistant_id("b.yaml"))
            .await
            .unwrap();

        fx.local.remove(&path_b);
        fx.manager.refresh_all().await;

        // Deterministic rectification: no non-local profile exists, so the
        // first profile (global) is selected and persisted.
        assert_eq!(
            fx.manager.current_profile_id().await.as_deref(),
            Some("local")
        );
        assert_eq!(
            fx.selection
                .profile_for("/ws", PERSONAL_ORG_ID)
                .await
                .as_deref(),
            Some("local")
        );
    }

    #[tokio::test]
    async fn test_org_selection_defaults_to_first_non_personal() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub
            .set_organizations(vec![remote_org("acme"), remote_org("globex")]);

        fx.manager.refresh_all().await;

        assert_eq!(fx.manager.current_organization_id().await, "acme");
        // The resolved selection was persisted.
        assert_eq!(
            fx.selection.organization_for("/ws").await.as_deref(),
            Some("acme")
        );
    }

    #[tokio::test]
    async fn test_org_selection_sticks_across_refresh() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub
            .set_organizations(vec![remote_org("acme"), remote_org("globex")]);
        fx.manager.refresh_all().await;

        fx.manager
            .select_organization("globex", None)
            .await
            .unwrap();
        fx.manager.refresh_all().await;

        assert_eq!(fx.manager.current_organization_id().await, "globex");
    }

    #[tokio::test]
    async fn test_stale_org_hint_falls_back() {
        let fx = fixture();
        fx.selection
            .remember_organization("/ws", "vanished")
            .await
            .unwrap();

        fx.manager.refresh_all().await;

        assert_eq!(
            fx.manager.current_organization_id().await,
            PERSONAL_ORG_ID
        );
    }

    #[tokio::test]
    async fn test_custom_org_failure_is_isolated() {
        let fx = fixture();
        fx.custom.authenticate();
        fx.custom
            .set_organizations(vec![custom_org("bad"), custom_org("good")]);
        fx.custom.set_assistants("good", vec!["helper", "reviewer"]);
        fx.custom.fail_assistants_for("bad");

        fx.manager.refresh_all().await;

        let orgs = fx.manager.get_organizations().await;
        let ids: Vec<&str> = orgs.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["bad", "good", PERSONAL_ORG_ID]);
        assert!(orgs[0].profiles.is_empty());
        assert_eq!(orgs[1].profiles.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_discipline_on_profile_switch() {
        let fx = fixture();
        let path_a = fx.local.add_workspace_assistant("/ws", "a.yaml");
        let path_b = fx.local.add_workspace_assistant("/ws", "b.yaml");
        fx.manager.refresh_all().await;

        fx.manager
            .select_profile(&assistant_id("a.yaml"))
            .await
            .unwrap();
        assert_eq!(fx.local.read_count(&path_a), 1);

        // Switching to B clears A's cache and loads B exactly once.
        fx.manager
            .select_profile(&assistant_id("b.yaml"))
            .await
            .unwrap();
        assert_eq!(fx.local.read_count(&path_b), 1);
        fx.manager.get_current_config().await;
        assert_eq!(fx.local.read_count(&path_b), 1);

        // Switching back re-reads A from scratch.
        fx.manager
            .select_profile(&assistant_id("a.yaml"))
            .await
            .unwrap();
        assert_eq!(fx.local.read_count(&path_a), 2);
    }

    #[tokio::test]
    async fn test_select_unknown_organization_fails_and_preserves_state() {
        let fx = fixture();
        fx.manager.refresh_all().await;
        let before = fx.manager.get_organizations().await;
        let current = fx.manager.current_organization_id().await;

        let err = fx
            .manager
            .select_organization("does-not-exist", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(fx.manager.get_organizations().await, before);
        assert_eq!(fx.manager.current_organization_id().await, current);
    }

    #[tokio::test]
    async fn test_select_unknown_profile_fails() {
        let fx = fixture();
        fx.manager.refresh_all().await;

        let err = fx
            .manager
            .select_profile("does-not-exist")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_new_local_profile_appears_after_refresh() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");
        fx.manager.refresh_all().await;
        fx.manager
            .select_profile(&assistant_id("a.yaml"))
            .await
            .unwrap();

        assert!(fx.manager.select_profile("nonexistent").await.is_err());

        fx.local.add_workspace_assistant("/ws", "new.yaml");
        fx.manager.refresh_all().await;

        let orgs = fx.manager.get_organizations().await;
        assert!(
            orgs[0]
                .profiles
                .iter()
                .any(|p| p.id == assistant_id("new.yaml"))
        );
        // The previously selected profile stays current.
        assert_eq!(
            fx.manager.current_profile_id().await.as_deref(),
            Some(assistant_id("a.yaml").as_str())
        );
    }

    #[tokio::test]
    async fn test_listeners_notified_once_per_pass_in_order() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let first = Arc::new(RecordingListener::ordered("first", order.clone()));
        let second = Arc::new(RecordingListener::ordered("second", order.clone()));
        fx.manager.subscribe(first.clone());
        fx.manager.subscribe(second.clone());

        fx.manager.refresh_all().await;

        assert_eq!(first.notification_count(), 1);
        assert_eq!(second.notification_count(), 1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        // The payload is the settled result of this pass's load.
        assert!(first.last().unwrap().config.is_some());

        fx.manager
            .select_profile(&assistant_id("a.yaml"))
            .await
            .unwrap();
        assert_eq!(first.notification_count(), 2);
    }

    #[tokio::test]
    async fn test_noop_switches_do_not_notify() {
        let fx = fixture();
        fx.manager.refresh_all().await;

        let listener = Arc::new(RecordingListener::new());
        fx.manager.subscribe(listener.clone());

        // Already-current selections are no-ops.
        fx.manager
            .select_organization(PERSONAL_ORG_ID, None)
            .await
            .unwrap();
        fx.manager.select_profile("local").await.unwrap();

        assert_eq!(listener.notification_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_org_reload_is_interrupted_and_silent() {
        let fx = fixture();
        fx.custom.authenticate();
        fx.custom.set_organizations(vec![custom_org("bad")]);
        fx.custom.fail_assistants_for("bad");
        // Stick to the personal org first so the switch below is a real one.
        fx.selection
            .remember_organization("/ws", PERSONAL_ORG_ID)
            .await
            .unwrap();
        fx.manager.refresh_all().await;
        assert_eq!(
            fx.manager.current_organization_id().await,
            PERSONAL_ORG_ID
        );

        let listener = Arc::new(RecordingListener::new());
        fx.manager.subscribe(listener.clone());

        // The failed org has no profiles; selecting it interrupts the load
        // without touching any cache or listener.
        fx.manager.select_organization("bad", None).await.unwrap();

        assert_eq!(listener.notification_count(), 0);
        let result = fx.manager.get_current_config().await;
        assert!(result.interrupted);
        assert!(result.config.is_none());

        let serialized = fx.manager.get_current_config_serialized().await;
        assert!(serialized.interrupted);
    }

    #[tokio::test]
    async fn test_logout_falls_back_to_local_branch() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub.set_organizations(vec![remote_org("acme")]);
        fx.manager.refresh_all().await;
        assert_eq!(fx.manager.current_organization_id().await, "acme");

        // Logout triggers a full cascade; the hub branch no longer applies.
        fx.hub.sign_out();
        fx.manager.refresh_all().await;

        let orgs = fx.manager.get_organizations().await;
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, PERSONAL_ORG_ID);
        assert_eq!(
            fx.manager.current_organization_id().await,
            PERSONAL_ORG_ID
        );
    }

    #[tokio::test]
    async fn test_select_organization_with_explicit_profile() {
        let fx = fixture();
        fx.hub.sign_in("user-1");
        fx.hub.set_organizations(vec![remote_org("acme")]);
        fx.hub.set_assistants(
            Some("acme"),
            vec![
                remote_assistant("acme", "helper"),
                remote_assistant("acme", "reviewer"),
            ],
        );
        fx.manager.refresh_all().await;
        fx.manager
            .select_organization(PERSONAL_ORG_ID, None)
            .await
            .unwrap();

        fx.manager
            .select_organization("acme", Some("acme/reviewer"))
            .await
            .unwrap();

        assert_eq!(fx.manager.current_organization_id().await, "acme");
        assert_eq!(
            fx.manager.current_profile_id().await.as_deref(),
            Some("acme/reviewer")
        );
        // The explicit choice is persisted for the target organization.
        assert_eq!(
            fx.selection.profile_for("/ws", "acme").await.as_deref(),
            Some("acme/reviewer")
        );
    }

    struct NamedProvider(&'static str);

    impl tiller_core::config::ContextProvider for NamedProvider {
        fn title(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn test_register_context_provider_reloads() {
        let fx = fixture();
        fx.manager.refresh_all().await;

        let listener = Arc::new(RecordingListener::new());
        fx.manager.subscribe(listener.clone());

        fx.manager
            .register_context_provider(Arc::new(NamedProvider("repo-map")))
            .await;

        assert_eq!(listener.notification_count(), 1);
        let config = fx.manager.get_current_config().await.config.unwrap();
        assert_eq!(config.context_providers.len(), 1);
        assert_eq!(config.context_providers[0].title(), "repo-map");

        let serialized = fx.manager.get_current_config_serialized().await;
        assert_eq!(
            serialized.config.unwrap().context_provider_titles,
            vec!["repo-map"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_cascades_serialize() {
        let fx = fixture();
        fx.local.add_workspace_assistant("/ws", "a.yaml");

        let (first, second) = tokio::join!(fx.manager.refresh_all(), fx.manager.refresh_all());
        assert!(!first.interrupted);
        assert!(!second.interrupted);

        let orgs = fx.manager.get_organizations().await;
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].profiles.len(), 2);
    }
}
