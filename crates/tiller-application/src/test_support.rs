//! Shared mock collaborators for resolver and engine tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tiller_core::client::{CustomAssistant, CustomCredentialClient, HubClient, RemoteAssistant};
use tiller_core::config::{ConfigResult, LoadedConfig};
use tiller_core::error::{Result, TillerError};
use tiller_core::listener::ConfigListener;
use tiller_core::organization::OrganizationDescriptor;
use tiller_core::selection::SelectionStore;
use tiller_core::source::{AssistantScope, AssistantWriter, LocalAssistantSource};

pub fn remote_org(id: &str) -> OrganizationDescriptor {
    OrganizationDescriptor {
        id: id.to_string(),
        display_name: id.to_uppercase(),
        icon_url: None,
        slug: Some(id.to_string()),
    }
}

pub fn custom_org(id: &str) -> OrganizationDescriptor {
    OrganizationDescriptor {
        id: id.to_string(),
        display_name: id.to_string(),
        icon_url: None,
        slug: Some(id.to_string()),
    }
}

pub fn remote_assistant(owner: &str, package: &str) -> RemoteAssistant {
    RemoteAssistant {
        owner_slug: owner.to_string(),
        package_slug: package.to_string(),
        icon_url: None,
        raw_config: format!("name: {package}\n"),
    }
}

/// In-memory selection store.
#[derive(Default)]
pub struct MemorySelectionStore {
    organizations: Mutex<HashMap<String, String>>,
    profiles: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn organization_for(&self, workspace_id: &str) -> Option<String> {
        self.organizations.lock().unwrap().get(workspace_id).cloned()
    }

    async fn remember_organization(&self, workspace_id: &str, org_id: &str) -> Result<()> {
        self.organizations
            .lock()
            .unwrap()
            .insert(workspace_id.to_string(), org_id.to_string());
        Ok(())
    }

    async fn profile_for(&self, workspace_id: &str, org_id: &str) -> Option<String> {
        self.profiles
            .lock()
            .unwrap()
            .get(&format!("{workspace_id}:::{org_id}"))
            .cloned()
    }

    async fn remember_profile(
        &self,
        workspace_id: &str,
        org_id: &str,
        profile_id: &str,
    ) -> Result<()> {
        self.profiles.lock().unwrap().insert(
            format!("{workspace_id}:::{org_id}"),
            profile_id.to_string(),
        );
        Ok(())
    }
}

/// In-memory assistant file tree with per-path read counters.
pub struct MemoryAssistantSource {
    global_config: PathBuf,
    global_dir: PathBuf,
    files: Mutex<BTreeMap<PathBuf, String>>,
    reads: Mutex<HashMap<PathBuf, usize>>,
}

impl MemoryAssistantSource {
    pub fn new() -> Self {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/cfg/config.yaml"),
            "name: root\n".to_string(),
        );
        Self {
            global_config: PathBuf::from("/cfg/config.yaml"),
            global_dir: PathBuf::from("/cfg/assistants"),
            files: Mutex::new(files),
            reads: Mutex::new(HashMap::new()),
        }
    }

    pub fn workspace_assistant_path(root: &str, name: &str) -> PathBuf {
        PathBuf::from(root).join(".tiller/assistants").join(name)
    }

    pub fn add_workspace_assistant(&self, root: &str, name: &str) -> PathBuf {
        let path = Self::workspace_assistant_path(root, name);
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
        self.files
            .lock()
            .unwrap()
            .insert(path.clone(), format!("name: {stem}\n"));
        path
    }

    pub fn add_global_assistant(&self, name: &str) -> PathBuf {
        let path = self.global_dir.join(name);
        self.files
            .lock()
            .unwrap()
            .insert(path.clone(), format!("name: {name}\n"));
        path
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().unwrap().remove(path);
    }

    pub fn read_count(&self, path: &Path) -> usize {
        self.reads.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn insert(&self, path: PathBuf, content: String) {
        self.files.lock().unwrap().insert(path, content);
    }
}

#[async_trait]
impl LocalAssistantSource for MemoryAssistantSource {
    fn global_config_path(&self) -> PathBuf {
        self.global_config.clone()
    }

    async fn list_assistants(
        &self,
        workspace_roots: &[PathBuf],
        scope: &AssistantScope,
    ) -> Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        if matches!(scope, AssistantScope::Standard) {
            dirs.push(self.global_dir.clone());
        }
        for root in workspace_roots {
            let dir = match scope {
                AssistantScope::Organization(org_id) => {
                    root.join(".tiller").join(org_id).join("assistants")
                }
                _ => root.join(".tiller/assistants"),
            };
            dirs.push(dir);
        }

        let files = self.files.lock().unwrap();
        let mut listed = Vec::new();
        for dir in dirs {
            let mut in_dir: Vec<PathBuf> = files
                .keys()
                .filter(|path| path.parent() == Some(dir.as_path()))
                .cloned()
                .collect();
            in_dir.sort();
            listed.extend(in_dir);
        }
        Ok(listed)
    }

    async fn read(&self, path: &Path) -> Result<String> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TillerError::io(format!("no such file: {}", path.display())))
    }
}

/// Writer that lands assistants in the in-memory file tree.
pub struct MemoryWriter {
    source: Arc<MemoryAssistantSource>,
}

impl MemoryWriter {
    pub fn new(source: Arc<MemoryAssistantSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl AssistantWriter for MemoryWriter {
    async fn save(
        &self,
        workspace_roots: &[PathBuf],
        org_id: &str,
        assistant: &CustomAssistant,
    ) -> Result<PathBuf> {
        let root = workspace_roots
            .first()
            .ok_or_else(|| TillerError::config("no workspace roots available"))?;
        let path = root
            .join(".tiller")
            .join(org_id)
            .join("assistants")
            .join(format!("{}.yaml", assistant.slug));
        self.source.insert(path.clone(), assistant.raw_config.clone());
        Ok(path)
    }
}

/// Scriptable hub client.
#[derive(Default)]
pub struct MockHubClient {
    user: Mutex<Option<String>>,
    organizations: Mutex<Vec<OrganizationDescriptor>>,
    assistants: Mutex<HashMap<Option<String>, Vec<RemoteAssistant>>>,
    fail_organizations: Mutex<bool>,
}

impl MockHubClient {
    pub fn sign_in(&self, user_id: &str) {
        *self.user.lock().unwrap() = Some(user_id.to_string());
    }

    pub fn sign_out(&self) {
        *self.user.lock().unwrap() = None;
    }

    pub fn set_organizations(&self, orgs: Vec<OrganizationDescriptor>) {
        *self.organizations.lock().unwrap() = orgs;
    }

    pub fn set_assistants(&self, org_scope: Option<&str>, assistants: Vec<RemoteAssistant>) {
        self.assistants
            .lock()
            .unwrap()
            .insert(org_scope.map(str::to_string), assistants);
    }

    pub fn fail_organization_listing(&self) {
        *self.fail_organizations.lock().unwrap() = true;
    }
}

#[async_trait]
impl HubClient for MockHubClient {
    async fn current_user_id(&self) -> Option<String> {
        self.user.lock().unwrap().clone()
    }

    async fn list_organizations(&self) -> Result<Vec<OrganizationDescriptor>> {
        if *self.fail_organizations.lock().unwrap() {
            return Err(TillerError::source_unavailable("hub", "listing failed"));
        }
        Ok(self.organizations.lock().unwrap().clone())
    }

    async fn list_assistants(&self, org_scope: Option<&str>) -> Result<Vec<RemoteAssistant>> {
        Ok(self
            .assistants
            .lock()
            .unwrap()
            .get(&org_scope.map(str::to_string))
            .cloned()
            .unwrap_or_default())
    }
}

/// Scriptable custom credential client.
#[derive(Default)]
pub struct MockCustomClient {
    authenticated: Mutex<bool>,
    organizations: Mutex<Vec<OrganizationDescriptor>>,
    assistants: Mutex<HashMap<String, Vec<CustomAssistant>>>,
    failing: Mutex<HashSet<String>>,
}

impl MockCustomClient {
    pub fn authenticate(&self) {
        *self.authenticated.lock().unwrap() = true;
    }

    pub fn set_organizations(&self, orgs: Vec<OrganizationDescriptor>) {
        *self.organizations.lock().unwrap() = orgs;
    }

    pub fn set_assistants(&self, org_id: &str, slugs: Vec<&str>) {
        let assistants = slugs
            .into_iter()
            .map(|slug| CustomAssistant {
                slug: slug.to_string(),
                raw_config: format!("name: {slug}\n"),
            })
            .collect();
        self.assistants
            .lock()
            .unwrap()
            .insert(org_id.to_string(), assistants);
    }

    pub fn fail_assistants_for(&self, org_id: &str) {
        self.failing.lock().unwrap().insert(org_id.to_string());
    }
}

#[async_trait]
impl CustomCredentialClient for MockCustomClient {
    async fn is_authenticated(&self) -> bool {
        *self.authenticated.lock().unwrap()
    }

    async fn list_organizations(&self) -> Result<Vec<OrganizationDescriptor>> {
        Ok(self.organizations.lock().unwrap().clone())
    }

    async fn list_assistants(&self, org_id: &str) -> Result<Vec<CustomAssistant>> {
        if self.failing.lock().unwrap().contains(org_id) {
            return Err(TillerError::source_unavailable(org_id, "fetch failed"));
        }
        Ok(self
            .assistants
            .lock()
            .unwrap()
            .get(org_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Listener that records every notification.
#[derive(Default)]
pub struct RecordingListener {
    results: Mutex<Vec<ConfigResult<LoadedConfig>>>,
    label: Option<String>,
    order: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that also appends `label` to a shared ordering log.
    pub fn ordered(label: &str, order: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            label: Some(label.to_string()),
            order: Some(order),
        }
    }

    pub fn notification_count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<ConfigResult<LoadedConfig>> {
        self.results.lock().unwrap().last().cloned()
    }
}

impl ConfigListener for RecordingListener {
    fn on_config_update(&self, result: &ConfigResult<LoadedConfig>) {
        if let (Some(label), Some(order)) = (&self.label, &self.order) {
            order.lock().unwrap().push(label.clone());
        }
        self.results.lock().unwrap().push(result.clone());
    }
}
