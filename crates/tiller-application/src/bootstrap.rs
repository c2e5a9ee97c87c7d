//! Standard wiring of the engine with the on-disk and HTTP adapters.
//!
//! Hosts that don't need custom collaborators construct a [`TillerRuntime`]
//! and drive everything through it; the engine itself stays fully injectable
//! for tests and embedders.

use std::path::PathBuf;
use std::sync::Arc;

use tiller_core::config::{ConfigResult, LoadedConfig};
use tiller_core::error::Result;
use tiller_infrastructure::{
    DirAssistantSource, DirAssistantWriter, HttpCustomClient, HttpHubClient, HubSession,
    StaticWorkspaceProvider, TillerPaths, TokenStore, TomlSelectionStore,
};

use crate::engine::ConfigManager;

/// The composed engine plus the credential clients the host drives.
pub struct TillerRuntime {
    pub manager: Arc<ConfigManager>,
    pub hub: Arc<HttpHubClient>,
    pub custom: Arc<HttpCustomClient>,
}

impl TillerRuntime {
    /// Wires the engine with the standard adapters rooted at the platform
    /// config directory.
    pub fn new(
        workspace_roots: Vec<PathBuf>,
        hub_base_url: &str,
        custom_base_url: &str,
    ) -> Result<Self> {
        Self::with_paths(
            TillerPaths::new(None),
            workspace_roots,
            hub_base_url,
            custom_base_url,
        )
    }

    /// Same as [`TillerRuntime::new`] with an explicit paths root.
    pub fn with_paths(
        paths: TillerPaths,
        workspace_roots: Vec<PathBuf>,
        hub_base_url: &str,
        custom_base_url: &str,
    ) -> Result<Self> {
        let hub = Arc::new(HttpHubClient::new(hub_base_url));
        let custom = Arc::new(HttpCustomClient::new(
            custom_base_url,
            TokenStore::new(paths.clone()),
        ));
        let selection = Arc::new(TomlSelectionStore::default_location(&paths)?);
        let local = Arc::new(DirAssistantSource::new(&paths)?);

        let manager = Arc::new(ConfigManager::new(
            Arc::new(StaticWorkspaceProvider::new(workspace_roots)),
            selection,
            hub.clone(),
            custom.clone(),
            local,
            Arc::new(DirAssistantWriter::new()),
        ));

        Ok(Self {
            manager,
            hub,
            custom,
        })
    }

    /// Session change: swap the hub session and cascade from the top.
    pub async fn update_hub_session(
        &self,
        session: Option<HubSession>,
    ) -> ConfigResult<LoadedConfig> {
        self.hub.set_session(session).await;
        self.manager.refresh_all().await
    }

    /// Custom login: on success the organization list is re-resolved.
    pub async fn login_custom(&self, id: &str, password: &str) -> Result<ConfigResult<LoadedConfig>> {
        self.custom.login(id, password).await?;
        Ok(self.manager.refresh_all().await)
    }

    /// Custom logout, cascading back to the remaining credential sources.
    pub async fn logout_custom(&self) -> Result<ConfigResult<LoadedConfig>> {
        self.custom.logout().await?;
        Ok(self.manager.refresh_all().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiller_core::organization::PERSONAL_ORG_ID;
    use tempfile::TempDir;

    fn runtime(config_dir: &TempDir, workspace: &TempDir) -> TillerRuntime {
        std::fs::write(config_dir.path().join("config.yaml"), "name: root\n").unwrap();
        TillerRuntime::with_paths(
            TillerPaths::new(Some(config_dir.path())),
            vec![workspace.path().to_path_buf()],
            "https://hub.invalid",
            "https://custom.invalid",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_offline_runtime_resolves_local_branch() {
        let config_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let assistants = workspace.path().join(".tiller/assistants");
        std::fs::create_dir_all(&assistants).unwrap();
        std::fs::write(assistants.join("helper.yaml"), "name: helper\n").unwrap();

        let runtime = runtime(&config_dir, &workspace);
        let result = runtime.manager.refresh_all().await;
        assert!(!result.interrupted);

        let orgs = runtime.manager.get_organizations().await;
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, PERSONAL_ORG_ID);
        assert_eq!(orgs[0].profiles.len(), 2);

        // Selection hints landed on disk.
        assert!(config_dir.path().join("selection.toml").exists());
    }

    #[tokio::test]
    async fn test_selection_survives_runtime_restart() {
        let config_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let assistants = workspace.path().join(".tiller/assistants");
        std::fs::create_dir_all(&assistants).unwrap();
        std::fs::write(assistants.join("helper.yaml"), "name: helper\n").unwrap();
        let helper_id = assistants.join("helper.yaml").to_string_lossy().into_owned();

        {
            let runtime = runtime(&config_dir, &workspace);
            runtime.manager.refresh_all().await;
            runtime.manager.select_profile(&helper_id).await.unwrap();
        }

        let reopened = runtime(&config_dir, &workspace);
        reopened.manager.refresh_all().await;
        assert_eq!(
            reopened.manager.current_profile_id().await.as_deref(),
            Some(helper_id.as_str())
        );
    }
}
