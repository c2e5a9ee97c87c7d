//! Unified path management for tiller state.
//!
//! All durable tiller state lives under one platform config directory, with
//! an optional base-directory override for tests.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tiller/            # Config directory
//! ├── config.yaml              # Global configuration document (the "local" profile)
//! ├── assistants/              # Globally-defined assistant documents
//! ├── selection.toml           # Last-selected organization/profile hints
//! └── secret.json              # Custom credential token
//! ```
//!
//! Workspace-local assistants live under `<workspace root>/.tiller/`; the
//! subdirectory name can be overridden per workspace via a `.tiller.json`
//! settings file at the workspace root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tiller_core::error::{Result, TillerError};

/// Default workspace-local state directory name.
pub const DEFAULT_WORKSPACE_ROOT_DIR: &str = ".tiller";

/// Per-workspace settings file overriding the state directory name.
pub const WORKSPACE_SETTINGS_FILE: &str = ".tiller.json";

/// Unified path management for tiller.
#[derive(Debug, Clone, Default)]
pub struct TillerPaths {
    base: Option<PathBuf>,
}

impl TillerPaths {
    /// Creates path management rooted at the platform config directory, or
    /// at `base` when given (used by tests).
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the tiller configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("tiller"))
            .ok_or_else(|| TillerError::config("cannot find config directory"))
    }

    /// Returns the path to the global configuration document.
    pub fn global_config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.yaml"))
    }

    /// Returns the directory of globally-defined assistant documents.
    pub fn global_assistants_dir(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("assistants"))
    }

    /// Returns the path to the persisted selection hints.
    pub fn selection_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("selection.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// The file holds the custom credential token; keep permissions at 600.
    pub fn secret_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    /// Ensures the secret file exists, creating an empty record if it
    /// doesn't. Sets permissions to 600 (user read/write only) on Unix.
    pub fn ensure_secret_file(&self) -> Result<PathBuf> {
        let secret_path = self.secret_file()?;

        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::to_string_pretty(&SecretRecord::default())?;
        std::fs::write(&secret_path, template)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        Ok(secret_path)
    }
}

/// Persisted secret record, one token slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretRecord {
    #[serde(default)]
    pub custom_auth_token: Option<String>,
}

/// Per-workspace settings parsed from [`WORKSPACE_SETTINGS_FILE`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub assistant: AssistantSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Resolves the workspace-local state directory name for one workspace root.
///
/// Reads `.tiller.json` at the root when present; malformed settings degrade
/// to the default with a warning.
pub async fn workspace_root_dir(workspace_root: &Path) -> String {
    let settings_path = workspace_root.join(WORKSPACE_SETTINGS_FILE);
    if !settings_path.exists() {
        return DEFAULT_WORKSPACE_ROOT_DIR.to_string();
    }

    match tokio::fs::read_to_string(&settings_path).await {
        Ok(raw) => match serde_json::from_str::<WorkspaceSettings>(&raw) {
            Ok(settings) => settings
                .assistant
                .root_dir
                .filter(|dir| !dir.is_empty())
                .unwrap_or_else(|| DEFAULT_WORKSPACE_ROOT_DIR.to_string()),
            Err(err) => {
                tracing::warn!(
                    path = %settings_path.display(),
                    "malformed workspace settings, using default root dir: {err}"
                );
                DEFAULT_WORKSPACE_ROOT_DIR.to_string()
            }
        },
        Err(err) => {
            tracing::warn!(
                path = %settings_path.display(),
                "failed to read workspace settings, using default root dir: {err}"
            );
            DEFAULT_WORKSPACE_ROOT_DIR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_dir_default() {
        let paths = TillerPaths::new(None);
        let config_dir = paths.config_dir().unwrap();
        assert!(config_dir.ends_with("tiller"));
    }

    #[test]
    fn test_config_dir_override() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillerPaths::new(Some(temp_dir.path()));
        assert_eq!(paths.config_dir().unwrap(), temp_dir.path());
        assert!(paths.selection_file().unwrap().ends_with("selection.toml"));
        assert!(paths.global_config_file().unwrap().ends_with("config.yaml"));
        assert!(paths.global_assistants_dir().unwrap().ends_with("assistants"));
    }

    #[test]
    fn test_ensure_secret_file_creates_template() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillerPaths::new(Some(temp_dir.path()));

        let secret_path = paths.ensure_secret_file().unwrap();
        assert!(secret_path.exists());

        let record: SecretRecord =
            serde_json::from_str(&std::fs::read_to_string(&secret_path).unwrap()).unwrap();
        assert!(record.custom_auth_token.is_none());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&secret_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_workspace_root_dir_default() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            workspace_root_dir(temp_dir.path()).await,
            DEFAULT_WORKSPACE_ROOT_DIR
        );
    }

    #[tokio::test]
    async fn test_workspace_root_dir_override() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(WORKSPACE_SETTINGS_FILE),
            r#"{"assistant": {"root_dir": ".acme", "api_url": "https://acme.example"}}"#,
        )
        .unwrap();
        assert_eq!(workspace_root_dir(temp_dir.path()).await, ".acme");
    }

    #[tokio::test]
    async fn test_workspace_root_dir_malformed_settings() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(WORKSPACE_SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(
            workspace_root_dir(temp_dir.path()).await,
            DEFAULT_WORKSPACE_ROOT_DIR
        );
    }
}
