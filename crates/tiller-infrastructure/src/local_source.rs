//! Directory-based local assistant source.
//!
//! Users can define as many local assistants as they want: globally under
//! `~/.config/tiller/assistants/`, and per workspace under
//! `<root>/.tiller/assistants/`. Custom-organization assistants live in a
//! per-organization subdirectory and are enumerated in isolation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tiller_core::error::Result;
use tiller_core::source::{AssistantScope, LocalAssistantSource};

use crate::paths::{TillerPaths, workspace_root_dir};

const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Scans assistant directories for YAML documents.
pub struct DirAssistantSource {
    global_config: PathBuf,
    global_assistants: PathBuf,
}

impl DirAssistantSource {
    pub fn new(paths: &TillerPaths) -> Result<Self> {
        Ok(Self {
            global_config: paths.global_config_file()?,
            global_assistants: paths.global_assistants_dir()?,
        })
    }

    /// Lists YAML files directly inside `dir`, sorted by path.
    ///
    /// A missing directory is an empty listing, not an error.
    async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| YAML_EXTENSIONS.contains(&ext))
                .unwrap_or(false);
            if path.is_file() && is_yaml {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Assistant directories of one workspace root for the given scope.
    async fn workspace_dir(root: &Path, scope: &AssistantScope) -> PathBuf {
        let root_dir = workspace_root_dir(root).await;
        match scope {
            AssistantScope::Organization(org_id) => {
                root.join(&root_dir).join(org_id).join("assistants")
            }
            _ => root.join(&root_dir).join("assistants"),
        }
    }
}

#[async_trait]
impl LocalAssistantSource for DirAssistantSource {
    fn global_config_path(&self) -> PathBuf {
        self.global_config.clone()
    }

    async fn list_assistants(
        &self,
        workspace_roots: &[PathBuf],
        scope: &AssistantScope,
    ) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if matches!(scope, AssistantScope::Standard) {
            files.extend(Self::list_dir(&self.global_assistants).await?);
        }

        for root in workspace_roots {
            let dir = Self::workspace_dir(root, scope).await;
            files.extend(Self::list_dir(&dir).await?);
        }

        Ok(files)
    }

    async fn read(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
