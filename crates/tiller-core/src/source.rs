//! Local assistant file access.
//!
//! Locally-defined profiles are plain YAML documents on disk. The engine
//! reaches them through these seams so the directory layout stays an
//! infrastructure concern.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::client::CustomAssistant;
use crate::error::Result;

/// Which assistant directories a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantScope {
    /// The global assistants directory plus each workspace root's
    /// assistants subdirectory.
    Standard,
    /// Only the workspace roots' assistants subdirectories.
    WorkspaceOnly,
    /// Only the per-organization storage of one custom organization.
    Organization(String),
}

/// Enumerates and reads locally-defined assistant documents.
#[async_trait]
pub trait LocalAssistantSource: Send + Sync {
    /// Path of the root configuration document (the global profile).
    fn global_config_path(&self) -> PathBuf;

    /// Assistant files within the scope, in a stable order.
    async fn list_assistants(
        &self,
        workspace_roots: &[PathBuf],
        scope: &AssistantScope,
    ) -> Result<Vec<PathBuf>>;

    /// Reads one document. Called on every fresh profile load so that cache
    /// invalidation always re-reads current file contents.
    async fn read(&self, path: &Path) -> Result<String>;
}

/// Persists a remotely-fetched assistant to a deterministic local path, keyed
/// by organization id and slug.
#[async_trait]
pub trait AssistantWriter: Send + Sync {
    async fn save(
        &self,
        workspace_roots: &[PathBuf],
        org_id: &str,
        assistant: &CustomAssistant,
    ) -> Result<PathBuf>;
}
