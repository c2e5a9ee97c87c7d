//! Workspace provider implementations.

use std::path::PathBuf;

use async_trait::async_trait;
use tiller_core::workspace::WorkspaceProvider;

/// A fixed, host-supplied list of workspace roots.
///
/// Desktop hosts hand the open folder list over at startup; tests construct
/// one around temp directories.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspaceProvider {
    roots: Vec<PathBuf>,
}

impl StaticWorkspaceProvider {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

#[async_trait]
impl WorkspaceProvider for StaticWorkspaceProvider {
    async fn workspace_roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }
}
