//! Workspace identity.
//!
//! All persisted selections are scoped by a stable key derived from the
//! ordered set of open workspace roots.

use std::path::PathBuf;

use async_trait::async_trait;

/// Provides the ordered workspace root paths for the current session.
///
/// Must be stable within a session; the engine caches the derived identity
/// and recomputes it only at the start of a full cascade.
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    async fn workspace_roots(&self) -> Vec<PathBuf>;
}

/// Derives the stable workspace identity key from the ordered root paths.
pub fn workspace_identity(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("&")
}
