//! On-disk persistence for custom-organization assistants.
//!
//! Fetched custom assistants are written to a deterministic path keyed by
//! organization id and slug, so they become ordinary local profiles on the
//! next resolution pass.

use std::path::PathBuf;

use async_trait::async_trait;
use tiller_core::client::CustomAssistant;
use tiller_core::error::{Result, TillerError};
use tiller_core::source::AssistantWriter;

use crate::paths::workspace_root_dir;

/// Writes custom assistants under the first workspace root:
/// `<root>/<root-dir>/<org id>/assistants/<slug>.yaml`.
#[derive(Debug, Clone, Default)]
pub struct DirAssistantWriter;

impl DirAssistantWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AssistantWriter for DirAssistantWriter {
    async fn save(
        &self,
        workspace_roots: &[PathBuf],
        org_id: &str,
        assistant: &CustomAssistant,
    ) -> Result<PathBuf> {
        let root = workspace_roots
            .first()
            .ok_or_else(|| TillerError::config("no workspace roots available"))?;

        let root_dir = workspace_root_dir(root).await;
        let dir = root.join(&root_dir).join(org_id).join("assistants");
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.yaml", assistant.slug));
        tokio::fs::write(&path, &assistant.raw_config).await?;

        tracing::debug!(org = org_id, path = %path.display(), "saved custom assistant");
        Ok(path)
    }
}
