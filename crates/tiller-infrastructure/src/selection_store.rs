//! TOML-backed selection store.
//!
//! The last-selected organization and profile hints are kept in one small
//! TOML document, cached in memory and written atomically (tmp file + fsync +
//! atomic rename) under an exclusive file lock.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tiller_core::error::{Result, TillerError};
use tiller_core::selection::SelectionStore;
use tokio::sync::Mutex;

use crate::paths::TillerPaths;

/// Persisted selection hints.
///
/// `organizations` maps a workspace identity to the last-selected
/// organization id; `profiles` maps `"<workspace>:::<org>"` to the
/// last-selected profile id. Entries are only ever added or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SelectionRecord {
    #[serde(default)]
    organizations: BTreeMap<String, String>,
    #[serde(default)]
    profiles: BTreeMap<String, String>,
}

fn profile_key(workspace_id: &str, org_id: &str) -> String {
    format!("{workspace_id}:::{org_id}")
}

/// Durable selection store backed by `selection.toml`.
///
/// Reads degrade to "no hint" on any failure; hints are advisory and must
/// never fail a resolution pass.
pub struct TomlSelectionStore {
    path: PathBuf,
    /// Cached record; `None` until first access.
    cached: Mutex<Option<SelectionRecord>>,
}

impl TomlSelectionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    /// Creates a store at the standard selection-file location.
    pub fn default_location(paths: &TillerPaths) -> Result<Self> {
        Ok(Self::new(paths.selection_file()?))
    }

    fn load_from_disk(path: &Path) -> Result<SelectionRecord> {
        if !path.exists() {
            return Ok(SelectionRecord::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(SelectionRecord::default());
        }
        Ok(toml::from_str(&content)?)
    }

    /// Writes the record atomically: tmp file in the same directory, fsync,
    /// rename, all under an exclusive lock file.
    fn save_to_disk(path: &Path, record: &SelectionRecord) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| TillerError::io("selection path has no parent directory"))?;
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }

        let _lock = FileLock::acquire(path)?;

        let toml_string = toml::to_string_pretty(record)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| TillerError::io("selection path has no file name"))?;
        let tmp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Returns the cached record, loading it on first access.
    ///
    /// Load failures are logged and degrade to an empty record.
    async fn record(&self) -> SelectionRecord {
        let mut cached = self.cached.lock().await;
        if let Some(record) = cached.as_ref() {
            return record.clone();
        }
        let record = match Self::load_from_disk(&self.path) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "failed to load selection hints, starting empty: {err}"
                );
                SelectionRecord::default()
            }
        };
        *cached = Some(record.clone());
        record
    }

    async fn mutate(&self, f: impl FnOnce(&mut SelectionRecord)) -> Result<()> {
        let mut cached = self.cached.lock().await;
        let mut record = match cached.take() {
            Some(record) => record,
            None => Self::load_from_disk(&self.path).unwrap_or_default(),
        };
        f(&mut record);
        Self::save_to_disk(&self.path, &record)?;
        *cached = Some(record);
        Ok(())
    }
}

#[async_trait]
impl SelectionStore for TomlSelectionStore {
    async fn organization_for(&self, workspace_id: &str) -> Option<String> {
        self.record().await.organizations.get(workspace_id).cloned()
    }

    async fn remember_organization(&self, workspace_id: &str, org_id: &str) -> Result<()> {
        self.mutate(|record| {
            record
                .organizations
                .insert(workspace_id.to_string(), org_id.to_string());
        })
        .await
    }

    async fn profile_for(&self, workspace_id: &str, org_id: &str) -> Option<String> {
        self.record()
            .await
            .profiles
            .get(&profile_key(workspace_id, org_id))
            .cloned()
    }

    async fn remember_profile(
        &self,
        workspace_id: &str,
        org_id: &str,
        profile_id: &str,
    ) -> Result<()> {
        self.mutate(|record| {
            record
                .profiles
                .insert(profile_key(workspace_id, org_id), profile_id.to_string());
        })
        .await
    }
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| TillerError::io(format!("failed to acquire selection lock: {e}")))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the file handle is dropped.
        let _ = fs::remove_file(&self.lock_path);
    }
}
