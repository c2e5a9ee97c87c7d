//! The owning wrapper around one loadable profile.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{ConfigResult, ContextProvider, LoadedConfig, SerializedConfig};
use crate::profile::loader::ProfileLoader;
use crate::profile::model::ProfileDescriptor;

/// Wraps one profile loader with result caching.
///
/// `load` is idempotent while a cached result is present; the cache mutex is
/// held across the underlying load, so concurrent callers of the same handle
/// coalesce onto one fresh load instead of racing.
///
/// Loader failures never escape this boundary: they are converted into a
/// [`ConfigResult`] with `config = None` and a fatal error entry.
pub struct ProfileHandle {
    loader: Arc<dyn ProfileLoader>,
    cached: Mutex<Option<ConfigResult<LoadedConfig>>>,
}

impl ProfileHandle {
    pub fn new(loader: Arc<dyn ProfileLoader>) -> Self {
        Self {
            loader,
            cached: Mutex::new(None),
        }
    }

    pub fn description(&self) -> ProfileDescriptor {
        self.loader.description().clone()
    }

    /// Returns the cached result, or performs and caches a fresh load.
    pub async fn load(
        &self,
        extra_providers: &[Arc<dyn ContextProvider>],
    ) -> ConfigResult<LoadedConfig> {
        let mut cached = self.cached.lock().await;
        if let Some(result) = cached.as_ref() {
            return result.clone();
        }

        let result = match self.loader.load(extra_providers).await {
            Ok(config) => ConfigResult::ok(config),
            Err(err) => {
                tracing::warn!(
                    profile = %self.loader.description().id,
                    "profile load failed: {err}"
                );
                ConfigResult::failed(err)
            }
        };
        *cached = Some(result.clone());
        result
    }

    /// Drops the cached result; the next `load` recomputes.
    ///
    /// Safe to call before any load has occurred.
    pub async fn clear_cache(&self) {
        *self.cached.lock().await = None;
    }

    /// Like `load`, projected into the transport-safe shape.
    pub async fn serialize(
        &self,
        extra_providers: &[Arc<dyn ContextProvider>],
    ) -> ConfigResult<SerializedConfig> {
        self.load(extra_providers)
            .await
            .map(|config| config.serialized())
    }
}

impl std::fmt::Debug for ProfileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileHandle")
            .field("profile", &self.loader.description().id)
            .finish()
    }
}
