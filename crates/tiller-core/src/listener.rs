//! Config update observer seam.

use crate::config::{ConfigResult, LoadedConfig};

/// Observer of configuration reloads.
///
/// Listeners are invoked synchronously, in registration order, at most once
/// per cascade pass, and only after that pass's profile load has settled.
/// A panicking listener is the subscriber's bug; the registry does not catch.
pub trait ConfigListener: Send + Sync {
    fn on_config_update(&self, result: &ConfigResult<LoadedConfig>);
}
