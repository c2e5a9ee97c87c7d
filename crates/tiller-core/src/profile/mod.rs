//! Profile domain model, loaders, and the caching handle.

pub mod handle;
pub mod loader;
pub mod model;

pub use handle::ProfileHandle;
pub use loader::{GLOBAL_PROFILE_ID, HubProfileLoader, LocalProfileLoader, ProfileLoader};
pub use model::{ProfileDescriptor, ProfileKind};
