//! Concrete adapters for the Tiller configuration engine: path management,
//! the TOML selection store, directory-based assistant access, and the HTTP
//! hub/custom clients.

pub mod assistant_writer;
pub mod custom_client;
pub mod hub_client;
pub mod local_source;
pub mod paths;
pub mod selection_store;
pub mod workspace;

pub use crate::assistant_writer::DirAssistantWriter;
pub use crate::custom_client::{HttpCustomClient, TokenStore};
pub use crate::hub_client::{HttpHubClient, HubSession};
pub use crate::local_source::DirAssistantSource;
pub use crate::paths::TillerPaths;
pub use crate::selection_store::TomlSelectionStore;
pub use crate::workspace::StaticWorkspaceProvider;
