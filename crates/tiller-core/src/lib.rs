//! Core domain model and trait seams for the Tiller configuration engine.
//!
//! This crate defines what an organization, a profile, and a configuration
//! load result are, plus the external collaborator contracts (workspace
//! identity, durable selection hints, remote clients, local file access).
//! Concrete adapters live in `tiller-infrastructure`; the cascading engine
//! lives in `tiller-application`.

pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod organization;
pub mod profile;
pub mod selection;
pub mod source;
pub mod workspace;

// Re-export common error type
pub use error::TillerError;
