//! Organization domain model.

pub mod model;

pub use model::{Organization, OrganizationDescriptor, OrganizationSnapshot, PERSONAL_ORG_ID};
