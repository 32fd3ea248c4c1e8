//! ALM integrations and the Bitbucket Server import workflow

pub mod services;
pub mod workflow;

// Re-export commonly used types for external crates
pub use services::alm_integration::{AlmIntegrationApi, AlmIntegrationError, AlmIntegrationResult};
pub use services::client::AlmIntegrationClient;
pub use services::types::{
    AlmKind, AlmSettingsInstance, BitbucketProject, BitbucketRepository, CreatedProject,
};
pub use workflow::bitbucket_import::{
    BitbucketImportController, ImportState, ImportView, ProjectCreateCallback,
};
