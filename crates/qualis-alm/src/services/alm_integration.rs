use async_trait::async_trait;
use qualis_core::ConfigError;
use thiserror::Error;

use super::types::{
    AlmSettingsResponse, ImportProjectResponse, ProjectsResponse, RepositoriesResponse,
};

#[derive(Error, Debug)]
pub enum AlmIntegrationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type AlmIntegrationResult<T> = Result<T, AlmIntegrationError>;

/// Web API operations backing ALM project import
///
/// Every call is scoped by `alm_setting`, the key of a configured ALM instance.
#[async_trait]
pub trait AlmIntegrationApi: Send + Sync {
    /// List configured ALM instances
    async fn list_alm_settings(&self) -> AlmIntegrationResult<AlmSettingsResponse>;

    /// Whether the personal access token stored for this instance is usable
    async fn check_personal_access_token(&self, alm_setting: &str) -> AlmIntegrationResult<bool>;

    /// Store a personal access token for this instance
    async fn set_personal_access_token(
        &self,
        alm_setting: &str,
        token: &str,
    ) -> AlmIntegrationResult<()>;

    async fn list_bitbucket_server_projects(
        &self,
        alm_setting: &str,
    ) -> AlmIntegrationResult<ProjectsResponse>;

    /// Search repositories of one Bitbucket project, looked up by project name
    async fn search_bitbucket_server_repositories(
        &self,
        alm_setting: &str,
        project_name: &str,
    ) -> AlmIntegrationResult<RepositoriesResponse>;

    /// Create a new project bound to a Bitbucket Server repository
    async fn import_bitbucket_server_project(
        &self,
        alm_setting: &str,
        project_key: &str,
        repository_slug: &str,
    ) -> AlmIntegrationResult<ImportProjectResponse>;
}
