use serde::{Deserialize, Serialize};

use super::alm_integration::AlmIntegrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlmKind {
    Azure,
    Bitbucket,
    GitHub,
    GitLab,
    /// Any kind this client does not integrate with, e.g. `bitbucketcloud`
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AlmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlmKind::Azure => write!(f, "azure"),
            AlmKind::Bitbucket => write!(f, "bitbucket"),
            AlmKind::GitHub => write!(f, "github"),
            AlmKind::GitLab => write!(f, "gitlab"),
            AlmKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl TryFrom<&str> for AlmKind {
    type Error = AlmIntegrationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "azure" => Ok(AlmKind::Azure),
            "bitbucket" => Ok(AlmKind::Bitbucket),
            "github" => Ok(AlmKind::GitHub),
            "gitlab" => Ok(AlmKind::GitLab),
            _ => Err(AlmIntegrationError::InvalidResponse(format!(
                "Unknown ALM kind: {}",
                value
            ))),
        }
    }
}

/// A configured ALM instance, referenced by its key in every integration call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlmSettingsInstance {
    pub key: String,
    pub alm: AlmKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl AlmSettingsInstance {
    pub fn bitbucket(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            alm: AlmKind::Bitbucket,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitbucketProject {
    #[serde(default)]
    pub id: Option<i64>,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketRepository {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub project_key: String,
    pub slug: String,
    /// Key of the project already imported from this repository, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sq_project_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedProject {
    pub key: String,
    #[serde(default)]
    pub name: String,
}

// Response payloads of the web API

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlmSettingsResponse {
    #[serde(default)]
    pub alm_settings: Vec<AlmSettingsInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsResponse {
    #[serde(default)]
    pub projects: Vec<BitbucketProject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesResponse {
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
    #[serde(default)]
    pub repositories: Vec<BitbucketRepository>,
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportProjectResponse {
    pub project: CreatedProject,
}

/// Error body returned by the web API on 4xx/5xx
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorMessage {
    pub msg: String,
}
