//! HTTP client for the ALM integration web API
//!
//! Talks to `api/alm_settings` and `api/alm_integrations` on a Qualis server.
//! Requests authenticate with a user token passed as the basic-auth login.

use async_trait::async_trait;
use qualis_core::{ServerConnectionConfig, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::alm_integration::{AlmIntegrationApi, AlmIntegrationError, AlmIntegrationResult};
use super::types::{
    AlmSettingsResponse, ApiErrorBody, ImportProjectResponse, ProjectsResponse,
    RepositoriesResponse,
};

pub struct AlmIntegrationClient {
    client: Client,
    config: ServerConnectionConfig,
}

impl AlmIntegrationClient {
    pub fn new(config: ServerConnectionConfig) -> AlmIntegrationResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn request(&self, method: Method, path: &str) -> AlmIntegrationResult<RequestBuilder> {
        let url = self.config.endpoint(path)?;
        let builder = self.client.request(method, url);

        Ok(match &self.config.token {
            Some(token) => builder.basic_auth(token, Option::<&str>::None),
            None => builder,
        })
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> AlmIntegrationResult<T> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            AlmIntegrationError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }

    async fn ensure_success(response: Response) -> AlmIntegrationResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::error_from_response(response).await)
    }

    async fn error_from_response(response: Response) -> AlmIntegrationError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .map(|parsed| {
                parsed
                    .errors
                    .into_iter()
                    .map(|e| e.msg)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    body
                }
            });

        match status {
            StatusCode::UNAUTHORIZED => AlmIntegrationError::AuthenticationFailed(message),
            StatusCode::FORBIDDEN => AlmIntegrationError::PermissionDenied(message),
            StatusCode::NOT_FOUND => AlmIntegrationError::NotFound(message),
            status => AlmIntegrationError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl AlmIntegrationApi for AlmIntegrationClient {
    async fn list_alm_settings(&self) -> AlmIntegrationResult<AlmSettingsResponse> {
        let response = self
            .request(Method::GET, "api/alm_settings/list")?
            .send()
            .await?;

        Self::parse_json(response).await
    }

    async fn check_personal_access_token(&self, alm_setting: &str) -> AlmIntegrationResult<bool> {
        let response = self
            .request(Method::GET, "api/alm_integrations/check_pat")?
            .query(&[("almSetting", alm_setting)])
            .send()
            .await?;

        // 400 is how the server reports a missing or rejected token
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_REQUEST => {
                debug!("Personal access token for {} is not valid", alm_setting);
                Ok(false)
            }
            _ => Err(Self::error_from_response(response).await),
        }
    }

    async fn set_personal_access_token(
        &self,
        alm_setting: &str,
        token: &str,
    ) -> AlmIntegrationResult<()> {
        let response = self
            .request(Method::POST, "api/alm_integrations/set_pat")?
            .form(&[("almSetting", alm_setting), ("pat", token)])
            .send()
            .await?;

        Self::ensure_success(response).await?;
        info!("Stored personal access token for {}", alm_setting);
        Ok(())
    }

    async fn list_bitbucket_server_projects(
        &self,
        alm_setting: &str,
    ) -> AlmIntegrationResult<ProjectsResponse> {
        let response = self
            .request(Method::GET, "api/alm_integrations/list_bitbucketserver_projects")?
            .query(&[("almSetting", alm_setting)])
            .send()
            .await?;

        Self::parse_json(response).await
    }

    async fn search_bitbucket_server_repositories(
        &self,
        alm_setting: &str,
        project_name: &str,
    ) -> AlmIntegrationResult<RepositoriesResponse> {
        let response = self
            .request(Method::GET, "api/alm_integrations/search_bitbucketserver_repos")?
            .query(&[("almSetting", alm_setting), ("projectName", project_name)])
            .send()
            .await?;

        Self::parse_json(response).await
    }

    async fn import_bitbucket_server_project(
        &self,
        alm_setting: &str,
        project_key: &str,
        repository_slug: &str,
    ) -> AlmIntegrationResult<ImportProjectResponse> {
        let response = self
            .request(Method::POST, "api/alm_integrations/import_bitbucketserver_project")?
            .form(&[
                ("almSetting", alm_setting),
                ("projectKey", project_key),
                ("repositorySlug", repository_slug),
            ])
            .send()
            .await?;

        let imported: ImportProjectResponse = Self::parse_json(response).await?;
        info!(
            "Imported {}/{} as project {}",
            project_key, repository_slug, imported.project.key
        );
        Ok(imported)
    }
}
