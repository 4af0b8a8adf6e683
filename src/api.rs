//! HTTP client for the Blimu API.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::definitions::payload::{
    DefinitionsDocument, DefinitionsPayload, GenerateSdkRequest, GeneratedSpec, RemoteValidation,
};
use crate::errors::{CliError, Result};
use crate::session::{Credentials, Target};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin typed wrapper over the endpoints the CLI uses. One instance per
/// command; every request carries the same bearer credential.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer: String,
}

/// One entry of `GET /v1/me/access`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveResource {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub inherited: bool,
    pub resource: ResourceRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

/// Workspace and environment IDs found in an access listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessIds {
    pub workspace_id: Option<String>,
    pub environment_id: Option<String>,
}

/// Body of an entitlement check for one user on one resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementCheck {
    pub user_id: String,
    pub entitlement: String,
    pub resource_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementDecision {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
    /// Roles that would grant the entitlement; usually only sent on denial
    #[serde(default)]
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub user_roles: Vec<String>,
}

impl AccessIds {
    /// First workspace and first environment win; an environment's
    /// `workspaceId` fills in a missing workspace.
    pub fn from_resources(resources: &[ActiveResource]) -> Self {
        let mut ids = AccessIds::default();
        for entry in resources {
            let r = &entry.resource;
            match r.kind.as_str() {
                "workspace" if ids.workspace_id.is_none() => {
                    ids.workspace_id = Some(r.id.clone());
                }
                "environment" if ids.environment_id.is_none() => {
                    ids.environment_id = Some(r.id.clone());
                    if ids.workspace_id.is_none() {
                        ids.workspace_id = r.workspace_id.clone();
                    }
                }
                _ => {}
            }
        }
        ids
    }
}

impl ApiClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("blimu-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CliError::Api {
                operation: "client setup",
                source,
            })?;

        Ok(Self {
            http,
            base_url: credentials.api_url.trim_end_matches('/').to_string(),
            bearer: credentials.bearer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.bearer)
    }

    async fn send(&self, operation: &'static str, req: RequestBuilder) -> Result<Response> {
        let response = req
            .send()
            .await
            .map_err(|source| CliError::Api { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status.as_u16(), "API request failed");
            return Err(CliError::ApiStatus {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(operation, status = status.as_u16(), "API request succeeded");
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, operation: &'static str, req: RequestBuilder) -> Result<T> {
        self.send(operation, req)
            .await?
            .json()
            .await
            .map_err(|source| CliError::Api { operation, source })
    }

    /// Server-side validation of a definitions payload.
    pub async fn validate_definitions(&self, payload: &DefinitionsPayload) -> Result<RemoteValidation> {
        let req = self.request(Method::POST, "/v1/config/validate").json(payload);
        self.json("validate definitions", req).await
    }

    /// Custom OpenAPI fragment for one SDK client.
    pub async fn generate_sdk(&self, request: &GenerateSdkRequest) -> Result<GeneratedSpec> {
        let req = self
            .request(Method::POST, "/v1/config/generate-sdk")
            .json(request);
        self.json("generate SDK spec", req).await
    }

    /// OpenAPI document of the fixed API surface.
    pub async fn fetch_base_spec(&self) -> Result<serde_json::Value> {
        let req = self.request(Method::GET, "/docs/json");
        self.json("fetch base OpenAPI spec", req).await
    }

    pub async fn get_definitions(&self, target: &Target) -> Result<DefinitionsDocument> {
        let req = self.request(Method::GET, &definitions_path(target));
        self.json("fetch definitions", req).await
    }

    pub async fn update_definitions(&self, target: &Target, payload: &DefinitionsPayload) -> Result<()> {
        let req = self.request(Method::PUT, &definitions_path(target)).json(payload);
        self.send("update definitions", req).await?;
        Ok(())
    }

    pub async fn check_entitlement(&self, check: &EntitlementCheck) -> Result<EntitlementDecision> {
        let req = self
            .request(Method::POST, "/v1/authorization/entitlements/check")
            .json(check);
        self.json("check entitlement", req).await
    }

    pub async fn access(&self) -> Result<Vec<ActiveResource>> {
        let req = self.request(Method::GET, "/v1/me/access");
        self.json("list active resources", req).await
    }
}

fn definitions_path(target: &Target) -> String {
    format!(
        "/v1/workspace/{}/environments/{}/definitions",
        target.workspace_id, target.environment_id
    )
}
