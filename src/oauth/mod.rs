//! Browser-based OAuth 2.0 authorization code flow with PKCE.

pub mod callback;
pub mod pkce;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::errors::{CliError, Result};

pub use callback::{CallbackResult, CallbackServer};
pub use pkce::{random_token, PkceChallenge};

pub const SCOPES: [&str; 3] = ["openid", "profile", "email"];

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds; zero when the server does not say
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.expires_in > 0).then(|| now + chrono::Duration::seconds(self.expires_in))
    }
}

/// Endpoints under the platform URL: `/oauth/authorize` and `/oauth/token`.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    auth_url: Url,
    token_url: Url,
    redirect_uri: String,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(platform_url: &str, client_id: &str, redirect_uri: String) -> Result<Self> {
        let base = platform_url.trim_end_matches('/');
        let parse = |path: &str| {
            Url::parse(&format!("{base}{path}"))
                .map_err(|e| CliError::OAuth(format!("invalid platform URL '{platform_url}': {e}")))
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| CliError::Api {
                operation: "client setup",
                source,
            })?;

        Ok(Self {
            client_id: client_id.to_string(),
            auth_url: parse("/oauth/authorize")?,
            token_url: parse("/oauth/token")?,
            redirect_uri,
            http,
        })
    }

    pub fn authorization_url(&self, state: &str, pkce: &PkceChallenge) -> Url {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", PkceChallenge::METHOD);
        url
    }

    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse> {
        self.token_request(
            "exchange authorization code",
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &self.client_id),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
                ("code_verifier", verifier),
            ],
        )
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(
            "refresh token",
            &[
                ("grant_type", "refresh_token"),
                ("client_id", &self.client_id),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }

    async fn token_request(&self, operation: &'static str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|source| CliError::Api { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::ApiStatus {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| CliError::Api { operation, source })
    }
}

/// Check the callback against the state we sent and extract the code.
pub fn authorization_code(result: CallbackResult, expected_state: &str) -> Result<String> {
    if let Some(error) = result.error {
        let detail = result
            .error_description
            .map(|d| format!("{error}: {d}"))
            .unwrap_or(error);
        return Err(CliError::OAuth(format!("authorization failed: {detail}")));
    }
    if result.state.as_deref() != Some(expected_state) {
        return Err(CliError::OAuth("state parameter mismatch".into()));
    }
    result
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| CliError::OAuth("callback did not include an authorization code".into()))
}
