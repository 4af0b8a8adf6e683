use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{CliError, Result};

/// Name of the environment seeded from `BLIMU_SECRET_KEY`.
pub const ENV_SEEDED_NAME: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Runtime API used for validation and SDK generation
    pub api_url: String,
    /// Platform API hosting the OAuth endpoints and definitions storage
    pub platform_url: String,
    pub oauth_client_id: String,
    /// How long `auth login` waits for the browser callback
    pub login_timeout_secs: u64,
    /// External SDK generator executable
    pub generator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_environment: Option<String>,
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,

    /// File these settings were loaded from and are saved back to
    #[serde(skip)]
    pub path: PathBuf,
}

/// One named set of credentials and target IDs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Built from environment variables; never written to disk
    #[serde(skip)]
    pub ephemeral: bool,
}

impl Environment {
    pub fn is_oauth(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "https://api.blimu.dev".to_string(),
            platform_url: "https://platform-api.blimu.dev".to_string(),
            oauth_client_id: "blimu_cli".to_string(),
            login_timeout_secs: 300,
            generator: "sdk-gen".to_string(),
            current_environment: None,
            environments: BTreeMap::new(),
            path: default_path(),
        }
    }
}

/// `~/.blimu/config.toml`, or a project-relative fallback without a home directory.
pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".blimu"))
        .unwrap_or_else(|| PathBuf::from(".blimu"))
        .join("config.toml")
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = config::Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("platform_url", defaults.platform_url)?
            .set_default("oauth_client_id", defaults.oauth_client_id)?
            .set_default("login_timeout_secs", defaults.login_timeout_secs)?
            .set_default("generator", defaults.generator)?;

        // Optional file
        if path.exists() {
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Toml),
            );
        }

        // Environment overrides: BLIMU__API_URL=http://localhost:3000, etc.
        builder = builder.add_source(config::Environment::with_prefix("BLIMU").separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;
        s.path = path.to_path_buf();

        s.seed_from_secret_key(
            std::env::var("BLIMU_SECRET_KEY").ok(),
            std::env::var("BLIMU_API_URL").ok(),
        );
        s.ensure_current();

        tracing::debug!(
            path = %s.path.display(),
            environments = s.environments.len(),
            current = ?s.current_environment,
            "Loaded settings"
        );
        Ok(s)
    }

    /// An API key in the process environment becomes the `default` environment,
    /// kept in memory only.
    pub fn seed_from_secret_key(&mut self, secret: Option<String>, api_url: Option<String>) {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return;
        };

        let env = self
            .environments
            .entry(ENV_SEEDED_NAME.to_string())
            .or_default();
        env.name = ENV_SEEDED_NAME.to_string();
        env.api_key = Some(secret);
        env.ephemeral = true;
        if let Some(url) = api_url.filter(|u| !u.is_empty()) {
            env.api_url = Some(url);
        }

        if self.current_environment.is_none() {
            self.current_environment = Some(ENV_SEEDED_NAME.to_string());
        }
    }

    /// Falls back to the first environment when none is selected, or when the
    /// selected one no longer exists.
    fn ensure_current(&mut self) {
        let valid = self
            .current_environment
            .as_ref()
            .is_some_and(|name| self.environments.contains_key(name));
        if !valid {
            self.current_environment = self.environments.keys().next().cloned();
        }
    }

    pub fn save(&self) -> Result<()> {
        let mut persisted = self.clone();
        persisted.environments.retain(|_, env| !env.ephemeral);
        persisted.ensure_current();

        let contents = toml::to_string_pretty(&persisted)?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, contents)?;

        tracing::info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    pub fn current(&self) -> Result<&Environment> {
        let name = self
            .current_environment
            .as_ref()
            .ok_or(CliError::NoEnvironment)?;
        self.environments
            .get(name)
            .ok_or_else(|| CliError::EnvironmentNotFound(name.clone()))
    }

    /// API base URL for an environment, falling back to the global default.
    pub fn api_url_for<'a>(&'a self, env: &'a Environment) -> &'a str {
        env.api_url.as_deref().unwrap_or(&self.api_url)
    }

    /// Insert or replace an environment; the first one added becomes current.
    pub fn upsert_environment(&mut self, mut env: Environment) {
        env.ephemeral = false;
        let name = env.name.clone();
        self.environments.insert(name.clone(), env);
        if self.current_environment.is_none() {
            self.current_environment = Some(name);
        }
    }

    pub fn switch(&mut self, name: &str) -> Result<()> {
        if !self.environments.contains_key(name) {
            return Err(CliError::EnvironmentNotFound(name.to_string()));
        }
        self.current_environment = Some(name.to_string());
        Ok(())
    }

    pub fn remove_environment(&mut self, name: &str) -> Result<Environment> {
        let removed = self
            .environments
            .remove(name)
            .ok_or_else(|| CliError::EnvironmentNotFound(name.to_string()))?;
        if self.current_environment.as_deref() == Some(name) {
            self.current_environment = None;
            self.ensure_current();
        }
        Ok(removed)
    }
}
