use chrono::{DateTime, Utc};

use crate::errors::{CliError, Result};
use crate::settings::{Environment, Settings};

/// Everything a command needs to know about who it acts as.
///
/// Built once in `main` from the loaded settings and passed down by
/// reference; commands that change settings (login, env management) go
/// through `settings_mut` and call `save`.
#[derive(Debug, Clone)]
pub struct Session {
    settings: Settings,
}

/// Resolved target for one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_url: String,
    pub bearer: String,
}

/// Workspace / environment pair addressed by push and pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub workspace_id: String,
    pub environment_id: String,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_at(Utc::now())
    }

    /// OAuth tokens take precedence over API keys. OAuth environments talk to
    /// the platform API unless they carry their own URL.
    pub fn credentials_at(&self, now: DateTime<Utc>) -> Result<Credentials> {
        let env = self.settings.current()?;

        if let Some(token) = &env.access_token {
            if env.is_expired(now) {
                return Err(CliError::TokenExpired(env.name.clone()));
            }
            return Ok(Credentials {
                api_url: self.base_url(env, &self.settings.platform_url),
                bearer: token.clone(),
            });
        }

        match &env.api_key {
            Some(key) => Ok(Credentials {
                api_url: self.base_url(env, &self.settings.api_url),
                bearer: key.clone(),
            }),
            None => Err(CliError::NotAuthenticated(env.name.clone())),
        }
    }

    fn base_url(&self, env: &Environment, fallback: &str) -> String {
        env.api_url
            .as_deref()
            .unwrap_or(fallback)
            .trim_end_matches('/')
            .to_string()
    }

    /// Explicit flags win; otherwise the IDs stored on the current environment are used.
    pub fn target(&self, workspace_id: Option<&str>, environment_id: Option<&str>) -> Result<Target> {
        let current = self.settings.current().ok();

        let workspace_id = workspace_id
            .map(str::to_string)
            .or_else(|| current.and_then(|e| e.workspace_id.clone()))
            .ok_or(CliError::MissingWorkspace)?;
        let environment_id = environment_id
            .map(str::to_string)
            .or_else(|| current.and_then(|e| e.environment_id.clone()))
            .ok_or(CliError::MissingEnvironmentId)?;

        Ok(Target {
            workspace_id,
            environment_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(env: Environment) -> Session {
        let mut settings = Settings::default();
        settings.upsert_environment(env);
        Session::new(settings)
    }

    #[test]
    fn test_no_environment() {
        let session = Session::new(Settings::default());
        assert!(matches!(session.credentials(), Err(CliError::NoEnvironment)));
    }

    #[test]
    fn test_api_key_uses_runtime_url() {
        let session = session_with(Environment {
            name: "ci".into(),
            api_key: Some("sk".into()),
            ..Default::default()
        });
        let creds = session.credentials().unwrap();
        assert_eq!(creds.api_url, "https://api.blimu.dev");
        assert_eq!(creds.bearer, "sk");
    }

    #[test]
    fn test_oauth_token_preferred_and_trimmed_url() {
        let session = session_with(Environment {
            name: "dev".into(),
            api_url: Some("http://localhost:3010/".into()),
            api_key: Some("sk".into()),
            access_token: Some("at".into()),
            ..Default::default()
        });
        let creds = session.credentials().unwrap();
        assert_eq!(creds.api_url, "http://localhost:3010");
        assert_eq!(creds.bearer, "at");
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let session = session_with(Environment {
            name: "dev".into(),
            access_token: Some("at".into()),
            expires_at: Some(now - chrono::Duration::minutes(1)),
            ..Default::default()
        });
        assert!(matches!(
            session.credentials_at(now),
            Err(CliError::TokenExpired(name)) if name == "dev"
        ));
    }

    #[test]
    fn test_not_authenticated() {
        let session = session_with(Environment {
            name: "bare".into(),
            ..Default::default()
        });
        assert!(matches!(
            session.credentials(),
            Err(CliError::NotAuthenticated(_))
        ));
    }

    #[test]
    fn test_target_prefers_flags() {
        let session = session_with(Environment {
            name: "dev".into(),
            workspace_id: Some("ws_stored".into()),
            environment_id: Some("env_stored".into()),
            ..Default::default()
        });

        let stored = session.target(None, None).unwrap();
        assert_eq!(stored.workspace_id, "ws_stored");
        assert_eq!(stored.environment_id, "env_stored");

        let flagged = session.target(Some("ws_flag"), None).unwrap();
        assert_eq!(flagged.workspace_id, "ws_flag");
        assert_eq!(flagged.environment_id, "env_stored");
    }

    #[test]
    fn test_target_missing_ids() {
        let session = Session::new(Settings::default());
        assert!(matches!(
            session.target(None, Some("env")),
            Err(CliError::MissingWorkspace)
        ));
        assert!(matches!(
            session.target(Some("ws"), None),
            Err(CliError::MissingEnvironmentId)
        ));
        assert!(session.target(Some("ws"), Some("env")).is_ok());
    }
}
