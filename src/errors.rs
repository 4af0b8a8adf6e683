use miette::Diagnostic;
use thiserror::Error;

use crate::definitions::errors::DefinitionsError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(blimu::io))]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    #[diagnostic(
        code(blimu::settings),
        help("Check ~/.blimu/config.toml and any BLIMU__* environment variables")
    )]
    Settings(#[from] config::ConfigError),

    #[error("Failed to write settings: {0}")]
    #[diagnostic(code(blimu::settings::write))]
    SettingsWrite(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(blimu::serde))]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Definitions(#[from] DefinitionsError),

    #[error("Request to {operation} failed: {source}")]
    #[diagnostic(
        code(blimu::api::transport),
        help("Check your network connection and the configured API URL")
    )]
    Api {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned HTTP {status}: {body}")]
    #[diagnostic(code(blimu::api::status))]
    ApiStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("No current environment is configured")]
    #[diagnostic(
        code(blimu::session::no_environment),
        help("Run `blimu auth login`, or set BLIMU_SECRET_KEY")
    )]
    NoEnvironment,

    #[error("Environment '{0}' not found")]
    #[diagnostic(
        code(blimu::session::environment_not_found),
        help("Run `blimu env list` to see configured environments")
    )]
    EnvironmentNotFound(String),

    #[error("Environment '{0}' has no credentials")]
    #[diagnostic(
        code(blimu::session::not_authenticated),
        help("Run `blimu auth login` or configure an API key")
    )]
    NotAuthenticated(String),

    #[error("Access token for environment '{0}' has expired")]
    #[diagnostic(
        code(blimu::session::token_expired),
        help("Run `blimu auth login` again")
    )]
    TokenExpired(String),

    #[error("A workspace ID is required")]
    #[diagnostic(
        code(blimu::session::missing_workspace),
        help("Pass --workspace-id, or log in so the current environment records one")
    )]
    MissingWorkspace,

    #[error("An environment ID is required")]
    #[diagnostic(
        code(blimu::session::missing_environment_id),
        help("Pass --environment-id, or log in so the current environment records one")
    )]
    MissingEnvironmentId,

    #[error("Definitions failed validation with {count} error(s)")]
    #[diagnostic(
        code(blimu::validation::failed),
        help("Fix the errors listed above")
    )]
    ValidationFailed { count: usize },

    #[error("Server rejected the definitions with {count} error(s)")]
    #[diagnostic(code(blimu::validation::remote_failed))]
    RemoteValidationFailed { count: usize },

    #[error("OAuth error: {0}")]
    #[diagnostic(code(blimu::oauth))]
    OAuth(String),

    #[error("Timed out after {0}s waiting for the browser login to complete")]
    #[diagnostic(code(blimu::oauth::timeout), help("Run `blimu auth login` again"))]
    LoginTimeout(u64),

    #[error("No SDK clients are configured")]
    #[diagnostic(
        code(blimu::generate::no_clients),
        help("Add a `clients` list to .blimu/config.yml")
    )]
    NoSdkClients,

    #[error("Output directory `{0}` already exists")]
    #[diagnostic(
        code(blimu::generate::output_exists),
        help("Pass --force to overwrite it")
    )]
    OutputExists(String),

    #[error("`{0}` already exists")]
    #[diagnostic(
        code(blimu::init::exists),
        help("Pass --force to overwrite the definition files")
    )]
    AlreadyInitialized(String),

    #[error("SDK generation failed for {client}: {reason}")]
    #[diagnostic(code(blimu::generate::failed))]
    Generator { client: String, reason: String },

    #[error("{0}")]
    #[diagnostic(code(blimu::other))]
    Other(String),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;
