use std::time::Duration;

use chrono::Utc;
use clap::{Args, Subcommand};

use crate::api::{AccessIds, ApiClient};
use crate::errors::{CliError, Result};
use crate::oauth::callback::PREFERRED_PORT;
use crate::oauth::{authorization_code, random_token, CallbackServer, OAuthClient, PkceChallenge};
use crate::session::{Credentials, Session};
use crate::settings::Environment;

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in through the browser and store the tokens
    Login(LoginArgs),
    /// Forget stored tokens
    Logout(LogoutArgs),
    /// Renew the current environment's access token with its refresh token
    Refresh,
    /// Show the current environment's credentials
    Status,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Environment name to store the login under
    #[arg(long, default_value = "cloud")]
    pub name: String,

    /// Platform API URL hosting the OAuth endpoints
    #[arg(long)]
    pub platform_url: Option<String>,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Environment to log out of (defaults to the current one)
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn run(session: &mut Session, cmd: &AuthCommand) -> Result<()> {
    match cmd {
        AuthCommand::Login(args) => login(session, args).await,
        AuthCommand::Logout(args) => logout(session, args),
        AuthCommand::Refresh => refresh(session).await,
        AuthCommand::Status => {
            status(session);
            Ok(())
        }
    }
}

async fn login(session: &mut Session, args: &LoginArgs) -> Result<()> {
    let settings = session.settings();
    let platform_url = args
        .platform_url
        .clone()
        .unwrap_or_else(|| settings.platform_url.clone());
    let timeout = Duration::from_secs(settings.login_timeout_secs);

    let server = CallbackServer::start().await?;
    if server.port() != PREFERRED_PORT {
        println!(
            "Port {PREFERRED_PORT} is busy, listening on {} instead",
            server.redirect_uri()
        );
    }

    let pkce = PkceChallenge::generate();
    let state = random_token(32);
    let oauth = OAuthClient::new(&platform_url, &settings.oauth_client_id, server.redirect_uri())?;
    let url = oauth.authorization_url(&state, &pkce);

    println!("Complete the login in your browser:\n  {url}\n");
    if !args.no_browser {
        if let Err(e) = open_browser(url.as_str()) {
            tracing::warn!(error = %e, "Could not open a browser");
        }
    }

    println!("Waiting up to {}s for the login callback...", timeout.as_secs());
    let callback = server.wait(timeout).await?;
    let code = authorization_code(callback, &state)?;
    let tokens = oauth.exchange_code(&code, &pkce.verifier).await?;

    let mut env = Environment {
        name: args.name.clone(),
        api_url: Some(platform_url.clone()),
        access_token: Some(tokens.access_token.clone()),
        refresh_token: tokens.refresh_token.clone(),
        expires_at: tokens.expires_at(Utc::now()),
        token_type: Some(tokens.token_type.clone()),
        ..Default::default()
    };

    // Missing IDs are not fatal; push and pull accept them as flags.
    match fetch_access_ids(&platform_url, &tokens.access_token).await {
        Ok(ids) => {
            env.workspace_id = ids.workspace_id;
            env.environment_id = ids.environment_id;
        }
        Err(e) => tracing::warn!(error = %e, "Could not look up workspace and environment"),
    }

    let settings = session.settings_mut();
    settings.upsert_environment(env.clone());
    settings.switch(&env.name)?;
    settings.save()?;

    println!("Logged in as environment '{}'", env.name);
    println!("  Platform API: {platform_url}");
    if let Some(ws) = &env.workspace_id {
        println!("  Workspace:    {ws}");
    }
    if let Some(id) = &env.environment_id {
        println!("  Environment:  {id}");
    }
    if let Some(at) = env.expires_at {
        println!("  Expires:      {}", at.to_rfc3339());
    }
    Ok(())
}

async fn fetch_access_ids(platform_url: &str, token: &str) -> Result<AccessIds> {
    let client = ApiClient::new(Credentials {
        api_url: platform_url.to_string(),
        bearer: token.to_string(),
    })?;
    let resources = client.access().await?;
    tracing::debug!(count = resources.len(), "Fetched active resources");
    Ok(AccessIds::from_resources(&resources))
}

async fn refresh(session: &mut Session) -> Result<()> {
    let settings = session.settings();
    let env = settings.current()?;
    let refresh_token = env
        .refresh_token
        .clone()
        .ok_or_else(|| CliError::NotAuthenticated(env.name.clone()))?;
    let platform_url = env
        .api_url
        .clone()
        .unwrap_or_else(|| settings.platform_url.clone());

    // The redirect URI is unused by the refresh grant
    let oauth = OAuthClient::new(&platform_url, &settings.oauth_client_id, String::new())?;
    let tokens = oauth.refresh(&refresh_token).await?;

    let name = env.name.clone();
    let settings = session.settings_mut();
    if let Some(env) = settings.environments.get_mut(&name) {
        env.access_token = Some(tokens.access_token.clone());
        env.expires_at = tokens.expires_at(Utc::now());
        env.token_type = Some(tokens.token_type.clone());
        if tokens.refresh_token.is_some() {
            env.refresh_token = tokens.refresh_token.clone();
        }
    }
    settings.save()?;

    println!("Refreshed access token for '{name}'");
    Ok(())
}

fn logout(session: &mut Session, args: &LogoutArgs) -> Result<()> {
    let settings = session.settings_mut();
    let name = match &args.name {
        Some(name) => name.clone(),
        None => settings.current()?.name.clone(),
    };

    let keep = {
        let env = settings
            .environments
            .get_mut(&name)
            .ok_or_else(|| CliError::EnvironmentNotFound(name.clone()))?;
        env.access_token = None;
        env.refresh_token = None;
        env.expires_at = None;
        env.token_type = None;
        env.api_key.is_some()
    };
    if !keep {
        settings.remove_environment(&name)?;
    }
    settings.save()?;

    println!("Logged out of '{name}'");
    Ok(())
}

pub fn status(session: &Session) {
    let settings = session.settings();
    let env = match settings.current() {
        Ok(env) => env,
        Err(_) => {
            println!("Not logged in. Run `blimu auth login`.");
            return;
        }
    };

    println!("Environment: {}", env.name);
    println!("  API URL:   {}", settings.api_url_for(env));
    let method = if env.is_oauth() {
        "OAuth"
    } else if env.api_key.is_some() {
        "API key"
    } else {
        "none"
    };
    println!("  Auth:      {method}");
    if let Some(ws) = &env.workspace_id {
        println!("  Workspace: {ws}");
    }
    if let Some(id) = &env.environment_id {
        println!("  Env ID:    {id}");
    }
    if let Some(at) = env.expires_at {
        let note = if env.is_expired(Utc::now()) { " (expired)" } else { "" };
        println!("  Expires:   {}{note}", at.to_rfc3339());
    }
}

fn open_browser(url: &str) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/c", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else {
        std::process::Command::new("xdg-open")
    };
    cmd.arg(url).spawn().map(|_| ())
}
