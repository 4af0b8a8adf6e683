use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

use blimu::commands::{
    self, auth::AuthCommand, check::CheckArgs, env::EnvCommand, generate::GenerateArgs,
    init::InitArgs, pull::PullArgs, push::PushArgs, validate::ValidateArgs,
};
use blimu::session::Session;
use blimu::settings::{self, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "blimu",
    version,
    about = "Validate, sync and generate SDKs for Blimu authorization definitions"
)]
struct Cli {
    /// Path to the settings file (defaults to ~/.blimu/config.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scaffold a starter .blimu/ directory
    Init(InitArgs),
    /// Validate the definitions in .blimu/
    Validate(ValidateArgs),
    /// Upload local definitions to an environment
    Push(PushArgs),
    /// Download an environment's definitions into .blimu/
    Pull(PullArgs),
    /// Generate the SDK clients listed in .blimu/config.yml
    Generate(GenerateArgs),
    /// Check whether a user holds an entitlement on a resource
    Check(CheckArgs),
    /// Definitions management
    #[command(subcommand)]
    Definitions(DefinitionsCommand),
    /// Authentication
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Environment management
    #[command(subcommand)]
    Env(EnvCommand),
}

#[derive(Subcommand, Debug)]
enum DefinitionsCommand {
    /// Same as `push`
    Update(PushArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // load settings
    let path = cli.settings.clone().unwrap_or_else(settings::default_path);
    let mut session = Session::new(Settings::load(&path)?);

    match &cli.command {
        Command::Init(args) => commands::init::run(&mut session, args)?,
        Command::Validate(args) => commands::validate::run(&session, args).await?,
        Command::Push(args) | Command::Definitions(DefinitionsCommand::Update(args)) => {
            commands::push::run(&session, args).await?
        }
        Command::Pull(args) => commands::pull::run(&session, args).await?,
        Command::Generate(args) => commands::generate::run(&session, args).await?,
        Command::Check(args) => commands::check::run(&session, args).await?,
        Command::Auth(cmd) => commands::auth::run(&mut session, cmd).await?,
        Command::Env(cmd) => commands::env::run(&mut session, cmd)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_definitions_update_aliases_push() {
        let cli = Cli::try_parse_from([
            "blimu",
            "definitions",
            "update",
            "proj",
            "--workspace-id",
            "ws",
            "--skip-validation",
        ])
        .unwrap();
        match cli.command {
            Command::Definitions(DefinitionsCommand::Update(args)) => {
                assert_eq!(args.dir, PathBuf::from("proj"));
                assert_eq!(args.workspace_id.as_deref(), Some("ws"));
                assert!(args.skip_validation);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate_defaults() {
        let cli = Cli::try_parse_from(["blimu", "validate"]).unwrap();
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert!(!args.remote);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_check_takes_four_positionals() {
        let cli = Cli::try_parse_from([
            "blimu",
            "check",
            "user_1",
            "organization:invite",
            "organization",
            "org_1",
        ])
        .unwrap();
        match cli.command {
            Command::Check(args) => {
                assert_eq!(args.user_id, "user_1");
                assert_eq!(args.entitlement, "organization:invite");
                assert_eq!(args.resource_type, "organization");
                assert_eq!(args.resource_id, "org_1");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["blimu", "check", "user_1"]).is_err());
    }

    #[test]
    fn test_init_flags() {
        let cli = Cli::try_parse_from(["blimu", "init", "-f", "--env-name", "dev"]).unwrap();
        match cli.command {
            Command::Init(args) => {
                assert!(args.force);
                assert_eq!(args.dir, PathBuf::from("."));
                assert_eq!(args.env_name.as_deref(), Some("dev"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "blimu",
            "env",
            "list",
            "--settings",
            "/tmp/x.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/x.toml")));
        assert_eq!(cli.log_level, "debug");
    }
}
