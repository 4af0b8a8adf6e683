use clap::{Args, Subcommand};

use crate::errors::Result;
use crate::session::Session;
use crate::settings::Environment;

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// List configured environments
    List,
    /// Show the current environment
    Current,
    /// Make another environment current
    Switch { name: String },
    /// Register an API-key environment
    Create(CreateArgs),
    /// Remove an environment
    Delete { name: String },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub name: String,

    #[arg(long, env = "BLIMU_SECRET_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Defaults to the global api_url setting
    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub workspace_id: Option<String>,

    #[arg(long)]
    pub environment_id: Option<String>,
}

pub fn run(session: &mut Session, cmd: &EnvCommand) -> Result<()> {
    match cmd {
        EnvCommand::List => {
            list(session);
            Ok(())
        }
        EnvCommand::Current => {
            let env = session.settings().current()?;
            println!("{}", env.name);
            Ok(())
        }
        EnvCommand::Switch { name } => {
            let settings = session.settings_mut();
            settings.switch(name)?;
            settings.save()?;
            println!("Switched to '{name}'");
            Ok(())
        }
        EnvCommand::Create(args) => create(session, args),
        EnvCommand::Delete { name } => {
            let settings = session.settings_mut();
            settings.remove_environment(name)?;
            settings.save()?;
            println!("Deleted '{name}'");
            match &settings.current_environment {
                Some(current) => println!("Current environment is now '{current}'"),
                None => println!("No environments left"),
            }
            Ok(())
        }
    }
}

fn list(session: &Session) {
    let settings = session.settings();
    if settings.environments.is_empty() {
        println!("No environments configured. Run `blimu auth login` or `blimu env create`.");
        return;
    }

    for (name, env) in &settings.environments {
        let marker = if settings.current_environment.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        let auth = if env.is_oauth() { "oauth" } else { "api-key" };
        let origin = if env.ephemeral { " (from BLIMU_SECRET_KEY)" } else { "" };
        println!(
            "{marker} {name:<16} {auth:<8} {}{origin}",
            settings.api_url_for(env)
        );
    }
}

fn create(session: &mut Session, args: &CreateArgs) -> Result<()> {
    let settings = session.settings_mut();
    let existed = settings.environments.contains_key(&args.name);

    settings.upsert_environment(Environment {
        name: args.name.clone(),
        api_url: args.api_url.clone(),
        workspace_id: args.workspace_id.clone(),
        environment_id: args.environment_id.clone(),
        api_key: Some(args.api_key.clone()),
        ..Default::default()
    });
    settings.save()?;

    let verb = if existed { "Updated" } else { "Created" };
    println!("{verb} environment '{}'", args.name);
    if settings.current_environment.as_deref() == Some(args.name.as_str()) {
        println!("  Set as current environment");
    }
    Ok(())
}
