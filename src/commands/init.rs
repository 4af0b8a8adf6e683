use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use crate::definitions::loader::save_definitions;
use crate::definitions::types::*;
use crate::definitions::{Definitions, DEFINITIONS_DIR};
use crate::errors::{CliError, Result};
use crate::session::Session;
use crate::settings::Environment;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create .blimu/ in
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing .blimu/ directory
    #[arg(short, long)]
    pub force: bool,

    /// Also register an API-key environment under this name
    #[arg(long)]
    pub env_name: Option<String>,

    #[arg(long, env = "BLIMU_SECRET_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub workspace_id: Option<String>,

    #[arg(long)]
    pub environment_id: Option<String>,
}

pub fn run(session: &mut Session, args: &InitArgs) -> Result<()> {
    let dir = args.dir.join(DEFINITIONS_DIR);
    if dir.exists() && !args.force {
        return Err(CliError::AlreadyInitialized(dir.display().to_string()));
    }

    save_definitions(&args.dir, &template())?;

    println!("Initialized {}", dir.display());
    println!("  resources.yml     resources, roles and hierarchy");
    println!("  entitlements.yml  permission checks");
    println!("  features.yml      plan-scoped features");
    println!("  plans.yml         billing plans");
    println!("  config.yml        SDK clients to generate");

    if let Some(name) = &args.env_name {
        // The scaffold is already on disk; a bad environment only warns.
        if let Err(e) = register_environment(session, name, args) {
            tracing::warn!(error = %e, env = %name, "Environment setup failed");
            println!("\nEnvironment setup failed: {e}");
            println!("Run `blimu env create {name} --api-key <key>` later");
        }
    }

    println!("\nNext: edit .blimu/*.yml, then run `blimu validate`, `blimu push` and `blimu generate`");
    Ok(())
}

fn register_environment(session: &mut Session, name: &str, args: &InitArgs) -> Result<()> {
    let api_key = args
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| CliError::NotAuthenticated(name.to_string()))?;

    let settings = session.settings_mut();
    settings.upsert_environment(Environment {
        name: name.to_string(),
        api_url: args.api_url.clone(),
        workspace_id: args.workspace_id.clone(),
        environment_id: args.environment_id.clone(),
        api_key: Some(api_key),
        ..Default::default()
    });
    settings.save()?;

    println!("\nCreated environment '{name}'");
    if settings.current_environment.as_deref() == Some(name) {
        println!("  Set as current environment");
    }
    Ok(())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Starter project: two resources with inheritance, two plans, entitlements,
/// one feature and a TypeScript plus a Go client.
pub fn template() -> Definitions {
    let roles = strings(&["admin", "editor", "viewer"]);

    let mut resources = BTreeMap::new();
    resources.insert(
        "organization".to_string(),
        ResourceDef {
            roles: roles.clone(),
            ..Default::default()
        },
    );
    resources.insert(
        "projects".to_string(),
        ResourceDef {
            roles,
            roles_inheritance: BTreeMap::from([
                ("editor".to_string(), strings(&["organization->admin"])),
                ("viewer".to_string(), strings(&["organization->editor"])),
            ]),
            parents: BTreeMap::from([("organization".to_string(), ParentRef { required: true })]),
        },
    );

    let plans = BTreeMap::from([
        (
            "starter".to_string(),
            PlanDef {
                name: "Starter Plan".into(),
                description: "Perfect for getting started".into(),
            },
        ),
        (
            "pro".to_string(),
            PlanDef {
                name: "Pro Plan".into(),
                description: "For growing teams".into(),
            },
        ),
    ]);

    let entitlements = BTreeMap::from([
        (
            "organization:create_project".to_string(),
            EntitlementDef {
                roles: strings(&["admin"]),
                plans: strings(&["pro"]),
            },
        ),
        (
            "projects:delete".to_string(),
            EntitlementDef {
                roles: strings(&["admin"]),
                plans: Vec::new(),
            },
        ),
    ]);

    let features = BTreeMap::from([(
        "project_management".to_string(),
        FeatureDef {
            plans: strings(&["pro"]),
            default_enabled: false,
            entitlements: strings(&["organization:create_project", "projects:delete"]),
        },
    )]);

    let sdk = SdkOptions {
        name: Some("My Project SDKs".into()),
        base_url: Some("https://api.blimu.dev".into()),
        clients: vec![
            SdkClient {
                client_type: "typescript".into(),
                out_dir: "./sdk-ts".into(),
                package_name: "my-project-sdk".into(),
                name: "MyProjectClient".into(),
                post_gen_command: Some("npx prettier --write .".into()),
                ..Default::default()
            },
            SdkClient {
                client_type: "go".into(),
                out_dir: "./sdk-go".into(),
                package_name: "github.com/myorg/my-project-sdk-go".into(),
                module_name: "github.com/myorg/my-project-sdk-go".into(),
                name: "MyProjectClient".into(),
                post_gen_command: Some("goimports -w .".into()),
                ..Default::default()
            },
        ],
    };

    Definitions {
        resources,
        entitlements,
        features,
        plans,
        sdk: Some(sdk),
    }
}
