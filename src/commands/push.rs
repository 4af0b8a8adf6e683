use std::path::PathBuf;

use clap::Args;

use crate::api::ApiClient;
use crate::commands::{ensure_valid, load_project};
use crate::definitions::payload::DefinitionsPayload;
use crate::errors::Result;
use crate::session::Session;

/// Shared by `push` and `definitions update`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Project directory (searched upwards for .blimu/)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Workspace ID (defaults to the current environment's workspace)
    #[arg(long)]
    pub workspace_id: Option<String>,

    /// Environment ID (defaults to the current environment's ID)
    #[arg(long)]
    pub environment_id: Option<String>,

    /// Submit even if local validation reports errors
    #[arg(long)]
    pub skip_validation: bool,
}

pub async fn run(session: &Session, args: &PushArgs) -> Result<()> {
    let (root, defs) = load_project(&args.dir)?;

    ensure_valid(&defs, args.skip_validation)?;
    defs.ensure_pushable()?;

    let target = session.target(args.workspace_id.as_deref(), args.environment_id.as_deref())?;
    let client = ApiClient::new(session.credentials()?)?;

    let payload = DefinitionsPayload::from(&defs);
    client.update_definitions(&target, &payload).await?;

    tracing::info!(
        workspace = %target.workspace_id,
        environment = %target.environment_id,
        resources = payload.resources.len(),
        "Pushed definitions"
    );
    println!("Definitions pushed");
    println!("  Workspace:   {}", target.workspace_id);
    println!("  Environment: {}", target.environment_id);
    println!("  Source:      {}", root.display());
    Ok(())
}
