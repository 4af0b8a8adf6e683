use std::path::PathBuf;

use clap::Args;

use crate::api::ApiClient;
use crate::definitions::loader::save_definitions;
use crate::definitions::{Definitions, DEFINITIONS_DIR};
use crate::errors::Result;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Directory to write .blimu/ into
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    #[arg(long)]
    pub workspace_id: Option<String>,

    #[arg(long)]
    pub environment_id: Option<String>,
}

/// Replaces local definition files with the remote copy. Sections that are
/// empty remotely lose their local file. The SDK config is local-only and
/// left untouched.
pub async fn run(session: &Session, args: &PullArgs) -> Result<()> {
    let target = session.target(args.workspace_id.as_deref(), args.environment_id.as_deref())?;
    let client = ApiClient::new(session.credentials()?)?;

    let document = client.get_definitions(&target).await?;
    let defs = Definitions::from(document);
    save_definitions(&args.dir, &defs)?;

    let s = defs.summary();
    println!("Definitions pulled");
    println!("  Workspace:   {}", target.workspace_id);
    println!("  Environment: {}", target.environment_id);
    println!(
        "  Directory:   {}",
        args.dir.join(DEFINITIONS_DIR).display()
    );
    println!(
        "  {} resource(s), {} entitlement(s), {} feature(s), {} plan(s)",
        s.resources, s.entitlements, s.features, s.plans
    );
    Ok(())
}
