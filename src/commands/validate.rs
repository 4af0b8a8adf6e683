use std::path::PathBuf;

use clap::Args;

use crate::api::ApiClient;
use crate::commands::{load_project, render_errors, render_summary};
use crate::definitions::payload::DefinitionsPayload;
use crate::definitions::validator::validate;
use crate::errors::{CliError, Result};
use crate::session::Session;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Project directory (searched upwards for .blimu/)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Also validate against the server, even if local validation fails
    #[arg(long)]
    pub remote: bool,
}

/// Local validation always runs. Exit status follows the remote verdict
/// when `--remote` is given, otherwise the local one.
pub async fn run(session: &Session, args: &ValidateArgs) -> Result<()> {
    let (root, defs) = load_project(&args.dir)?;
    println!("Validating definitions in {}", root.display());

    let local = validate(&defs);
    if local.valid {
        println!("Local validation passed");
        print!("{}", render_summary(&defs.summary()));
    } else {
        println!(
            "Local validation failed with {} error(s):\n",
            local.errors.len()
        );
        print!("{}", render_errors(&local.errors));
    }

    if !args.remote {
        if local.valid {
            return Ok(());
        }
        return Err(CliError::ValidationFailed {
            count: local.errors.len(),
        });
    }

    let client = ApiClient::new(session.credentials()?)?;
    println!("\nValidating against {}", client.base_url());

    let remote = client
        .validate_definitions(&DefinitionsPayload::from(&defs))
        .await?;

    if remote.valid {
        println!("Remote validation passed");
        if !local.valid {
            tracing::warn!(
                local_errors = local.errors.len(),
                "Server accepted definitions that failed local validation"
            );
        }
        Ok(())
    } else {
        println!(
            "Remote validation failed with {} error(s):\n",
            remote.errors.len()
        );
        print!("{}", render_errors(&remote.errors));
        Err(CliError::RemoteValidationFailed {
            count: remote.errors.len(),
        })
    }
}
