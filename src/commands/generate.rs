use std::path::PathBuf;

use clap::Args;

use crate::api::ApiClient;
use crate::commands::{ensure_valid, load_project, render_errors};
use crate::definitions::payload::GenerateSdkRequest;
use crate::errors::{CliError, Result};
use crate::openapi::merge_specs;
use crate::sdkgen;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Project directory (searched upwards for .blimu/)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing output directories
    #[arg(short, long)]
    pub force: bool,

    /// Generate even if local validation reports errors
    #[arg(long)]
    pub skip_validation: bool,
}

pub async fn run(session: &Session, args: &GenerateArgs) -> Result<()> {
    let (root, defs) = load_project(&args.dir)?;

    let clients = match &defs.sdk {
        Some(sdk) if !sdk.clients.is_empty() => sdk.clients.clone(),
        _ => return Err(CliError::NoSdkClients),
    };

    ensure_valid(&defs, args.skip_validation)?;
    defs.ensure_pushable()?;

    let out_dirs: Vec<PathBuf> = clients
        .iter()
        .map(|c| sdkgen::resolve_out_dir(&root, c))
        .collect();
    if !args.force {
        if let Some(existing) = out_dirs.iter().find(|d| d.exists()) {
            return Err(CliError::OutputExists(existing.display().to_string()));
        }
    }

    let client = ApiClient::new(session.credentials()?)?;
    println!("Fetching base API specification from {}", client.base_url());
    let base_spec = client.fetch_base_spec().await?;

    let generator = &session.settings().generator;
    let total = clients.len();
    for (i, (sdk_client, out_dir)) in clients.iter().zip(&out_dirs).enumerate() {
        println!(
            "\n[{}/{}] Generating {} SDK '{}' into {}",
            i + 1,
            total,
            sdk_client.client_type,
            sdk_client.name,
            out_dir.display()
        );

        let response = client
            .generate_sdk(&GenerateSdkRequest::new(&defs, sdk_client))
            .await?;
        if !response.success {
            println!(
                "SDK generation failed with {} error(s):\n",
                response.errors.len()
            );
            print!("{}", render_errors(&response.errors));
            return Err(CliError::Generator {
                client: sdk_client.name.clone(),
                reason: "server rejected the generation request".into(),
            });
        }

        let merged = merge_specs(&base_spec, &response.spec);
        sdkgen::run_generator(generator, &merged, sdk_client, out_dir).await?;

        if let Some(command) = sdk_client.post_gen_command.as_deref().filter(|c| !c.trim().is_empty()) {
            sdkgen::run_post_gen(command, sdk_client, out_dir).await?;
        }
        println!("{} SDK generated", sdk_client.client_type);
    }

    println!("\nAll {total} SDK(s) generated");
    Ok(())
}
