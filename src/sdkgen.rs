//! Running the external SDK generator over a merged OpenAPI document.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::definitions::types::SdkClient;
use crate::errors::{CliError, Result};

/// Client output directories are relative to the project root.
pub fn resolve_out_dir(project_root: &Path, client: &SdkClient) -> PathBuf {
    let out = Path::new(&client.out_dir);
    if out.is_absolute() {
        out.to_path_buf()
    } else {
        project_root.join(out)
    }
}

pub fn generator_args(spec_path: &Path, client: &SdkClient, out_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--spec".into(),
        spec_path.into(),
        "--type".into(),
        client.client_type.clone().into(),
        "--out-dir".into(),
        out_dir.into(),
        "--package-name".into(),
        client.package_name.clone().into(),
        "--name".into(),
        client.name.clone().into(),
    ];
    if !client.module_name.is_empty() {
        args.push("--module-name".into());
        args.push(client.module_name.clone().into());
    }
    if !client.include_tags.is_empty() {
        args.push("--include-tags".into());
        args.push(client.include_tags.join(",").into());
    }
    if !client.exclude_tags.is_empty() {
        args.push("--exclude-tags".into());
        args.push(client.exclude_tags.join(",").into());
    }
    if client.include_query_keys {
        args.push("--include-query-keys".into());
    }
    if let Some(parser) = &client.operation_id_parser {
        args.push("--operation-id-parser".into());
        args.push(parser.clone().into());
    }
    args
}

/// Write `spec` to a temporary file and run `program` on it for one client.
/// The file is removed when this returns.
pub async fn run_generator(
    program: &str,
    spec: &serde_json::Value,
    client: &SdkClient,
    out_dir: &Path,
) -> Result<()> {
    let mut spec_file = tempfile::Builder::new()
        .prefix("blimu-spec-")
        .suffix(".json")
        .tempfile()?;
    serde_json::to_writer_pretty(&mut spec_file, spec)?;
    spec_file.flush()?;

    std::fs::create_dir_all(out_dir)?;

    let args = generator_args(spec_file.path(), client, out_dir);
    tracing::info!(program, client = %client.name, out_dir = %out_dir.display(), "Running SDK generator");

    let status = Command::new(program)
        .args(&args)
        .status()
        .await
        .map_err(|e| CliError::Generator {
            client: client.name.clone(),
            reason: format!("could not start `{program}`: {e}"),
        })?;

    if !status.success() {
        return Err(CliError::Generator {
            client: client.name.clone(),
            reason: format!("`{program}` exited with {status}"),
        });
    }
    Ok(())
}

/// Run a client's `postGenCommand` through the platform shell inside `out_dir`.
pub async fn run_post_gen(command: &str, client: &SdkClient, out_dir: &Path) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    tracing::info!(command, dir = %out_dir.display(), "Running post-generation command");
    let status = cmd
        .current_dir(out_dir)
        .status()
        .await
        .map_err(|e| CliError::Generator {
            client: client.name.clone(),
            reason: format!("could not start post-generation command: {e}"),
        })?;

    if !status.success() {
        return Err(CliError::Generator {
            client: client.name.clone(),
            reason: format!("post-generation command `{command}` exited with {status}"),
        });
    }
    Ok(())
}
