//! CLI subcommands. Each module exposes a clap `Args` struct and an async `run`.

pub mod auth;
pub mod check;
pub mod env;
pub mod generate;
pub mod init;
pub mod pull;
pub mod push;
pub mod validate;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::definitions::loader::{find_project_root, load_definitions};
use crate::definitions::validator::{validate, ValidationError};
use crate::definitions::{Definitions, Summary};
use crate::errors::{CliError, Result};

/// Numbered `N. resource.field: message` lines, one per error, never truncated.
pub fn render_errors(errors: &[ValidationError]) -> String {
    let mut out = String::new();
    for (i, e) in errors.iter().enumerate() {
        let _ = writeln!(out, "{}. {e}", i + 1);
    }
    out
}

pub fn render_summary(s: &Summary) -> String {
    let mut out = String::from("Configuration summary:\n");
    let _ = writeln!(out, "  resources:    {}", s.resources);
    let _ = writeln!(out, "  entitlements: {}", s.entitlements);
    let _ = writeln!(out, "  features:     {}", s.features);
    let _ = writeln!(out, "  plans:        {}", s.plans);
    if s.sdk_clients > 0 {
        let _ = writeln!(out, "  sdk clients:  {}", s.sdk_clients);
    }
    out
}

/// Locate the project containing `dir` and load its definitions.
pub fn load_project(dir: &Path) -> Result<(PathBuf, Definitions)> {
    let root = find_project_root(dir)?;
    let defs = load_definitions(&root)?;
    Ok((root, defs))
}

/// Gate for commands that send definitions somewhere. Errors abort unless
/// the caller asked to skip validation.
pub fn ensure_valid(defs: &Definitions, skip_validation: bool) -> Result<()> {
    if skip_validation {
        tracing::warn!("Skipping local validation");
        return Ok(());
    }

    let result = validate(defs);
    if result.valid {
        return Ok(());
    }

    println!(
        "Local validation failed with {} error(s):\n",
        result.errors.len()
    );
    print!("{}", render_errors(&result.errors));
    println!("\nPass --skip-validation to continue anyway");
    Err(CliError::ValidationFailed {
        count: result.errors.len(),
    })
}
