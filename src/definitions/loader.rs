use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::definitions::errors::DefinitionsError;
use crate::definitions::{Definitions, DEFINITIONS_DIR};

pub const RESOURCES: &str = "resources";
pub const ENTITLEMENTS: &str = "entitlements";
pub const FEATURES: &str = "features";
pub const PLANS: &str = "plans";
pub const SDK_CONFIG: &str = "config";

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Resolve the project directory for `start`.
///
/// A `start` that has its own `.blimu/` directory is the project, whatever
/// that directory contains. Otherwise walk towards the filesystem root and
/// return the first directory containing `.blimu/resources.yml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, DefinitionsError> {
    let not_found = || DefinitionsError::NotFound {
        start: start.display().to_string(),
    };
    let mut dir = start.canonicalize().map_err(|_| not_found())?;

    if dir.join(DEFINITIONS_DIR).is_dir() {
        return Ok(dir);
    }

    loop {
        if locate(&dir.join(DEFINITIONS_DIR), RESOURCES).is_some() {
            tracing::debug!(root = %dir.display(), "Found definitions directory");
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(not_found());
        }
    }
}

/// Load every definition file under `<project_dir>/.blimu`.
///
/// `resources` is required; the other sections fall back to empty when their
/// file does not exist. A file that exists but cannot be parsed is fatal.
pub fn load_definitions(project_dir: &Path) -> Result<Definitions, DefinitionsError> {
    let dir = project_dir.join(DEFINITIONS_DIR);

    let resources_path =
        locate(&dir, RESOURCES).ok_or_else(|| DefinitionsError::MissingRequired {
            path: dir.join(format!("{RESOURCES}.yml")).display().to_string(),
        })?;

    let defs = Definitions {
        resources: read_section(&resources_path)?,
        entitlements: read_optional(&dir, ENTITLEMENTS)?.unwrap_or_default(),
        features: read_optional(&dir, FEATURES)?.unwrap_or_default(),
        plans: read_optional(&dir, PLANS)?.unwrap_or_default(),
        sdk: read_optional(&dir, SDK_CONFIG)?,
    };

    tracing::info!(
        dir = %dir.display(),
        resources = defs.resources.len(),
        entitlements = defs.entitlements.len(),
        features = defs.features.len(),
        plans = defs.plans.len(),
        sdk = defs.sdk.is_some(),
        "Loaded definitions"
    );

    Ok(defs)
}

/// Write definitions back to `<project_dir>/.blimu`.
///
/// `resources.yml` is always written. An empty entitlements, features or
/// plans section removes its file, so entries deleted remotely do not linger
/// after a pull. The SDK config is only touched when `defs.sdk` is set.
pub fn save_definitions(project_dir: &Path, defs: &Definitions) -> Result<(), DefinitionsError> {
    let dir = project_dir.join(DEFINITIONS_DIR);
    std::fs::create_dir_all(&dir).map_err(|source| DefinitionsError::Write {
        path: dir.display().to_string(),
        source,
    })?;

    write_section(&dir, RESOURCES, &defs.resources)?;
    write_or_remove(&dir, ENTITLEMENTS, &defs.entitlements)?;
    write_or_remove(&dir, FEATURES, &defs.features)?;
    write_or_remove(&dir, PLANS, &defs.plans)?;
    if let Some(sdk) = &defs.sdk {
        write_section(&dir, SDK_CONFIG, sdk)?;
    }

    tracing::info!(dir = %dir.display(), "Saved definitions");
    Ok(())
}

fn locate(dir: &Path, stem: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

fn read_optional<T: DeserializeOwned + Default>(
    dir: &Path,
    stem: &str,
) -> Result<Option<T>, DefinitionsError> {
    match locate(dir, stem) {
        Some(path) => read_section(&path).map(Some),
        None => {
            tracing::debug!(file = stem, "Optional definition file not present");
            Ok(None)
        }
    }
}

fn read_section<T: DeserializeOwned + Default>(path: &Path) -> Result<T, DefinitionsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DefinitionsError::Read {
        path: path.display().to_string(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(T::default());
    }

    // A document consisting of `~` or `null` counts as empty too
    serde_yaml::from_str::<Option<T>>(&contents)
        .map(Option::unwrap_or_default)
        .map_err(|source| DefinitionsError::Parse {
            path: path.display().to_string(),
            source,
        })
}

fn write_or_remove<V: Serialize>(
    dir: &Path,
    stem: &'static str,
    section: &BTreeMap<String, V>,
) -> Result<(), DefinitionsError> {
    if !section.is_empty() {
        return write_section(dir, stem, section);
    }

    for path in EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .filter(|p| p.is_file())
    {
        std::fs::remove_file(&path).map_err(|source| DefinitionsError::Write {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Removed empty definition file");
    }
    Ok(())
}

fn write_section<T: Serialize>(
    dir: &Path,
    stem: &'static str,
    value: &T,
) -> Result<(), DefinitionsError> {
    let path = locate(dir, stem).unwrap_or_else(|| dir.join(format!("{stem}.yml")));
    let yaml = serde_yaml::to_string(value).map_err(|source| DefinitionsError::Serialize {
        section: stem,
        source,
    })?;
    std::fs::write(&path, yaml).map_err(|source| DefinitionsError::Write {
        path: path.display().to_string(),
        source,
    })
}
