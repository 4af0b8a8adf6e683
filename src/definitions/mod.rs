pub mod errors;
pub mod loader;
pub mod payload;
pub mod types;
pub mod validator;

use std::collections::BTreeMap;

use errors::DefinitionsError;
use types::{EntitlementDef, FeatureDef, PlanDef, ResourceDef, SdkOptions};

/// Directory under the project root holding the definition files.
pub const DEFINITIONS_DIR: &str = ".blimu";

/// The full authorization model of one project, loaded from `.blimu/`.
/// Built once per command and never mutated while it is validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    /// resource name -> ResourceDef
    pub resources: BTreeMap<String, ResourceDef>,
    /// "resource:action" -> EntitlementDef
    pub entitlements: BTreeMap<String, EntitlementDef>,
    pub features: BTreeMap<String, FeatureDef>,
    pub plans: BTreeMap<String, PlanDef>,
    /// Present only when `config.yml` exists
    pub sdk: Option<SdkOptions>,
}

/// Per-section counts, printed after a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub resources: usize,
    pub entitlements: usize,
    pub features: usize,
    pub plans: usize,
    pub sdk_clients: usize,
}

impl Definitions {
    pub fn summary(&self) -> Summary {
        Summary {
            resources: self.resources.len(),
            entitlements: self.entitlements.len(),
            features: self.features.len(),
            plans: self.plans.len(),
            sdk_clients: self.sdk.as_ref().map(|s| s.clients.len()).unwrap_or(0),
        }
    }

    /// Push and generate need at least one resource to act on.
    pub fn ensure_pushable(&self) -> Result<(), DefinitionsError> {
        if self.resources.is_empty() {
            return Err(DefinitionsError::NoResources);
        }
        Ok(())
    }
}
