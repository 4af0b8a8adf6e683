use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definitions::types::*;
use crate::definitions::validator::ValidationError;
use crate::definitions::Definitions;

/// Schema version stamped on every payload sent to the API.
pub const SCHEMA_VERSION: &str = "1.0";

/// The JSON document submitted for remote validation and push.
///
/// Every section is always present as an object, even when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionsPayload {
    pub resources: BTreeMap<String, ResourceDef>,
    pub entitlements: BTreeMap<String, EntitlementDef>,
    pub features: BTreeMap<String, FeatureDef>,
    pub plans: BTreeMap<String, PlanDef>,
    pub version: String,
}

impl From<&Definitions> for DefinitionsPayload {
    fn from(defs: &Definitions) -> Self {
        Self {
            resources: defs.resources.clone(),
            entitlements: defs.entitlements.clone(),
            features: defs.features.clone(),
            plans: defs.plans.clone(),
            version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Per-client options attached to a generate-sdk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkGenerationOptions {
    #[serde(rename = "type")]
    pub client_type: String,
    pub package_name: String,
    pub client_name: String,
}

impl From<&SdkClient> for SdkGenerationOptions {
    fn from(client: &SdkClient) -> Self {
        Self {
            client_type: client.client_type.clone(),
            package_name: client.package_name.clone(),
            client_name: client.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSdkRequest {
    #[serde(flatten)]
    pub payload: DefinitionsPayload,
    pub sdk_options: SdkGenerationOptions,
}

impl GenerateSdkRequest {
    pub fn new(defs: &Definitions, client: &SdkClient) -> Self {
        Self {
            payload: DefinitionsPayload::from(defs),
            sdk_options: SdkGenerationOptions::from(client),
        }
    }
}

/// Server verdict on a submitted payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteValidation {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    /// Preview OpenAPI document, only returned for valid payloads
    #[serde(default)]
    pub spec: Option<serde_json::Value>,
}

/// Custom OpenAPI fragment produced for one SDK client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneratedSpec {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
}

/// A definitions document as stored remotely.
///
/// Sections may be missing or `null`; entries must still have the same shape
/// as the local files, so a malformed document is rejected instead of being
/// written to disk half-converted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionsDocument {
    #[serde(default)]
    pub resources: Option<BTreeMap<String, ResourceDef>>,
    #[serde(default)]
    pub entitlements: Option<BTreeMap<String, EntitlementDef>>,
    #[serde(default)]
    pub features: Option<BTreeMap<String, FeatureDef>>,
    #[serde(default)]
    pub plans: Option<BTreeMap<String, PlanDef>>,
}

impl From<DefinitionsDocument> for Definitions {
    fn from(doc: DefinitionsDocument) -> Self {
        Definitions {
            resources: doc.resources.unwrap_or_default(),
            entitlements: doc.entitlements.unwrap_or_default(),
            features: doc.features.unwrap_or_default(),
            plans: doc.plans.unwrap_or_default(),
            sdk: None,
        }
    }
}
