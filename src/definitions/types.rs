use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------- Definition file types ----------

/// One node of the resource hierarchy, as written in `resources.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Role names valid for this resource type
    #[serde(default)]
    pub roles: Vec<String>,
    /// role -> list of "parent->parent_role" grants
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles_inheritance: BTreeMap<String, Vec<String>>,
    /// parent resource name -> relationship options
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parents: BTreeMap<String, ParentRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    /// Whether an instance must be created under this parent
    #[serde(default)]
    pub required: bool,
}

/// Keyed by `resource:action`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<String>,
    #[serde(default)]
    pub default_enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entitlements: Vec<String>,
}

/// Billing tier. Missing fields load as empty strings and are reported by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDef {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "summary")]
    pub description: String,
}

/// Contents of `config.yml`: which SDK clients `generate` produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub clients: Vec<SdkClient>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkClient {
    /// Kept as a plain string so unsupported values surface as validation errors
    #[serde(default, rename = "type")]
    pub client_type: String,
    #[serde(default)]
    pub out_dir: String,
    #[serde(default)]
    pub package_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tags: Vec<String>,
    #[serde(default)]
    pub include_query_keys: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id_parser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_gen_command: Option<String>,
}

impl SdkClient {
    pub fn kind(&self) -> Option<ClientType> {
        ClientType::parse(&self.client_type)
    }
}

/// SDK flavours the generator knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    TypeScript,
    Go,
}

impl ClientType {
    pub const SUPPORTED: [&'static str; 2] = ["typescript", "go"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "typescript" => Some(Self::TypeScript),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Go => "go",
        }
    }

    /// Go clients are addressed by module path and need `moduleName`.
    pub fn requires_module_name(&self) -> bool {
        matches!(self, Self::Go)
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------- Reference parsing ----------

/// Inherited grant: "organization->admin"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InheritanceRef {
    pub resource: String,
    pub role: String,
}

impl InheritanceRef {
    pub const SEPARATOR: &'static str = "->";

    /// Returns `None` unless the token splits into exactly two parts on `->`.
    /// Both sides are trimmed; emptiness is left to the resource lookup.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(Self::SEPARATOR);
        let resource = parts.next()?;
        let role = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            resource: resource.trim().to_string(),
            role: role.trim().to_string(),
        })
    }
}

impl std::fmt::Display for InheritanceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.resource, Self::SEPARATOR, self.role)
    }
}

/// Entitlement key: "organization:invite"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitlementName {
    pub resource: String,
    pub action: String,
}

impl EntitlementName {
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once(':')?;
        if resource.is_empty() || action.is_empty() || action.contains(':') {
            return None;
        }
        Some(Self {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }
}

impl std::fmt::Display for EntitlementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inheritance_ref_parse() {
        let r = InheritanceRef::parse("organization->admin").unwrap();
        assert_eq!(r.resource, "organization");
        assert_eq!(r.role, "admin");
        assert_eq!(r.to_string(), "organization->admin");

        let spaced = InheritanceRef::parse("  workspace ->  editor ").unwrap();
        assert_eq!(spaced.resource, "workspace");
        assert_eq!(spaced.role, "editor");

        assert!(InheritanceRef::parse("organization-admin").is_none());
        assert!(InheritanceRef::parse("a->b->c").is_none());
    }

    #[test]
    fn test_inheritance_ref_keeps_empty_sides() {
        let r = InheritanceRef::parse("->admin").unwrap();
        assert_eq!(r.resource, "");
        assert_eq!(r.role, "admin");
    }

    #[test]
    fn test_entitlement_name_parse() {
        let e = EntitlementName::parse("organization:invite").unwrap();
        assert_eq!(e.resource, "organization");
        assert_eq!(e.action, "invite");
        assert_eq!(e.to_string(), "organization:invite");

        assert!(EntitlementName::parse("orgcreate").is_none());
        assert!(EntitlementName::parse("org:create:extra").is_none());
        assert!(EntitlementName::parse(":create").is_none());
        assert!(EntitlementName::parse("org:").is_none());
    }

    #[test]
    fn test_client_type() {
        assert_eq!(ClientType::parse("go"), Some(ClientType::Go));
        assert_eq!(ClientType::parse("typescript"), Some(ClientType::TypeScript));
        assert_eq!(ClientType::parse("python"), None);
        assert!(ClientType::Go.requires_module_name());
        assert!(!ClientType::TypeScript.requires_module_name());
    }

    #[test]
    fn test_resource_def_yaml_shape() {
        let yaml = r#"
roles: [admin, member]
roles_inheritance:
  admin: ["organization->admin"]
parents:
  organization:
    required: true
"#;
        let def: ResourceDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.roles, vec!["admin", "member"]);
        assert_eq!(def.roles_inheritance["admin"], vec!["organization->admin"]);
        assert!(def.parents["organization"].required);
    }

    #[test]
    fn test_plan_description_alias() {
        let plan: PlanDef = serde_json::from_str(r#"{"name":"Pro","summary":"For teams"}"#).unwrap();
        assert_eq!(plan.description, "For teams");

        let missing: PlanDef = serde_yaml::from_str("name: Free").unwrap();
        assert_eq!(missing.description, "");
    }

    #[test]
    fn test_sdk_client_camel_case() {
        let yaml = r#"
clients:
  - type: go
    outDir: ./sdk/go
    packageName: acme
    moduleName: github.com/acme/sdk
    name: AcmeClient
    postGenCommand: go fmt ./...
"#;
        let opts: SdkOptions = serde_yaml::from_str(yaml).unwrap();
        let client = &opts.clients[0];
        assert_eq!(client.kind(), Some(ClientType::Go));
        assert_eq!(client.out_dir, "./sdk/go");
        assert_eq!(client.module_name, "github.com/acme/sdk");
        assert_eq!(client.post_gen_command.as_deref(), Some("go fmt ./..."));
    }
}
