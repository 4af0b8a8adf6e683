//! Static consistency checks over a loaded [`Definitions`] set.
//!
//! Validation never fails with `Err`: every problem becomes a
//! [`ValidationError`] in the returned list, and callers decide whether a
//! non-empty list aborts the command.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::definitions::types::*;
use crate::definitions::Definitions;

const ENTITLEMENTS: &str = "entitlements";
const FEATURES: &str = "features";
const PLANS: &str = "plans";
const SDK_CONFIG: &str = "config";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

impl ValidationError {
    fn new(resource: &str, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            resource: resource.to_string(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.resource, self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a complete definitions set.
///
/// Rules run in a fixed order (resources, entitlements, features, plans, sdk
/// options) and every violation is collected.
pub fn validate(defs: &Definitions) -> ValidationResult {
    let mut errors = Vec::new();

    for (name, resource) in &defs.resources {
        validate_resource(name, resource, &defs.resources, &mut errors);
    }
    for (name, entitlement) in &defs.entitlements {
        validate_entitlement(name, entitlement, defs, &mut errors);
    }
    for (name, feature) in &defs.features {
        validate_feature(name, feature, defs, &mut errors);
    }
    for (name, plan) in &defs.plans {
        validate_plan(name, plan, &mut errors);
    }
    if let Some(sdk) = &defs.sdk {
        validate_sdk_options(sdk, &mut errors);
    }

    tracing::debug!(errors = errors.len(), "Validated definitions");
    ValidationResult::from_errors(errors)
}

fn validate_resource(
    name: &str,
    resource: &ResourceDef,
    all: &BTreeMap<String, ResourceDef>,
    errors: &mut Vec<ValidationError>,
) {
    if resource.roles.is_empty() {
        errors.push(ValidationError::new(
            name,
            "roles",
            "at least one role must be defined",
        ));
    }

    for (role, grants) in &resource.roles_inheritance {
        if !resource.roles.contains(role) {
            errors.push(ValidationError::new(
                name,
                "roles_inheritance",
                format!("role '{role}' not found in roles list"),
            ));
        }

        for token in grants {
            if let Err(reason) = check_inheritance(token, all) {
                errors.push(ValidationError::new(
                    name,
                    "roles_inheritance",
                    format!("invalid inheritance '{token}': {reason}"),
                ));
            }
        }
    }

    for parent in resource.parents.keys() {
        if !all.contains_key(parent) {
            errors.push(ValidationError::new(
                name,
                "parents",
                format!("parent resource '{parent}' not found"),
            ));
        }

        if reaches(parent, name, all, &mut HashSet::new()) {
            errors.push(ValidationError::new(
                name,
                "parents",
                format!("circular dependency detected with parent '{parent}'"),
            ));
        }
    }
}

fn check_inheritance(token: &str, all: &BTreeMap<String, ResourceDef>) -> Result<(), String> {
    let grant = InheritanceRef::parse(token)
        .ok_or_else(|| "inheritance must be in format 'resource->role'".to_string())?;

    let parent = all
        .get(&grant.resource)
        .ok_or_else(|| format!("resource '{}' not found", grant.resource))?;

    if !parent.roles.contains(&grant.role) {
        return Err(format!(
            "role '{}' not found in resource '{}'",
            grant.role, grant.resource
        ));
    }
    Ok(())
}

/// Does following `parents` edges from `current` ever arrive at `target`?
///
/// `path` holds only the nodes on the current DFS branch and is unwound on
/// backtrack, so a node reachable through two different parents (a diamond)
/// is explored twice instead of being mistaken for a cycle.
fn reaches<'a>(
    current: &'a str,
    target: &str,
    all: &'a BTreeMap<String, ResourceDef>,
    path: &mut HashSet<&'a str>,
) -> bool {
    if !path.insert(current) {
        return current == target;
    }

    let found = match all.get(current) {
        Some(resource) => resource
            .parents
            .keys()
            .any(|parent| parent == target || reaches(parent, target, all, path)),
        None => false,
    };

    path.remove(current);
    found
}

fn validate_entitlement(
    name: &str,
    entitlement: &EntitlementDef,
    defs: &Definitions,
    errors: &mut Vec<ValidationError>,
) {
    let Some(parsed) = EntitlementName::parse(name) else {
        errors.push(ValidationError::new(
            ENTITLEMENTS,
            name,
            "entitlement name must be in format 'resource:action'",
        ));
        return;
    };

    match defs.resources.get(&parsed.resource) {
        Some(resource) => {
            for role in &entitlement.roles {
                if !resource.roles.contains(role) {
                    errors.push(ValidationError::new(
                        ENTITLEMENTS,
                        name,
                        format!("role '{role}' not found in resource '{}'", parsed.resource),
                    ));
                }
            }
        }
        None => errors.push(ValidationError::new(
            ENTITLEMENTS,
            name,
            format!("resource '{}' not found in resources", parsed.resource),
        )),
    }

    for plan in &entitlement.plans {
        if !defs.plans.contains_key(plan) {
            errors.push(ValidationError::new(
                ENTITLEMENTS,
                name,
                format!("plan '{plan}' not found in plans"),
            ));
        }
    }
}

fn validate_feature(
    name: &str,
    feature: &FeatureDef,
    defs: &Definitions,
    errors: &mut Vec<ValidationError>,
) {
    for plan in &feature.plans {
        if !defs.plans.contains_key(plan) {
            errors.push(ValidationError::new(
                FEATURES,
                name,
                format!("plan '{plan}' not found in plans"),
            ));
        }
    }

    for entitlement in &feature.entitlements {
        if !defs.entitlements.contains_key(entitlement) {
            errors.push(ValidationError::new(
                FEATURES,
                name,
                format!("entitlement '{entitlement}' not found in entitlements"),
            ));
        }
    }
}

fn validate_plan(name: &str, plan: &PlanDef, errors: &mut Vec<ValidationError>) {
    if plan.name.trim().is_empty() {
        errors.push(ValidationError::new(PLANS, name, "plan must have a name"));
    }
    if plan.description.trim().is_empty() {
        errors.push(ValidationError::new(
            PLANS,
            name,
            "plan must have a description",
        ));
    }
}

fn validate_sdk_options(sdk: &SdkOptions, errors: &mut Vec<ValidationError>) {
    if sdk.clients.is_empty() {
        errors.push(ValidationError::new(
            SDK_CONFIG,
            "clients",
            "at least one client must be defined",
        ));
        return;
    }

    for (i, client) in sdk.clients.iter().enumerate() {
        let field = |name: &str| format!("clients[{i}].{name}");

        if client.client_type.trim().is_empty() {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                field("type"),
                "client type is required",
            ));
        } else if client.kind().is_none() {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                field("type"),
                format!(
                    "unsupported client type '{}'. Supported types: {}",
                    client.client_type,
                    ClientType::SUPPORTED.join(", ")
                ),
            ));
        }

        if client.out_dir.trim().is_empty() {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                field("outDir"),
                "output directory is required",
            ));
        }
        if client.package_name.trim().is_empty() {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                field("packageName"),
                "package name is required",
            ));
        }
        if client.name.trim().is_empty() {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                field("name"),
                "client name is required",
            ));
        }
        if client.kind().is_some_and(|k| k.requires_module_name())
            && client.module_name.trim().is_empty()
        {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                field("moduleName"),
                "module name is required for Go clients",
            ));
        }
    }

    // out dir -> index of the first client writing there
    let mut out_dirs: HashMap<&str, usize> = HashMap::new();
    for (i, client) in sdk.clients.iter().enumerate() {
        if client.out_dir.is_empty() {
            continue;
        }
        if let Some(first) = out_dirs.get(client.out_dir.as_str()) {
            errors.push(ValidationError::new(
                SDK_CONFIG,
                format!("clients[{i}].outDir"),
                format!(
                    "output directory '{}' is already used by clients[{first}]",
                    client.out_dir
                ),
            ));
        } else {
            out_dirs.insert(&client.out_dir, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(roles: &[&str]) -> ResourceDef {
        ResourceDef {
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    fn with_parents(roles: &[&str], parents: &[&str]) -> ResourceDef {
        let mut r = resource(roles);
        for p in parents {
            r.parents.insert(p.to_string(), ParentRef { required: false });
        }
        r
    }

    fn defs_of(resources: Vec<(&str, ResourceDef)>) -> Definitions {
        Definitions {
            resources: resources
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Default::default()
        }
    }

    fn cycle_errors(result: &ValidationResult) -> Vec<&ValidationError> {
        result
            .errors
            .iter()
            .filter(|e| e.message.starts_with("circular dependency"))
            .collect()
    }

    #[test]
    fn test_valid_flat_resources() {
        let defs = defs_of(vec![
            ("organization", resource(&["admin", "member"])),
            ("workspace", resource(&["admin"])),
        ]);
        let result = validate(&defs);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_missing_roles() {
        let defs = defs_of(vec![("organization", resource(&[]))]);
        let result = validate(&defs);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].resource, "organization");
        assert_eq!(result.errors[0].field, "roles");
        assert_eq!(result.errors[0].message, "at least one role must be defined");
    }

    #[test]
    fn test_inheritance_key_must_be_a_role() {
        let mut ws = resource(&["admin"]);
        ws.roles_inheritance
            .insert("owner".into(), vec!["organization->admin".into()]);
        let defs = defs_of(vec![("organization", resource(&["admin"])), ("workspace", ws)]);

        let result = validate(&defs);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "roles_inheritance");
        assert_eq!(result.errors[0].message, "role 'owner' not found in roles list");
    }

    #[test]
    fn test_inheritance_tokens() {
        let mut ws = resource(&["admin"]);
        ws.roles_inheritance.insert(
            "admin".into(),
            vec![
                "organization->admin".into(),
                "organization-admin".into(),
                "ghost->admin".into(),
                "organization->owner".into(),
            ],
        );
        let defs = defs_of(vec![("organization", resource(&["admin"])), ("workspace", ws)]);

        let messages: Vec<String> = validate(&defs).errors.into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                "invalid inheritance 'organization-admin': inheritance must be in format 'resource->role'",
                "invalid inheritance 'ghost->admin': resource 'ghost' not found",
                "invalid inheritance 'organization->owner': role 'owner' not found in resource 'organization'",
            ]
        );
    }

    #[test]
    fn test_unknown_parent() {
        let defs = defs_of(vec![("workspace", with_parents(&["admin"], &["organization"]))]);
        let result = validate(&defs);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "parents");
        assert_eq!(
            result.errors[0].message,
            "parent resource 'organization' not found"
        );
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let defs = defs_of(vec![("a", with_parents(&["admin"], &["a"]))]);
        let result = validate(&defs);
        let cycles = cycle_errors(&result);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].resource, "a");
        assert_eq!(cycles[0].message, "circular dependency detected with parent 'a'");
    }

    #[test]
    fn test_two_node_cycle_reported_on_both_sides() {
        let defs = defs_of(vec![
            ("a", with_parents(&["admin"], &["b"])),
            ("b", with_parents(&["admin"], &["a"])),
        ]);
        let result = validate(&defs);
        let cycles = cycle_errors(&result);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().any(|e| e.resource == "a"));
        assert!(cycles.iter().any(|e| e.resource == "b"));
    }

    #[test]
    fn test_three_hop_cycle() {
        let defs = defs_of(vec![
            ("a", with_parents(&["admin"], &["b"])),
            ("b", with_parents(&["admin"], &["c"])),
            ("c", with_parents(&["admin"], &["a"])),
        ]);
        let result = validate(&defs);
        let cycles = cycle_errors(&result);
        assert_eq!(cycles.len(), 3);
        assert!(cycles
            .iter()
            .any(|e| e.resource == "a" && e.message.contains("'b'")));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        // d -> b -> a, d -> c -> a
        let defs = defs_of(vec![
            ("a", resource(&["admin"])),
            ("b", with_parents(&["admin"], &["a"])),
            ("c", with_parents(&["admin"], &["a"])),
            ("d", with_parents(&["admin"], &["b", "c"])),
        ]);
        assert!(validate(&defs).valid);
    }

    #[test]
    fn test_cycle_elsewhere_does_not_implicate_ancestor_walkers() {
        // x -> b, and b <-> c form a cycle that does not include x
        let defs = defs_of(vec![
            ("x", with_parents(&["admin"], &["b"])),
            ("b", with_parents(&["admin"], &["c"])),
            ("c", with_parents(&["admin"], &["b"])),
        ]);
        let result = validate(&defs);
        let cycles = cycle_errors(&result);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().all(|e| e.resource != "x"));
    }

    #[test]
    fn test_entitlement_format() {
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        for name in ["orgcreate", "org:create:extra", "org:create"] {
            defs.entitlements.insert(name.into(), EntitlementDef::default());
        }

        let result = validate(&defs);
        let format_errors: Vec<&str> = result
            .errors
            .iter()
            .filter(|e| e.message.contains("format 'resource:action'"))
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(format_errors, vec!["org:create:extra", "orgcreate"]);
        assert!(result.errors.iter().all(|e| e.field != "org:create"));
    }

    #[test]
    fn test_entitlement_unknown_resource_skips_role_checks() {
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        defs.entitlements.insert(
            "project:delete".into(),
            EntitlementDef {
                roles: vec!["owner".into()],
                plans: vec!["pro".into()],
            },
        );

        let result = validate(&defs);
        let messages: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "resource 'project' not found in resources",
                "plan 'pro' not found in plans",
            ]
        );
        assert!(result.errors.iter().all(|e| e.resource == "entitlements"));
    }

    #[test]
    fn test_entitlement_role_must_exist_on_resource() {
        let mut defs = defs_of(vec![
            ("organization", resource(&["admin", "editor"])),
            ("workspace", with_parents(&["admin"], &["organization"])),
        ]);
        defs.resources
            .get_mut("workspace")
            .unwrap()
            .parents
            .insert("organization".into(), ParentRef { required: true });
        defs.entitlements.insert(
            "organization:invite".into(),
            EntitlementDef {
                roles: vec!["admin".into()],
                plans: vec![],
            },
        );

        let result = validate(&defs);
        assert!(result.valid, "unexpected errors: {:?}", result.errors);

        defs.entitlements
            .get_mut("organization:invite")
            .unwrap()
            .roles = vec!["owner".into()];

        let result = validate(&defs);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![ValidationError::new(
                "entitlements",
                "organization:invite",
                "role 'owner' not found in resource 'organization'"
            )]
        );
    }

    #[test]
    fn test_features_reference_plans_and_entitlements() {
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        defs.plans.insert(
            "pro".into(),
            PlanDef {
                name: "Pro".into(),
                description: "Teams".into(),
            },
        );
        defs.features.insert(
            "sso".into(),
            FeatureDef {
                plans: vec!["pro".into(), "enterprise".into()],
                default_enabled: false,
                entitlements: vec!["org:sso".into()],
            },
        );

        let result = validate(&defs);
        assert_eq!(
            result.errors,
            vec![
                ValidationError::new("features", "sso", "plan 'enterprise' not found in plans"),
                ValidationError::new(
                    "features",
                    "sso",
                    "entitlement 'org:sso' not found in entitlements"
                ),
            ]
        );
    }

    #[test]
    fn test_plan_blank_fields() {
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        defs.plans.insert(
            "free".into(),
            PlanDef {
                name: "   ".into(),
                description: String::new(),
            },
        );

        let messages: Vec<String> = validate(&defs).errors.into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec!["plan must have a name", "plan must have a description"]
        );
    }

    #[test]
    fn test_sdk_options_require_clients() {
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        defs.sdk = Some(SdkOptions::default());

        let result = validate(&defs);
        assert_eq!(
            result.errors,
            vec![ValidationError::new(
                "config",
                "clients",
                "at least one client must be defined"
            )]
        );
    }

    #[test]
    fn test_sdk_client_fields() {
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        defs.sdk = Some(SdkOptions {
            clients: vec![
                SdkClient {
                    client_type: "go".into(),
                    out_dir: "sdk".into(),
                    package_name: "acme".into(),
                    name: "Acme".into(),
                    ..Default::default()
                },
                SdkClient {
                    client_type: "python".into(),
                    out_dir: "sdk".into(),
                    ..Default::default()
                },
                SdkClient::default(),
            ],
            ..Default::default()
        });

        let fields: Vec<String> = validate(&defs).errors.into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "clients[0].moduleName",
                "clients[1].type",
                "clients[1].packageName",
                "clients[1].name",
                "clients[2].type",
                "clients[2].outDir",
                "clients[2].packageName",
                "clients[2].name",
                "clients[1].outDir",
            ]
        );
    }

    #[test]
    fn test_duplicate_out_dir_cites_first_owner() {
        let client = |out: &str| SdkClient {
            client_type: "typescript".into(),
            out_dir: out.into(),
            package_name: "acme".into(),
            name: "Acme".into(),
            ..Default::default()
        };
        let mut defs = defs_of(vec![("org", resource(&["admin"]))]);
        defs.sdk = Some(SdkOptions {
            clients: vec![client("a"), client("b"), client("a"), client("a")],
            ..Default::default()
        });

        let errors = validate(&defs).errors;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "clients[2].outDir");
        assert_eq!(
            errors[0].message,
            "output directory 'a' is already used by clients[0]"
        );
        assert_eq!(errors[1].field, "clients[3].outDir");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let mut defs = defs_of(vec![
            ("a", with_parents(&[], &["b"])),
            ("b", with_parents(&["admin"], &["a"])),
        ]);
        defs.entitlements.insert("nope".into(), EntitlementDef::default());

        let first = validate(&defs);
        let second = validate(&defs);
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_display() {
        let e = ValidationError::new("organization", "roles", "at least one role must be defined");
        assert_eq!(
            e.to_string(),
            "organization.roles: at least one role must be defined"
        );
    }
}
