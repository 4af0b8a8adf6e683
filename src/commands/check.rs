use std::fmt::Write as _;

use clap::Args;

use crate::api::{ApiClient, EntitlementCheck, EntitlementDecision};
use crate::errors::Result;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub user_id: String,
    /// Entitlement in `resource:action` form
    pub entitlement: String,
    pub resource_type: String,
    pub resource_id: String,
}

/// Ask the current environment whether a user holds an entitlement on a
/// resource. A denial is reported, not treated as a failure.
pub async fn run(session: &Session, args: &CheckArgs) -> Result<()> {
    let env_name = session.settings().current()?.name.clone();
    let client = ApiClient::new(session.credentials()?)?;

    println!(
        "Checking '{}' for user '{}' on {}:{} in '{env_name}'",
        args.entitlement, args.user_id, args.resource_type, args.resource_id
    );

    let decision = client
        .check_entitlement(&EntitlementCheck {
            user_id: args.user_id.clone(),
            entitlement: args.entitlement.clone(),
            resource_id: args.resource_id.clone(),
        })
        .await?;

    tracing::debug!(allowed = decision.allowed, "Entitlement checked");
    print!("{}", render_decision(&decision));
    Ok(())
}

pub fn render_decision(d: &EntitlementDecision) -> String {
    let mut out = String::new();
    let status = if d.allowed { "ALLOWED" } else { "DENIED" };
    let _ = writeln!(out, "  Status: {status}");
    if let Some(reason) = d.reason.as_deref().filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "  Reason: {reason}");
    }
    if d.allowed {
        return out;
    }

    if !d.required_roles.is_empty() {
        let _ = writeln!(out, "  Required roles:");
        for role in &d.required_roles {
            let _ = writeln!(out, "    - {role}");
        }
    }
    if !d.user_roles.is_empty() {
        let _ = writeln!(out, "  User's roles:");
        for role in &d.user_roles {
            let _ = writeln!(out, "    - {role}");
        }
    }
    out
}
