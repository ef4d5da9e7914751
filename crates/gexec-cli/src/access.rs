use std::{fs, path::Path};

use color_eyre::{eyre::WrapErr, Result};
use gexec_core::{
    access::{resolve, Capability, Decision, Principal},
    model::Project,
};

use crate::cli::AccessCommand;

/// Execute an access subcommand.
pub fn handle(cmd: AccessCommand) -> Result<()> {
    match cmd {
        AccessCommand::Check {
            principal,
            project,
            capability,
        } => {
            let principal = load_principal(&principal)?;
            println!("{}", check(&principal, &project, capability));
        }
    }

    Ok(())
}

fn load_principal(path: &Path) -> Result<Principal> {
    let body = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read principal from {}", path.display()))?;
    serde_json::from_str(&body)
        .wrap_err_with(|| format!("invalid principal in {}", path.display()))
}

fn check(principal: &Principal, project_id: &str, capability: Capability) -> String {
    let project = Project {
        id: project_id.to_string(),
        ..Default::default()
    };
    let verdict = match resolve(principal, &project, capability) {
        Decision::Allow => "allow",
        Decision::Deny => "deny",
    };

    let levels = principal
        .reachable_perms(project_id)
        .iter()
        .map(|perm| perm.as_str())
        .collect::<Vec<_>>();
    let via = if principal.admin {
        "global admin".to_string()
    } else if levels.is_empty() {
        "no grants".to_string()
    } else {
        levels.join(", ")
    };

    format!(
        "{verdict}: {} {capability} on project {project_id} ({via})",
        principal.id
    )
}
