//! Project access decisions.
//!
//! A principal reaches a project through three grant paths: a direct user grant,
//! and the project grants of every team or group the principal belongs to.
//! The reachable permission levels are reduced to one decision per capability
//! with an explicit membership table, not an ordinal comparison: `admin` does
//! not satisfy [`Capability::Own`].

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Project;

/// Permission level carried by every grant edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perm {
    User,
    Admin,
    Owner,
}

/// What the caller wants to do with a project's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Show,
    Own,
    Manage,
}

/// Teams and groups share one shape: a set of members and a set of project grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectiveKind {
    Team,
    Group,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {what}: {value}")]
pub struct ParseError {
    what: &'static str,
    value: String,
}

/// Returned by guards when the resolver denies a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("access denied: {capability} on project {project_id}")]
pub struct AccessDenied {
    pub project_id: String,
    pub capability: Capability,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Grant of a level on one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGrant {
    pub project_id: String,
    pub perm: Perm,
}

/// A team or group the principal belongs to, with that collective's project grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub kind: CollectiveKind,
    pub id: String,
    /// Level of the principal inside the collective; not consulted for project access.
    pub perm: Perm,
    #[serde(default)]
    pub projects: Vec<ProjectGrant>,
}

/// Authenticated user with everything needed to decide project access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    /// Global administrators bypass every grant check.
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub projects: Vec<ProjectGrant>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

impl Principal {
    /// Every level reachable on `project_id` through any grant path.
    pub fn reachable_perms(&self, project_id: &str) -> BTreeSet<Perm> {
        let direct = self.projects.iter();
        let collective = self.memberships.iter().flat_map(|m| m.projects.iter());

        direct
            .chain(collective)
            .filter(|grant| grant.project_id == project_id)
            .map(|grant| grant.perm)
            .collect()
    }
}

impl Capability {
    /// Levels that satisfy this capability.
    pub fn granted_by(self) -> &'static [Perm] {
        match self {
            Capability::Show => &[Perm::User, Perm::Admin, Perm::Owner],
            Capability::Own => &[Perm::Owner],
            Capability::Manage => &[Perm::Admin, Perm::Owner],
        }
    }
}

/// Decide whether `principal` may exercise `capability` on `project`.
pub fn resolve(principal: &Principal, project: &Project, capability: Capability) -> Decision {
    if principal.admin {
        return Decision::Allow;
    }

    let reachable = principal.reachable_perms(&project.id);
    let allowed = capability
        .granted_by()
        .iter()
        .any(|level| reachable.contains(level));

    tracing::debug!(
        principal = %principal.id,
        project = %project.id,
        %capability,
        ?reachable,
        allowed,
        "resolved project access"
    );

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Guard form of [`resolve`] for use with `?`.
pub fn require(
    principal: &Principal,
    project: &Project,
    capability: Capability,
) -> Result<(), AccessDenied> {
    match resolve(principal, project, capability) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AccessDenied {
            project_id: project.id.clone(),
            capability,
        }),
    }
}

impl Perm {
    pub fn as_str(self) -> &'static str {
        match self {
            Perm::User => "user",
            Perm::Admin => "admin",
            Perm::Owner => "owner",
        }
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Perm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Perm::User),
            "admin" => Ok(Perm::Admin),
            "owner" => Ok(Perm::Owner),
            other => Err(ParseError {
                what: "permission",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Show => "show",
            Capability::Own => "own",
            Capability::Manage => "manage",
        })
    }
}

impl FromStr for Capability {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(Capability::Show),
            "own" => Ok(Capability::Own),
            "manage" => Ok(Capability::Manage),
            other => Err(ParseError {
                what: "capability",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CollectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectiveKind::Team => "team",
            CollectiveKind::Group => "group",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Capability; 3] = [Capability::Show, Capability::Own, Capability::Manage];

    fn project() -> Project {
        Project {
            id: "p1".into(),
            slug: "infra".into(),
            name: "Infra".into(),
            ..Default::default()
        }
    }

    fn grant(perm: Perm) -> ProjectGrant {
        ProjectGrant {
            project_id: "p1".into(),
            perm,
        }
    }

    fn member_of(kind: CollectiveKind, perm: Perm) -> Principal {
        Principal {
            id: "u1".into(),
            memberships: vec![Membership {
                kind,
                id: "c1".into(),
                perm: Perm::User,
                projects: vec![grant(perm)],
            }],
            ..Default::default()
        }
    }

    fn decisions(principal: &Principal) -> [bool; 3] {
        ALL.map(|cap| resolve(principal, &project(), cap).is_allowed())
    }

    #[test]
    fn group_user_grant_only_shows() {
        let principal = member_of(CollectiveKind::Group, Perm::User);
        assert_eq!(decisions(&principal), [true, false, false]);
    }

    #[test]
    fn team_path_is_consulted_too() {
        let principal = member_of(CollectiveKind::Team, Perm::Admin);
        assert_eq!(decisions(&principal), [true, false, true]);
    }

    #[test]
    fn direct_owner_allows_everything() {
        let principal = Principal {
            id: "u1".into(),
            projects: vec![grant(Perm::Owner)],
            ..Default::default()
        };
        assert_eq!(decisions(&principal), [true, true, true]);
    }

    #[test]
    fn admin_level_does_not_imply_own() {
        let principal = Principal {
            id: "u1".into(),
            projects: vec![grant(Perm::Admin)],
            ..Default::default()
        };
        assert_eq!(decisions(&principal), [true, false, true]);
    }

    #[test]
    fn global_admin_without_grants_allows_everything() {
        let principal = Principal {
            id: "root".into(),
            admin: true,
            ..Default::default()
        };
        assert_eq!(decisions(&principal), [true, true, true]);
    }

    #[test]
    fn no_grant_denies_everything() {
        let principal = Principal {
            id: "u1".into(),
            projects: vec![ProjectGrant {
                project_id: "other".into(),
                perm: Perm::Owner,
            }],
            ..Default::default()
        };
        assert_eq!(decisions(&principal), [false, false, false]);
        assert_eq!(
            require(&principal, &project(), Capability::Show),
            Err(AccessDenied {
                project_id: "p1".into(),
                capability: Capability::Show,
            })
        );
    }

    #[test]
    fn levels_are_collected_across_paths() {
        let mut principal = member_of(CollectiveKind::Group, Perm::Owner);
        principal.projects.push(grant(Perm::User));
        let reachable = principal.reachable_perms("p1");
        assert_eq!(reachable, BTreeSet::from([Perm::User, Perm::Owner]));
        assert!(resolve(&principal, &project(), Capability::Own).is_allowed());
    }

    #[test]
    fn parses_levels_and_capabilities() {
        assert_eq!("owner".parse::<Perm>(), Ok(Perm::Owner));
        assert_eq!("manage".parse::<Capability>(), Ok(Capability::Manage));
        assert!("root".parse::<Perm>().is_err());
        assert_eq!(Perm::Admin.to_string(), "admin");
    }

    #[test]
    fn principal_deserializes_from_json() {
        let principal: Principal = serde_json::from_str(
            r#"{
                "id": "u1",
                "projects": [{"project_id": "p1", "perm": "user"}],
                "memberships": [
                    {"kind": "group", "id": "g1", "perm": "admin",
                     "projects": [{"project_id": "p1", "perm": "owner"}]}
                ]
            }"#,
        )
        .expect("parse principal");
        assert!(!principal.admin);
        assert_eq!(decisions(&principal), [true, true, true]);
    }
}
