use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::access::{CollectiveKind, Membership, Perm, Principal, ProjectGrant};

/// Errors produced by grant mutations and lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// Attach on an edge that already exists.
    #[error("relation is already assigned")]
    AlreadyAssigned,
    /// Permit or drop on an edge that does not exist.
    #[error("relation is not assigned")]
    NotAssigned,
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("subject not found: {0}")]
    SubjectNotFound(Subject),
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Holder of a project grant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    User(String),
    Team(String),
    Group(String),
}

impl Subject {
    pub fn collective(kind: CollectiveKind, id: impl Into<String>) -> Self {
        match kind {
            CollectiveKind::Team => Subject::Team(id.into()),
            CollectiveKind::Group => Subject::Group(id.into()),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(id) => write!(f, "user:{id}"),
            Subject::Team(id) => write!(f, "team:{id}"),
            Subject::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// One `(subject, project, perm)` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub subject: Subject,
    pub project_id: String,
    pub perm: Perm,
}

/// Persistence contract for grant and membership edges. Edges only change
/// through attach, permit and drop; each verifies both endpoints first.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Create a project grant; fails with `AlreadyAssigned` if present.
    async fn attach(&self, subject: &Subject, project_id: &str, perm: Perm)
        -> Result<(), GrantError>;

    /// Change the level of an existing project grant.
    async fn permit(&self, subject: &Subject, project_id: &str, perm: Perm)
        -> Result<(), GrantError>;

    /// Remove an existing project grant.
    async fn drop_grant(&self, subject: &Subject, project_id: &str) -> Result<(), GrantError>;

    /// Every grant edge on a project.
    async fn list_grants(&self, project_id: &str) -> Result<Vec<Grant>, GrantError>;

    /// Add a user to a team or group.
    async fn attach_member(
        &self,
        user_id: &str,
        kind: CollectiveKind,
        collective_id: &str,
        perm: Perm,
    ) -> Result<(), GrantError>;

    async fn permit_member(
        &self,
        user_id: &str,
        kind: CollectiveKind,
        collective_id: &str,
        perm: Perm,
    ) -> Result<(), GrantError>;

    async fn drop_member(
        &self,
        user_id: &str,
        kind: CollectiveKind,
        collective_id: &str,
    ) -> Result<(), GrantError>;

    /// Assemble the principal for a user: direct grants plus the grants of every
    /// team and group the user belongs to.
    async fn principal(&self, user_id: &str, admin: bool) -> Result<Principal, GrantError>;
}

#[derive(Debug, Default)]
struct Registry {
    projects: BTreeSet<String>,
    subjects: BTreeSet<Subject>,
    grants: BTreeMap<(Subject, String), Perm>,
    members: BTreeMap<(String, Subject), Perm>,
}

impl Registry {
    fn require_project(&self, project_id: &str) -> Result<(), GrantError> {
        if self.projects.contains(project_id) {
            Ok(())
        } else {
            Err(GrantError::ProjectNotFound(project_id.to_string()))
        }
    }

    fn require_subject(&self, subject: &Subject) -> Result<(), GrantError> {
        if self.subjects.contains(subject) {
            Ok(())
        } else {
            Err(GrantError::SubjectNotFound(subject.clone()))
        }
    }

    fn grants_of(&self, subject: &Subject) -> Vec<ProjectGrant> {
        self.grants
            .iter()
            .filter(|((holder, _), _)| holder == subject)
            .map(|((_, project_id), perm)| ProjectGrant {
                project_id: project_id.clone(),
                perm: *perm,
            })
            .collect()
    }
}

/// In-memory grant store for tests, smoke runs and embedding.
#[derive(Debug, Default, Clone)]
pub struct InMemoryGrantStore {
    inner: Arc<Mutex<Registry>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, GrantError> {
        self.inner.lock().map_err(|err| GrantError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }

    /// Register a project as an existing grant endpoint.
    pub fn add_project(&self, project_id: impl Into<String>) -> Result<(), GrantError> {
        self.lock()?.projects.insert(project_id.into());
        Ok(())
    }

    /// Register a user, team or group as an existing grant endpoint.
    pub fn add_subject(&self, subject: Subject) -> Result<(), GrantError> {
        self.lock()?.subjects.insert(subject);
        Ok(())
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn attach(
        &self,
        subject: &Subject,
        project_id: &str,
        perm: Perm,
    ) -> Result<(), GrantError> {
        let mut registry = self.lock()?;
        registry.require_subject(subject)?;
        registry.require_project(project_id)?;

        let key = (subject.clone(), project_id.to_string());
        if registry.grants.contains_key(&key) {
            return Err(GrantError::AlreadyAssigned);
        }
        registry.grants.insert(key, perm);
        debug!(%subject, project_id, %perm, "attached project grant");
        Ok(())
    }

    async fn permit(
        &self,
        subject: &Subject,
        project_id: &str,
        perm: Perm,
    ) -> Result<(), GrantError> {
        let mut registry = self.lock()?;
        registry.require_subject(subject)?;
        registry.require_project(project_id)?;

        let key = (subject.clone(), project_id.to_string());
        let slot = registry
            .grants
            .get_mut(&key)
            .ok_or(GrantError::NotAssigned)?;
        *slot = perm;
        debug!(%subject, project_id, %perm, "updated project grant");
        Ok(())
    }

    async fn drop_grant(&self, subject: &Subject, project_id: &str) -> Result<(), GrantError> {
        let mut registry = self.lock()?;
        registry.require_subject(subject)?;
        registry.require_project(project_id)?;

        let key = (subject.clone(), project_id.to_string());
        registry
            .grants
            .remove(&key)
            .ok_or(GrantError::NotAssigned)?;
        debug!(%subject, project_id, "dropped project grant");
        Ok(())
    }

    async fn list_grants(&self, project_id: &str) -> Result<Vec<Grant>, GrantError> {
        let registry = self.lock()?;
        registry.require_project(project_id)?;

        Ok(registry
            .grants
            .iter()
            .filter(|((_, project), _)| project == project_id)
            .map(|((subject, project), perm)| Grant {
                subject: subject.clone(),
                project_id: project.clone(),
                perm: *perm,
            })
            .collect())
    }

    async fn attach_member(
        &self,
        user_id: &str,
        kind: CollectiveKind,
        collective_id: &str,
        perm: Perm,
    ) -> Result<(), GrantError> {
        let mut registry = self.lock()?;
        let collective = Subject::collective(kind, collective_id);
        registry.require_subject(&Subject::User(user_id.to_string()))?;
        registry.require_subject(&collective)?;

        let key = (user_id.to_string(), collective);
        if registry.members.contains_key(&key) {
            return Err(GrantError::AlreadyAssigned);
        }
        registry.members.insert(key, perm);
        debug!(user_id, %kind, collective_id, %perm, "attached member");
        Ok(())
    }

    async fn permit_member(
        &self,
        user_id: &str,
        kind: CollectiveKind,
        collective_id: &str,
        perm: Perm,
    ) -> Result<(), GrantError> {
        let mut registry = self.lock()?;
        let collective = Subject::collective(kind, collective_id);
        registry.require_subject(&Subject::User(user_id.to_string()))?;
        registry.require_subject(&collective)?;

        let slot = registry
            .members
            .get_mut(&(user_id.to_string(), collective))
            .ok_or(GrantError::NotAssigned)?;
        *slot = perm;
        debug!(user_id, %kind, collective_id, %perm, "updated member");
        Ok(())
    }

    async fn drop_member(
        &self,
        user_id: &str,
        kind: CollectiveKind,
        collective_id: &str,
    ) -> Result<(), GrantError> {
        let mut registry = self.lock()?;
        let collective = Subject::collective(kind, collective_id);
        registry.require_subject(&Subject::User(user_id.to_string()))?;
        registry.require_subject(&collective)?;

        registry
            .members
            .remove(&(user_id.to_string(), collective))
            .ok_or(GrantError::NotAssigned)?;
        debug!(user_id, %kind, collective_id, "dropped member");
        Ok(())
    }

    async fn principal(&self, user_id: &str, admin: bool) -> Result<Principal, GrantError> {
        let registry = self.lock()?;
        let user = Subject::User(user_id.to_string());
        registry.require_subject(&user)?;

        let memberships = registry
            .members
            .iter()
            .filter(|((member, _), _)| member == user_id)
            .filter_map(|((_, collective), perm)| {
                let (kind, id) = match collective {
                    Subject::Team(id) => (CollectiveKind::Team, id),
                    Subject::Group(id) => (CollectiveKind::Group, id),
                    Subject::User(_) => return None,
                };
                Some(Membership {
                    kind,
                    id: id.clone(),
                    perm: *perm,
                    projects: registry.grants_of(collective),
                })
            })
            .collect();

        Ok(Principal {
            id: user_id.to_string(),
            admin,
            projects: registry.grants_of(&user),
            memberships,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{resolve, Capability};
    use crate::model::Project;

    fn seeded() -> InMemoryGrantStore {
        let store = InMemoryGrantStore::new();
        store.add_project("p1").expect("project");
        store.add_subject(Subject::User("u1".into())).expect("user");
        store.add_subject(Subject::Team("t1".into())).expect("team");
        store.add_subject(Subject::Group("g1".into())).expect("group");
        store
    }

    #[tokio::test]
    async fn attach_twice_is_already_assigned() {
        let store = seeded();
        let user = Subject::User("u1".into());
        store.attach(&user, "p1", Perm::User).await.expect("attach");

        let err = store
            .attach(&user, "p1", Perm::Owner)
            .await
            .expect_err("second attach");
        assert_eq!(err, GrantError::AlreadyAssigned);
    }

    #[tokio::test]
    async fn permit_and_drop_require_an_edge() {
        let store = seeded();
        let team = Subject::Team("t1".into());

        let err = store
            .permit(&team, "p1", Perm::Admin)
            .await
            .expect_err("permit missing");
        assert_eq!(err, GrantError::NotAssigned);
        let err = store.drop_grant(&team, "p1").await.expect_err("drop missing");
        assert_eq!(err, GrantError::NotAssigned);

        store.attach(&team, "p1", Perm::User).await.expect("attach");
        store.permit(&team, "p1", Perm::Admin).await.expect("permit");
        let grants = store.list_grants("p1").await.expect("list");
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].perm, Perm::Admin);

        store.drop_grant(&team, "p1").await.expect("drop");
        assert!(store.list_grants("p1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn endpoints_are_checked_before_edges() {
        let store = seeded();
        let ghost = Subject::User("ghost".into());

        let err = store
            .attach(&ghost, "p1", Perm::User)
            .await
            .expect_err("unknown user");
        assert_eq!(err, GrantError::SubjectNotFound(ghost));

        let err = store
            .drop_grant(&Subject::User("u1".into()), "nope")
            .await
            .expect_err("unknown project");
        assert_eq!(err, GrantError::ProjectNotFound("nope".into()));
    }

    #[tokio::test]
    async fn membership_edges_follow_the_same_rules() {
        let store = seeded();
        store
            .attach_member("u1", CollectiveKind::Group, "g1", Perm::User)
            .await
            .expect("join");
        let err = store
            .attach_member("u1", CollectiveKind::Group, "g1", Perm::User)
            .await
            .expect_err("join twice");
        assert_eq!(err, GrantError::AlreadyAssigned);

        store
            .permit_member("u1", CollectiveKind::Group, "g1", Perm::Admin)
            .await
            .expect("permit member");
        store
            .drop_member("u1", CollectiveKind::Group, "g1")
            .await
            .expect("leave");
        let err = store
            .drop_member("u1", CollectiveKind::Group, "g1")
            .await
            .expect_err("leave twice");
        assert_eq!(err, GrantError::NotAssigned);
    }

    #[tokio::test]
    async fn principal_collects_group_grants() {
        let store = seeded();
        store
            .attach(&Subject::Group("g1".into()), "p1", Perm::User)
            .await
            .expect("group grant");
        store
            .attach_member("u1", CollectiveKind::Group, "g1", Perm::User)
            .await
            .expect("join");

        let principal = store.principal("u1", false).await.expect("principal");
        assert!(principal.projects.is_empty());
        assert_eq!(principal.memberships.len(), 1);

        let project = Project {
            id: "p1".into(),
            ..Default::default()
        };
        assert!(resolve(&principal, &project, Capability::Show).is_allowed());
        assert!(!resolve(&principal, &project, Capability::Own).is_allowed());
        assert!(!resolve(&principal, &project, Capability::Manage).is_allowed());
    }

    #[tokio::test]
    async fn principal_collects_team_grants() {
        let store = seeded();
        store.add_project("p2").expect("project");
        store
            .attach(&Subject::Team("t1".into()), "p2", Perm::Admin)
            .await
            .expect("team grant");
        store
            .attach_member("u1", CollectiveKind::Team, "t1", Perm::User)
            .await
            .expect("join");

        let principal = store.principal("u1", false).await.expect("principal");
        assert!(principal.projects.is_empty());
        assert_eq!(principal.memberships.len(), 1);
        assert_eq!(principal.memberships[0].kind, CollectiveKind::Team);
        assert_eq!(principal.memberships[0].id, "t1");
        assert_eq!(
            principal.memberships[0].projects,
            vec![ProjectGrant {
                project_id: "p2".into(),
                perm: Perm::Admin,
            }]
        );

        let project = Project {
            id: "p2".into(),
            ..Default::default()
        };
        assert!(resolve(&principal, &project, Capability::Show).is_allowed());
        assert!(!resolve(&principal, &project, Capability::Own).is_allowed());
        assert!(resolve(&principal, &project, Capability::Manage).is_allowed());
    }
}
