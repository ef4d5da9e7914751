//! Entities of a gexec project. Types owning secret material implement
//! [`SecretCarrier`](crate::secret::SecretCarrier) over their own fields; the
//! relation-following impls live in [`crate::cascade`].

mod credential;
mod environment;
mod inventory;
mod project;
mod repository;
mod runner;
mod template;

pub use credential::{Credential, CredentialAuth, CredentialLogin, CredentialShell};
pub use environment::{Environment, EnvironmentSecret, EnvironmentValue};
pub use inventory::Inventory;
pub use project::Project;
pub use repository::Repository;
pub use runner::Runner;
pub use template::{Template, TemplateSurvey, TemplateValue, TemplateVault};

/// Generate a fresh lowercase identifier for a new row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
