use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Credential, Environment, Inventory, Repository};

/// Playbook definition tying a repository, inventory and environment together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub path: String,
    pub arguments: String,
    pub limit: String,
    pub executor: String,
    pub branch: String,
    pub r#override: bool,
    #[serde(default)]
    pub surveys: Vec<TemplateSurvey>,
    #[serde(default)]
    pub vaults: Vec<TemplateVault>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Prompt shown before an execution; its values are plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSurvey {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub required: bool,
    #[serde(default)]
    pub values: Vec<TemplateValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateValue {
    pub id: String,
    pub survey_id: String,
    pub name: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vault password source. `script` is not secret; the referenced credential is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVault {
    pub id: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    pub name: String,
    pub kind: String,
    pub script: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
