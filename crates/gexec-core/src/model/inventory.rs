use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Credential, Repository};

/// Host inventory. `credential` authenticates against hosts, `become_credential`
/// is used for privilege escalation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub become_id: Option<String>,
    #[serde(rename = "become", default, skip_serializing_if = "Option::is_none")]
    pub become_credential: Option<Credential>,
    pub slug: String,
    pub name: String,
    pub kind: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
