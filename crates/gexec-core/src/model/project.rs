use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root of the grant graph; every other entity is scoped to one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            slug: slug.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
