use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::{redact, seal_field, unseal_field, CipherError, FieldCipher, SecretCarrier};

/// Execution runner; global when `project_id` is absent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub slug: String,
    pub name: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Runner {
    pub fn is_global(&self) -> bool {
        self.project_id.is_none()
    }
}

impl SecretCarrier for Runner {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        seal_field(cipher, &mut self.token)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        unseal_field(cipher, &mut self.token)
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.id)
            .field("project_id", &self.project_id)
            .field("slug", &self.slug)
            .field("name", &self.name)
            .field("token", &redact(&self.token))
            .finish()
    }
}
