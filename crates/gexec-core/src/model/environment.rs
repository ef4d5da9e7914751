use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::{redact, seal_field, unseal_field, CipherError, FieldCipher, SecretCarrier};

/// Named set of secrets and values injected into executions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub project_id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub secrets: Vec<EnvironmentSecret>,
    #[serde(default)]
    pub values: Vec<EnvironmentValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSecret {
    pub id: String,
    pub environment_id: String,
    pub kind: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentValue {
    pub id: String,
    pub environment_id: String,
    pub kind: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretCarrier for EnvironmentSecret {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        seal_field(cipher, &mut self.content)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        unseal_field(cipher, &mut self.content)
    }
}

impl SecretCarrier for EnvironmentValue {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        seal_field(cipher, &mut self.content)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        unseal_field(cipher, &mut self.content)
    }
}

impl fmt::Debug for EnvironmentSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSecret")
            .field("id", &self.id)
            .field("environment_id", &self.environment_id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("content", &redact(&self.content))
            .finish()
    }
}

impl fmt::Debug for EnvironmentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentValue")
            .field("id", &self.id)
            .field("environment_id", &self.environment_id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("content", &redact(&self.content))
            .finish()
    }
}
