use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::{redact, seal_field, unseal_field, CipherError, FieldCipher, SecretCarrier};

/// Stored credential of a project, used by repositories, inventories and vaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub project_id: String,
    pub slug: String,
    pub name: String,
    pub r#override: bool,
    /// Active authentication variant, tagged by `kind` on the wire.
    #[serde(flatten)]
    pub auth: CredentialAuth,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn kind(&self) -> &'static str {
        self.auth.kind()
    }
}

/// Authentication material of a credential. Only the variant matching the kind
/// exists, so there is no stale data for an inactive kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CredentialAuth {
    #[default]
    Empty,
    Shell(CredentialShell),
    Login(CredentialLogin),
}

impl CredentialAuth {
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialAuth::Empty => "empty",
            CredentialAuth::Shell(_) => "shell",
            CredentialAuth::Login(_) => "login",
        }
    }
}

/// Shell access: username plus password and/or private key.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialShell {
    pub username: String,
    pub password: String,
    pub private_key: String,
}

/// Login access: username and password.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialLogin {
    pub username: String,
    pub password: String,
}

impl SecretCarrier for CredentialShell {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        seal_field(cipher, &mut self.password)?;
        seal_field(cipher, &mut self.private_key)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        unseal_field(cipher, &mut self.password)?;
        unseal_field(cipher, &mut self.private_key)
    }
}

impl SecretCarrier for CredentialLogin {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        seal_field(cipher, &mut self.password)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        unseal_field(cipher, &mut self.password)
    }
}

impl SecretCarrier for CredentialAuth {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        match self {
            CredentialAuth::Empty => Ok(()),
            CredentialAuth::Shell(shell) => shell.seal(cipher),
            CredentialAuth::Login(login) => login.seal(cipher),
        }
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        match self {
            CredentialAuth::Empty => Ok(()),
            CredentialAuth::Shell(shell) => shell.unseal(cipher),
            CredentialAuth::Login(login) => login.unseal(cipher),
        }
    }
}

impl SecretCarrier for Credential {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.auth.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.auth.unseal(cipher)
    }
}

impl fmt::Debug for CredentialShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialShell")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("private_key", &redact(&self.private_key))
            .finish()
    }
}

impl fmt::Debug for CredentialLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialLogin")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::MaskingCipher;

    fn shell() -> Credential {
        Credential {
            id: "c1".into(),
            project_id: "p1".into(),
            slug: "deploy".into(),
            name: "Deploy".into(),
            auth: CredentialAuth::Shell(CredentialShell {
                username: "root".into(),
                password: "s3cret".into(),
                private_key: "-----BEGIN KEY-----".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn shell_seals_both_fields_and_keeps_username() {
        let mut cred = shell();
        cred.seal(&MaskingCipher).expect("seal");

        let CredentialAuth::Shell(sealed) = &cred.auth else {
            panic!("kind changed");
        };
        assert_eq!(sealed.username, "root");
        assert_ne!(sealed.password, "s3cret");
        assert_ne!(sealed.private_key, "-----BEGIN KEY-----");

        cred.unseal(&MaskingCipher).expect("unseal");
        assert_eq!(cred, shell());
    }

    #[test]
    fn login_seals_password() {
        let mut cred = Credential {
            auth: CredentialAuth::Login(CredentialLogin {
                username: "bot".into(),
                password: "pw".into(),
            }),
            ..Default::default()
        };
        cred.seal(&MaskingCipher).expect("seal");
        let CredentialAuth::Login(login) = &cred.auth else {
            panic!("kind changed");
        };
        assert_eq!(login.username, "bot");
        assert_ne!(login.password, "pw");
    }

    #[test]
    fn empty_kind_is_a_no_op() {
        let mut cred = Credential::default();
        cred.seal(&MaskingCipher).expect("seal");
        assert_eq!(cred, Credential::default());
    }

    #[test]
    fn wire_form_is_tagged_by_kind() {
        let json = serde_json::to_value(shell()).expect("serialize");
        assert_eq!(json["kind"], "shell");
        assert_eq!(json["username"], "root");
        assert_eq!(json["override"], false);
        assert!(json.get("login").is_none());

        let back: Credential = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, shell());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let out = format!("{:?}", shell());
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("s3cret"));
        assert!(!out.contains("BEGIN KEY"));
    }
}
