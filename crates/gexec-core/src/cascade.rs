//! Cascading seal/unseal over an already loaded entity graph.
//!
//! Each composite entity lists its relations explicitly. Only relations that are
//! loaded in memory are visited; nothing here triggers a load or does I/O.
//!
//! Relation set:
//! - repository -> credential
//! - inventory -> repository, credential, become credential
//! - environment -> secrets, values
//! - template -> repository, inventory, environment, surveys -> values, vaults -> credential

use crate::model::{
    Environment, Inventory, Repository, Template, TemplateSurvey, TemplateValue, TemplateVault,
};
use crate::secret::{CipherError, FieldCipher, SecretCarrier};

impl SecretCarrier for Repository {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.credential.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.credential.unseal(cipher)
    }
}

impl SecretCarrier for Inventory {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.repository.seal(cipher)?;
        self.credential.seal(cipher)?;
        self.become_credential.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.repository.unseal(cipher)?;
        self.credential.unseal(cipher)?;
        self.become_credential.unseal(cipher)
    }
}

impl SecretCarrier for Environment {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.secrets.seal(cipher)?;
        self.values.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.secrets.unseal(cipher)?;
        self.values.unseal(cipher)
    }
}

/// Survey values hold no secrets.
impl SecretCarrier for TemplateValue {
    fn seal(&mut self, _: &dyn FieldCipher) -> Result<(), CipherError> {
        Ok(())
    }

    fn unseal(&mut self, _: &dyn FieldCipher) -> Result<(), CipherError> {
        Ok(())
    }
}

impl SecretCarrier for TemplateSurvey {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.values.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.values.unseal(cipher)
    }
}

impl SecretCarrier for TemplateVault {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.credential.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.credential.unseal(cipher)
    }
}

impl SecretCarrier for Template {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.repository.seal(cipher)?;
        self.inventory.seal(cipher)?;
        self.environment.seal(cipher)?;
        self.surveys.seal(cipher)?;
        self.vaults.seal(cipher)
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.repository.unseal(cipher)?;
        self.inventory.unseal(cipher)?;
        self.environment.unseal(cipher)?;
        self.surveys.unseal(cipher)?;
        self.vaults.unseal(cipher)
    }
}
