use std::fmt::Write as _;

use thiserror::Error;

/// Errors produced while sealing or unsealing a secret field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Authentication tag mismatch: wrong passphrase, or a tampered/corrupted blob.
    #[error("wrong encryption passphrase")]
    WrongPassphrase,
    /// Stored value is structurally invalid (bad encoding, truncated).
    #[error("malformed ciphertext: {reason}")]
    MalformedCiphertext { reason: String },
    /// Sealing itself failed (randomness or AEAD failure).
    #[error("seal failed: {reason}")]
    Seal { reason: String },
}

/// Per-field encryption contract used by every secret carrier.
///
/// Implementations must treat the empty string as "no secret": encrypting `""`
/// returns `""` and decrypting `""` returns `""` without touching the primitive.
pub trait FieldCipher: Send + Sync {
    /// Seal one plaintext into its persisted string form.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Open one persisted string back into plaintext.
    fn decrypt(&self, blob: &str) -> Result<String, CipherError>;
}

/// An entity owning secret fields, directly or through loaded relations.
///
/// `seal` runs right before a write, `unseal` right after a read. The two must
/// strictly alternate: sealing an already sealed entity encrypts the ciphertext
/// again and the original secret can no longer be recovered by one `unseal`.
pub trait SecretCarrier {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError>;

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError>;
}

/// Relations that are not loaded are skipped.
impl<T: SecretCarrier> SecretCarrier for Option<T> {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        match self {
            Some(inner) => inner.seal(cipher),
            None => Ok(()),
        }
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        match self {
            Some(inner) => inner.unseal(cipher),
            None => Ok(()),
        }
    }
}

impl<T: SecretCarrier> SecretCarrier for Vec<T> {
    fn seal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.iter_mut().try_for_each(|row| row.seal(cipher))
    }

    fn unseal(&mut self, cipher: &dyn FieldCipher) -> Result<(), CipherError> {
        self.iter_mut().try_for_each(|row| row.unseal(cipher))
    }
}

/// Replace a plaintext field with its sealed form. Every call draws its own nonce.
pub fn seal_field(cipher: &dyn FieldCipher, field: &mut String) -> Result<(), CipherError> {
    *field = cipher.encrypt(field)?;
    Ok(())
}

/// Replace a sealed field with its plaintext.
pub fn unseal_field(cipher: &dyn FieldCipher, field: &mut String) -> Result<(), CipherError> {
    *field = cipher.decrypt(field)?;
    Ok(())
}

/// Placeholder shown instead of secret values in debug output.
pub(crate) fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

/// Reversible masking cipher for tests and smoke runs.
/// This is not cryptographically secure; production code must use the AES-GCM
/// envelope cipher from `gexec-storage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskingCipher;

const MASK_BYTE: u8 = 0xA5;
const MASK_PREFIX: &str = "masked:";

impl FieldCipher for MaskingCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::from(MASK_PREFIX);
        for byte in plaintext.bytes() {
            let _ = write!(out, "{:02x}", byte ^ MASK_BYTE);
        }
        Ok(out)
    }

    fn decrypt(&self, blob: &str) -> Result<String, CipherError> {
        if blob.is_empty() {
            return Ok(String::new());
        }

        let hex = blob
            .strip_prefix(MASK_PREFIX)
            .ok_or_else(|| CipherError::MalformedCiphertext {
                reason: "missing mask prefix".to_string(),
            })?;

        if !hex.is_ascii() || hex.len() % 2 != 0 {
            return Err(CipherError::MalformedCiphertext {
                reason: "payload is not a hex string".to_string(),
            });
        }

        let bytes = hex
            .as_bytes()
            .chunks(2)
            .map(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                    .map(|b| b ^ MASK_BYTE)
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| CipherError::MalformedCiphertext {
                reason: "payload is not a hex string".to_string(),
            })?;

        String::from_utf8(bytes).map_err(|e| CipherError::MalformedCiphertext {
            reason: e.to_string(),
        })
    }
}
