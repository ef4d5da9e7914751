//! AES-GCM envelope for individual secret fields.
//!
//! Persisted form: `base64(nonce || ciphertext || tag)` with a 12-byte nonce
//! drawn from the OS CSPRNG on every call. Empty strings are never sealed.

use std::fmt;

use aes_gcm::{
    aead::{consts::U12, Aead, AeadCore, KeyInit, Nonce, OsRng},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use gexec_core::secret::{CipherError, FieldCipher};
use tracing::debug;

use crate::passphrase::{KeyError, Passphrase};

/// Standard GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length.
const TAG_LEN: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

enum Engine {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// Field cipher keyed directly by the configured passphrase.
pub struct EnvelopeCipher {
    engine: Engine,
    bits: usize,
}

impl EnvelopeCipher {
    pub fn new(passphrase: &Passphrase) -> Result<Self, KeyError> {
        let key = passphrase.as_bytes();
        let engine = match key.len() {
            16 => Engine::Aes128(Aes128Gcm::new_from_slice(key).map_err(invalid_key)?),
            24 => Engine::Aes192(Aes192Gcm::new_from_slice(key).map_err(invalid_key)?),
            32 => Engine::Aes256(Aes256Gcm::new_from_slice(key).map_err(invalid_key)?),
            other => return Err(KeyError::InvalidLength(other)),
        };

        debug!(bits = passphrase.bits(), "envelope cipher ready");
        Ok(Self {
            engine,
            bits: passphrase.bits(),
        })
    }

    /// Resolve a configured passphrase value and build the cipher from it.
    pub fn from_config_value(value: &str) -> Result<Self, KeyError> {
        Self::new(&Passphrase::resolve(value)?)
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl FieldCipher for EnvelopeCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let blob = match &self.engine {
            Engine::Aes128(aead) => seal_with(aead, plaintext.as_bytes()),
            Engine::Aes192(aead) => seal_with(aead, plaintext.as_bytes()),
            Engine::Aes256(aead) => seal_with(aead, plaintext.as_bytes()),
        }?;

        Ok(STANDARD.encode(blob))
    }

    fn decrypt(&self, blob: &str) -> Result<String, CipherError> {
        if blob.is_empty() {
            return Ok(String::new());
        }

        let raw = STANDARD
            .decode(blob)
            .map_err(|e| CipherError::MalformedCiphertext {
                reason: format!("base64 decode failed: {e}"),
            })?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::MalformedCiphertext {
                reason: format!("ciphertext too short: {} bytes", raw.len()),
            });
        }

        let (nonce, body) = raw.split_at(NONCE_LEN);
        let plaintext = match &self.engine {
            Engine::Aes128(aead) => open_with(aead, nonce, body),
            Engine::Aes192(aead) => open_with(aead, nonce, body),
            Engine::Aes256(aead) => open_with(aead, nonce, body),
        }?;

        String::from_utf8(plaintext).map_err(|e| CipherError::MalformedCiphertext {
            reason: format!("plaintext is not utf-8: {e}"),
        })
    }
}

fn seal_with<A: Aead + AeadCore>(aead: &A, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let nonce = A::generate_nonce(&mut OsRng);
    let sealed = aead
        .encrypt(&nonce, plaintext)
        .map_err(|e| CipherError::Seal {
            reason: format!("encrypt failed: {e}"),
        })?;

    let mut blob = Vec::with_capacity(nonce.len() + sealed.len());
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

fn open_with<A: Aead>(aead: &A, nonce: &[u8], body: &[u8]) -> Result<Vec<u8>, CipherError> {
    aead.decrypt(Nonce::<A>::from_slice(nonce), body)
        .map_err(|_| CipherError::WrongPassphrase)
}

fn invalid_key<E: fmt::Display>(err: E) -> KeyError {
    KeyError::Decode(format!("cipher init failed: {err}"))
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCipher")
            .field("bits", &self.bits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_16: &str = "0123456789abcdef";
    const KEY_24: &str = "0123456789abcdef01234567";
    const KEY_32: &str = "0123456789abcdef0123456789abcdef";

    fn cipher(key: &str) -> EnvelopeCipher {
        EnvelopeCipher::from_config_value(key).expect("valid key")
    }

    #[test]
    fn round_trips_for_every_key_length() {
        let long = "x".repeat(4096);
        let samples: [&str; 5] = ["", "a", "hunter2", "pässwörd 🔐 秘密", long.as_str()];
        for key in [KEY_16, KEY_24, KEY_32] {
            let cipher = cipher(key);
            for plaintext in samples {
                let sealed = cipher.encrypt(plaintext).expect("encrypt");
                assert_eq!(cipher.decrypt(&sealed).expect("decrypt"), plaintext);
            }
        }
    }

    #[test]
    fn empty_plaintext_is_never_sealed() {
        let cipher = cipher(KEY_32);
        assert_eq!(cipher.encrypt("").expect("encrypt"), "");
        assert_eq!(cipher.decrypt("").expect("decrypt"), "");
    }

    #[test]
    fn blob_layout_is_nonce_then_sealed_body() {
        let cipher = cipher(KEY_32);
        let sealed = cipher.encrypt("abc").expect("encrypt");
        let raw = STANDARD.decode(&sealed).expect("standard base64");
        assert_eq!(raw.len(), NONCE_LEN + 3 + TAG_LEN);
    }

    #[test]
    fn same_plaintext_gets_fresh_ciphertext() {
        let cipher = cipher(KEY_32);
        let first = cipher.encrypt("same").expect("encrypt");
        let second = cipher.encrypt("same").expect("encrypt");
        assert_ne!(first, second);

        let nonce_a = &STANDARD.decode(&first).expect("decode")[..NONCE_LEN];
        let nonce_b = &STANDARD.decode(&second).expect("decode")[..NONCE_LEN];
        assert_ne!(nonce_a, nonce_b);
    }

    #[test]
    fn any_flipped_bit_fails_authentication() {
        let cipher = cipher(KEY_24);
        let raw = STANDARD
            .decode(cipher.encrypt("tamper me").expect("encrypt"))
            .expect("decode");

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let err = cipher
                    .decrypt(&STANDARD.encode(&tampered))
                    .expect_err("tampered blob must not open");
                assert_eq!(err, CipherError::WrongPassphrase, "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn other_keys_never_open_the_blob() {
        let sealed = cipher(KEY_32).encrypt("secret").expect("encrypt");
        let others = [
            KEY_16,
            KEY_24,
            "fedcba9876543210fedcba9876543210",
            "0123456789abcdef0123456789abcdeF",
        ];
        for key in others {
            assert_eq!(
                cipher(key).decrypt(&sealed),
                Err(CipherError::WrongPassphrase),
                "key {key}"
            );
        }
    }

    #[test]
    fn structural_damage_is_malformed() {
        let cipher = cipher(KEY_16);

        let err = cipher.decrypt("not base64!").expect_err("bad encoding");
        assert!(matches!(err, CipherError::MalformedCiphertext { .. }));

        let short = STANDARD.encode([0u8; NONCE_LEN + TAG_LEN - 1]);
        let err = cipher.decrypt(&short).expect_err("too short");
        assert!(matches!(err, CipherError::MalformedCiphertext { .. }));
    }

    #[test]
    fn invalid_key_length_fails_at_construction() {
        let err = EnvelopeCipher::from_config_value("short").expect_err("bad key");
        assert_eq!(err, KeyError::InvalidLength(5));
    }
}
