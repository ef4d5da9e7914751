use std::{fmt, fs};

use base64::{engine::general_purpose, Engine as _};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use thiserror::Error;

/// Accepted raw key lengths in bytes (AES-128, AES-192, AES-256).
pub const KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Length of passphrases produced by [`Passphrase::generate`].
const GENERATED_LEN: usize = 32;

/// Configuration errors for the encryption passphrase. These are fatal at
/// startup and never surface per request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("encryption passphrase must be 16, 24 or 32 bytes, got {0}")]
    InvalidLength(usize),
    #[error("no encryption passphrase configured")]
    Missing,
    #[error("decode error: {0}")]
    Decode(String),
}

/// Operator-supplied passphrase, used directly as the AES key (no KDF).
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase {
    bytes: Vec<u8>,
}

impl Passphrase {
    /// Validate raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let bytes = bytes.into();
        if !KEY_LENGTHS.contains(&bytes.len()) {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        Ok(Self { bytes })
    }

    /// Resolve a configured value: `file://<path>` reads the file verbatim,
    /// `base64://<data>` decodes the data, anything else is used literally.
    pub fn resolve(value: &str) -> Result<Self, KeyError> {
        if value.is_empty() {
            return Err(KeyError::Missing);
        }

        let bytes = if let Some(path) = value.strip_prefix("file://") {
            fs::read(path).map_err(|e| KeyError::Decode(format!("failed to read {path}: {e}")))?
        } else if let Some(data) = value.strip_prefix("base64://") {
            general_purpose::STANDARD
                .decode(data)
                .map_err(|e| KeyError::Decode(e.to_string()))?
        } else {
            value.as_bytes().to_vec()
        };

        Self::new(bytes)
    }

    /// Random alphanumeric passphrase suitable for a fresh config.
    pub fn generate() -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(GENERATED_LEN)
            .map(char::from)
            .collect()
    }

    pub fn bits(&self) -> usize {
        self.bytes.len() * 8
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passphrase")
            .field("bits", &self.bits())
            .finish()
    }
}
