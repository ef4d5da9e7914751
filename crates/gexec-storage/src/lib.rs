//! Concrete storage pieces for gexec: the AES-GCM envelope cipher keyed by the
//! operator passphrase, and a file-backed row store.

pub mod envelope;
pub mod file_store;
pub mod passphrase;

pub use envelope::EnvelopeCipher;
pub use file_store::FileRowStore;
pub use passphrase::{KeyError, Passphrase};
