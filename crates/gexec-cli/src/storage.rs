use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Result};
use dirs::data_dir;
use gexec_records::SealedRepository;
use gexec_storage::{EnvelopeCipher, FileRowStore};
use tracing::debug;

use crate::config::Config;

pub type Repository = SealedRepository<FileRowStore, EnvelopeCipher>;

/// Resolve the default data directory for gexec.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("gexec"))
}

/// Build the field cipher from the configured passphrase. Any key problem is
/// fatal here, before a single row is touched.
pub fn cipher_from_config(config: &Config) -> Result<EnvelopeCipher> {
    let value = config.encrypt.passphrase.as_deref().unwrap_or_default();
    let cipher =
        EnvelopeCipher::from_config_value(value).wrap_err("invalid encryption configuration")?;
    debug!(bits = cipher.bits(), "cipher initialized");
    Ok(cipher)
}

pub fn row_store_from_config(config: &Config) -> Result<FileRowStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing row store");
    Ok(FileRowStore::new(root))
}

pub fn repository_from_config(config: &Config) -> Result<Repository> {
    Ok(SealedRepository::new(
        row_store_from_config(config)?,
        cipher_from_config(config)?,
    ))
}
