use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by row store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowStoreError {
    /// Requested key does not exist.
    #[error("row not found for key: {key}")]
    NotFound { key: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Key/value contract for persisted rows. Rows arrive here already sealed;
/// stores never see plaintext secrets.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Persist a row under a key, overwriting any existing entry.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), RowStoreError>;

    /// Retrieve the row for a key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, RowStoreError>;

    /// Remove a row (idempotent).
    async fn delete(&self, key: &str) -> Result<(), RowStoreError>;

    /// Keys starting with `prefix`, in ascending order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RowStoreError>;
}

/// In-memory row store for tests and smoke runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRowStore {
    inner: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored bytes, for asserting on what actually got persisted.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), RowStoreError> {
        let mut map = self.inner.lock().map_err(|err| RowStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, RowStoreError> {
        let map = self.inner.lock().map_err(|err| RowStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        map.get(key).cloned().ok_or_else(|| RowStoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), RowStoreError> {
        let mut map = self.inner.lock().map_err(|err| RowStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RowStoreError> {
        let map = self.inner.lock().map_err(|err| RowStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
