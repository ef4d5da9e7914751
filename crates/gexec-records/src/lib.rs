//! Typed records persisted through a [`RowStore`], sealed on the way in and
//! unsealed on the way out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gexec_core::{
    model::{
        new_id, Credential, Environment, EnvironmentSecret, EnvironmentValue, Inventory,
        Repository, Runner, Template,
    },
    rows::{RowStore, RowStoreError},
    secret::{CipherError, FieldCipher, SecretCarrier},
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record not found: {id}")]
    NotFound { id: String },
    #[error("record already exists: {id}")]
    AlreadyExists { id: String },
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Storage(#[from] RowStoreError),
    #[error("record encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A persisted entity: serializable, carries secrets, addressed by id.
pub trait Record: SecretCarrier + Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Key prefix shared by every row of this kind.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn stamp(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);
    fn created_at(&self) -> DateTime<Utc>;
}

macro_rules! impl_record {
    ($($ty:ty => $kind:literal),+ $(,)?) => {
        $(
            impl Record for $ty {
                const KIND: &'static str = $kind;

                fn id(&self) -> &str {
                    &self.id
                }

                fn set_id(&mut self, id: String) {
                    self.id = id;
                }

                fn stamp(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
                    self.created_at = created_at;
                    self.updated_at = updated_at;
                }

                fn created_at(&self) -> DateTime<Utc> {
                    self.created_at
                }
            }
        )+
    };
}

impl_record! {
    Credential => "credential",
    Repository => "repository",
    Inventory => "inventory",
    Environment => "environment",
    EnvironmentSecret => "environment_secret",
    EnvironmentValue => "environment_value",
    Template => "template",
    Runner => "runner",
}

fn row_key<T: Record>(id: &str) -> String {
    format!("{}/{}", T::KIND, id)
}

/// Record repository over any row store and field cipher.
///
/// Only sealed copies reach the store; callers always see plaintext.
pub struct SealedRepository<S: RowStore, C: FieldCipher> {
    store: Arc<S>,
    cipher: Arc<C>,
}

impl<S: RowStore, C: FieldCipher> Clone for SealedRepository<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cipher: Arc::clone(&self.cipher),
        }
    }
}

impl<S: RowStore, C: FieldCipher> SealedRepository<S, C> {
    pub fn new(store: S, cipher: C) -> Self {
        Self {
            store: Arc::new(store),
            cipher: Arc::new(cipher),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    /// Persist a new record. An empty id is replaced with a generated one; an
    /// id that is already taken fails with `AlreadyExists`.
    #[instrument(skip_all, fields(kind = T::KIND, id))]
    pub async fn create<T: Record>(&self, mut record: T) -> Result<T, RecordError> {
        if record.id().is_empty() {
            record.set_id(new_id());
        }
        tracing::Span::current().record("id", record.id());

        match self.store.get(&row_key::<T>(record.id())).await {
            Ok(_) => {
                return Err(RecordError::AlreadyExists {
                    id: record.id().to_string(),
                })
            }
            Err(RowStoreError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        let now = Utc::now();
        record.stamp(now, now);
        self.write(&record).await?;
        debug!("record created");
        Ok(record)
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn show<T: Record>(&self, id: &str) -> Result<T, RecordError> {
        let bytes = match self.store.get(&row_key::<T>(id)).await {
            Ok(bytes) => bytes,
            Err(RowStoreError::NotFound { .. }) => {
                return Err(RecordError::NotFound { id: id.to_string() })
            }
            Err(err) => return Err(err.into()),
        };

        let mut record: T = serde_json::from_slice(&bytes)?;
        record.unseal(self.cipher.as_ref())?;
        Ok(record)
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn list<T: Record>(&self) -> Result<Vec<T>, RecordError> {
        let prefix = format!("{}/", T::KIND);
        let keys = self.store.keys(&prefix).await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in &keys {
            let mut record: T = serde_json::from_slice(&self.store.get(key).await?)?;
            record.unseal(self.cipher.as_ref())?;
            records.push(record);
        }
        debug!(count = records.len(), "records listed");
        Ok(records)
    }

    /// Load, unseal, apply `mutate` to the plaintext, then seal and persist.
    /// The id and creation time survive the mutation.
    #[instrument(skip(self, mutate), fields(kind = T::KIND))]
    pub async fn update<T, F>(&self, id: &str, mutate: F) -> Result<T, RecordError>
    where
        T: Record,
        F: FnOnce(&mut T) + Send,
    {
        let mut record: T = self.show(id).await?;
        let created_at = record.created_at();
        mutate(&mut record);
        record.set_id(id.to_string());
        record.stamp(created_at, Utc::now());

        self.write(&record).await?;
        debug!("record updated");
        Ok(record)
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn delete<T: Record>(&self, id: &str) -> Result<(), RecordError> {
        let key = row_key::<T>(id);
        match self.store.get(&key).await {
            Ok(_) => {}
            Err(RowStoreError::NotFound { .. }) => {
                return Err(RecordError::NotFound { id: id.to_string() })
            }
            Err(err) => return Err(err.into()),
        }
        self.store.delete(&key).await?;
        debug!("record deleted");
        Ok(())
    }

    async fn write<T: Record>(&self, record: &T) -> Result<(), RecordError> {
        let mut sealed = record.clone();
        sealed.seal(self.cipher.as_ref())?;
        let bytes = serde_json::to_vec(&sealed)?;
        self.store.put(&row_key::<T>(record.id()), &bytes).await?;
        Ok(())
    }
}
