use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gexec_core::rows::{RowStore, RowStoreError};
use tempfile::NamedTempFile;
use tracing::instrument;

/// File-backed row store: one file per key, written atomically via a temp file.
/// Row contents are stored as given; secret fields arrive already sealed.
pub struct FileRowStore {
    root: PathBuf,
}

impl FileRowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(encode_key(key))
    }
}

#[async_trait]
impl RowStore for FileRowStore {
    #[instrument(skip_all, fields(key))]
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), RowStoreError> {
        fs::create_dir_all(&self.root).map_err(storage_err)?;
        write_row(&self.path_for(key), value)
    }

    #[instrument(skip_all, fields(key))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, RowStoreError> {
        read_row(&self.path_for(key), key)
    }

    #[instrument(skip_all, fields(key))]
    async fn delete(&self, key: &str) -> Result<(), RowStoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(err)),
        }
    }

    #[instrument(skip_all, fields(prefix))]
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RowStoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(storage_err(err)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(storage_err)?;
            // Temp files and foreign files do not decode; skip them.
            let Some(key) = entry.file_name().to_str().and_then(decode_key) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn write_row(path: &Path, value: &[u8]) -> Result<(), RowStoreError> {
    let parent = path.parent().ok_or_else(|| RowStoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(value).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn read_row(path: &Path, key: &str) -> Result<Vec<u8>, RowStoreError> {
    let mut file = File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            RowStoreError::NotFound {
                key: key.to_string(),
            }
        } else {
            storage_err(err)
        }
    })?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    Ok(buf)
}

fn encode_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(name).ok()?;
    String::from_utf8(bytes).ok()
}

fn storage_err<E: ToString>(err: E) -> RowStoreError {
    RowStoreError::Storage {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use gexec_core::rows::RowStore;

    use super::*;

    #[tokio::test]
    async fn round_trip_writes_one_file_per_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRowStore::new(dir.path());

        store.put("runner/r1", b"{\"token\":\"x\"}").await.expect("put");
        assert_eq!(
            store.get("runner/r1").await.expect("get"),
            b"{\"token\":\"x\"}"
        );
        assert!(store.path_for("runner/r1").exists());
    }

    #[tokio::test]
    async fn keys_are_filtered_by_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRowStore::new(dir.path());
        store.put("runner/b", b"2").await.expect("put");
        store.put("runner/a", b"1").await.expect("put");
        store.put("template/c", b"3").await.expect("put");

        assert_eq!(
            store.keys("runner/").await.expect("keys"),
            vec!["runner/a".to_string(), "runner/b".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRowStore::new(dir.path().join("absent"));
        assert!(store.keys("").await.expect("keys").is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRowStore::new(dir.path());
        let key = "k";
        store.put(key, b"v").await.expect("put");
        store.delete(key).await.expect("delete");
        store.delete(key).await.expect("delete again");

        let err = store.get(key).await.expect_err("should be missing");
        assert!(matches!(err, RowStoreError::NotFound { .. }));
    }
}
