use std::{collections::HashMap, path::{Path, PathBuf}, sync::Arc};

use tokio::sync::Mutex;

use crate::{ArchiveError, DATA_DIR};

/// Durable string key-value storage the archive is persisted into.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ArchiveError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), ArchiveError>;
}

/**
 * FileStore keeps one file per key inside a data directory.
 */
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The `data/` directory under the project root.
    pub fn in_project_data_dir() -> Result<Self, ArchiveError> {
        let root: PathBuf = project_root::get_project_root()
            .map_err(|err| ArchiveError::Storage(format!("Failed to locate project root: {err}")))?;
        Ok(Self::new(root.join(DATA_DIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are namespaced with dots, keep them filesystem safe
        let file_name: String = key.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ArchiveError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ArchiveError::Storage(format!("Failed to read {:?}: {err}", path))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ArchiveError> {
        // Create dir if it doesn't exist
        if !self.dir.exists() {
            tokio::fs::create_dir_all(&self.dir).await
                .map_err(|err| ArchiveError::Storage(format!("Failed to create data directory {:?}: {err}", self.dir)))?;
        }

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, value).await
            .map_err(|err| ArchiveError::Storage(format!("Failed to write {:?}: {err}", tmp_path)))?;
        tokio::fs::rename(&tmp_path, &path).await
            .map_err(|err| ArchiveError::Storage(format!("Failed to replace {:?}: {err}", path)))?;

        Ok(())
    }
}

/// In-process store, nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ArchiveError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ArchiveError> {
        self.values.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage that is always down. Counts the attempts made against it.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct FailingStore {
    pub(crate) attempts: Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl FailingStore {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn fail<T>(&self, action: &str, key: &str) -> Result<T, ArchiveError> {
        self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(ArchiveError::Storage(format!("Failed to {action} {key}: disk unavailable")))
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ArchiveError> {
        self.fail("read", key)
    }

    async fn set(&self, key: &str, _value: &str) -> Result<(), ArchiveError> {
        self.fail("write", key)
    }
}
