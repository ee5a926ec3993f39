//! Snapshot persistence used by the library service.
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::repos::error::RepoError;
use crate::repos::snapshot::LibrarySnapshot;

/// Whole-catalog load/save.
///
/// Implementations must be cheap to share (`Arc<dyn SnapshotStore>`).
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Backend name, for logging.
    fn backend_name(&self) -> &'static str;

    /// Returns the persisted catalog. Never fails: unreadable state degrades to empty.
    async fn load(&self) -> LibrarySnapshot;

    async fn save(&self, snapshot: &LibrarySnapshot) -> Result<(), RepoError>;
}

/// Pretty-printed JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<(), RepoError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    async fn read(&self) -> Result<Option<LibrarySnapshot>, RepoError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> LibrarySnapshot {
        match self.read().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                // First run: materialise an empty catalog so the path is known-good.
                let empty = LibrarySnapshot::default();
                if let Err(err) = self.save(&empty).await {
                    tracing::warn!(path = %self.path.display(), error = %err, "failed to initialise snapshot");
                }
                empty
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to load snapshot, using empty catalog"
                );
                LibrarySnapshot::default()
            }
        }
    }

    async fn save(&self, snapshot: &LibrarySnapshot) -> Result<(), RepoError> {
        let result = async {
            self.ensure_parent().await?;
            let bytes = serde_json::to_vec_pretty(snapshot)?;
            tokio::fs::write(&self.path, bytes).await?;
            Ok::<_, RepoError>(())
        }
        .await;

        if let Err(err) = &result {
            tracing::error!(path = %self.path.display(), error = %err, "failed to save snapshot");
        }
        result
    }
}

/// In-process store; keeps the last saved snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<LibrarySnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new(initial: LibrarySnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn current(&self) -> LibrarySnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> LibrarySnapshot {
        self.current()
    }

    async fn save(&self, snapshot: &LibrarySnapshot) -> Result<(), RepoError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        Ok(())
    }
}
