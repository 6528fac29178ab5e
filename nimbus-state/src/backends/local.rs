//! Local file backend
//!
//! Stores state in a JSON file (default `nimbus.state.json`) next to a
//! `.lock` file holding the [`LockInfo`] of the current writer.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::fs;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "nimbus.state.json";

    pub fn with_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        match config.attributes.get("path") {
            None => Ok(Self::with_path(Self::DEFAULT_STATE_FILE)),
            Some(value) => value
                .as_str()
                .filter(|p| !p.is_empty())
                .map(Self::with_path)
                .ok_or_else(|| {
                    BackendError::configuration("local backend 'path' must be a non-empty string")
                }),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Lock currently on disk; `None` when absent or unreadable
    async fn current_lock(&self) -> BackendResult<Option<LockInfo>> {
        match fs::read_to_string(&self.lock_path).await {
            Ok(content) => Ok(serde_json::from_str(&content).ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::Io(format!("Failed to read lock file: {}", e))),
        }
    }

    async fn remove_lock_file(&self) -> BackendResult<()> {
        fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Io(format!("Failed to read state file: {}", e))),
        };

        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;
        if state.version > StateFile::CURRENT_VERSION {
            return Err(BackendError::InvalidState(format!(
                "state file version {} is newer than supported version {}",
                state.version,
                StateFile::CURRENT_VERSION
            )));
        }

        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(existing) = self.read_state().await?
            && existing.lineage != state.lineage
        {
            return Err(BackendError::LineageMismatch {
                expected: existing.lineage,
                actual: state.lineage.clone(),
            });
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        // Write then rename so a crash never leaves a truncated state file
        let tmp_path = self.state_path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;
        fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to replace state file: {}", e)))?;

        debug!(
            "Wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        match self.current_lock().await? {
            Some(existing) if !existing.is_expired() => {
                return Err(BackendError::locked(&existing));
            }
            Some(existing) => {
                warn!(
                    "Removing expired state lock held by {} for '{}'",
                    existing.who, existing.operation
                );
                self.remove_lock_file().await?;
            }
            None if self.lock_path.exists() => {
                warn!("Removing unreadable lock file {}", self.lock_path.display());
                self.remove_lock_file().await?;
            }
            None => {}
        }

        let lock = LockInfo::new(operation);
        let content = serde_json::to_string_pretty(&lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        // Publish a fully written file with hard_link so readers never see a partial lock
        let staged = self.lock_path.with_extension(format!("lock.{}", lock.id));
        fs::write(&staged, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;
        let linked = fs::hard_link(&staged, &self.lock_path).await;
        if let Err(e) = fs::remove_file(&staged).await {
            warn!("Failed to remove staged lock file {}: {}", staged.display(), e);
        }

        match linked {
            Ok(()) => {}
            // Another process won the race
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(match self.current_lock().await? {
                    Some(winner) => BackendError::locked(&winner),
                    None => BackendError::Io(format!(
                        "lock file {} appeared while acquiring the lock",
                        self.lock_path.display()
                    )),
                });
            }
            Err(e) => return Err(BackendError::Io(format!("Failed to create lock file: {}", e))),
        }

        debug!("Acquired state lock {} for '{}'", lock.id, operation);
        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = match fs::read_to_string(&self.lock_path).await {
            Ok(content) => serde_json::from_str::<LockInfo>(&content).map_err(|e| {
                BackendError::InvalidState(format!("Failed to parse lock file: {}", e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackendError::LockNotFound(lock.id.clone()));
            }
            Err(e) => return Err(BackendError::Io(format!("Failed to read lock file: {}", e))),
        };

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }

        self.remove_lock_file().await?;
        debug!("Released state lock {}", lock.id);
        Ok(())
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        if !self.lock_path.exists() {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        }

        if let Some(existing) = self.current_lock().await?
            && existing.id != lock_id
        {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }

        self.remove_lock_file().await
    }

    async fn init(&self) -> BackendResult<()> {
        match self.state_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .await
                .map_err(|e| BackendError::Io(format!("Failed to create state directory: {}", e))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceState;
    use nimbus_core::resource::Value;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_backend_read_write() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("namespace", "prod", "nimbus").with_identifier("prod"),
        );
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read.serial, 1);
        assert_eq!(read.resources, state.resources);
        assert!(!dir.path().join("test.state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_refuses_foreign_lineage() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        backend.write_state(&StateFile::new()).await.unwrap();

        let err = backend.write_state(&StateFile::new()).await.unwrap_err();
        assert!(matches!(err, BackendError::LineageMismatch { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_state_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = LocalBackend::with_path(path).read_state().await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_local_backend_locking() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert!(backend.lock_path().exists());

        let err = backend.acquire_lock("destroy").await.unwrap_err();
        assert!(matches!(err, BackendError::Locked { ref operation, .. } if operation == "apply"));

        backend.release_lock(&lock).await.unwrap();
        assert!(!backend.lock_path().exists());

        let lock2 = backend.acquire_lock("destroy").await.unwrap();
        assert_eq!(lock2.operation, "destroy");
        let err = backend.release_lock(&lock).await.unwrap_err();
        assert!(matches!(err, BackendError::LockMismatch { .. }));
        backend.release_lock(&lock2).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lock_is_replaced() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let stale = LockInfo::with_timeout("apply", -60);
        std::fs::write(backend.lock_path(), serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = backend.acquire_lock("refresh").await.unwrap();
        assert_ne!(lock.id, stale.id);
    }

    #[tokio::test]
    async fn test_force_unlock() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let lock = backend.acquire_lock("apply").await.unwrap();

        assert!(matches!(
            backend.force_unlock("other-id").await.unwrap_err(),
            BackendError::LockMismatch { .. }
        ));
        backend.force_unlock(&lock.id).await.unwrap();
        assert!(matches!(
            backend.force_unlock(&lock.id).await.unwrap_err(),
            BackendError::LockNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_init_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("state/prod/nimbus.state.json"));
        backend.init().await.unwrap();
        backend.write_state(&StateFile::new()).await.unwrap();
        assert!(backend.state_path().exists());
    }

    #[test]
    fn test_from_config() {
        let backend = LocalBackend::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backend.state_path(), Path::new("nimbus.state.json"));
        assert_eq!(backend.lock_path(), Path::new("nimbus.state.lock"));

        let backend =
            LocalBackend::from_config(&BackendConfig::local("custom.state.json")).unwrap();
        assert_eq!(backend.state_path(), Path::new("custom.state.json"));

        let mut config = BackendConfig::default();
        config.attributes.insert("path".to_string(), Value::Int(1));
        assert!(LocalBackend::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_lock_file_is_complete_when_published() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let lock = backend.acquire_lock("apply").await.unwrap();

        let on_disk: LockInfo =
            serde_json::from_str(&std::fs::read_to_string(backend.lock_path()).unwrap()).unwrap();
        assert_eq!(on_disk, lock);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "test.state.lock")
            .collect();
        assert!(leftovers.is_empty(), "staged lock files left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_losing_acquirer_keeps_winner_lock() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let other = LocalBackend::with_path(dir.path().join("test.state.json"));

        let (first, second) = tokio::join!(
            backend.acquire_lock("apply"),
            other.acquire_lock("refresh")
        );
        let winner = match (first, second) {
            (Ok(lock), Err(BackendError::Locked { lock_id, .. }))
            | (Err(BackendError::Locked { lock_id, .. }), Ok(lock)) => {
                assert_eq!(lock_id, lock.id);
                lock
            }
            (first, second) => {
                panic!("expected exactly one winner, got {:?} / {:?}", first, second)
            }
        };
        backend.release_lock(&winner).await.unwrap();
    }
}
