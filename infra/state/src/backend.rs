use crate::error::{StateError, StateErrorExt};
use crate::snapshot::{self, Compression};
use mora_domain::StateConfigEntry;
use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

const TMP_MARKER: &str = ".moratmp.";

/// Persistence for the state log.
///
/// `persist` receives the complete log including the entry being appended and is called
/// while the store holds its write lock, so implementations never see concurrent calls.
pub trait StateBackend: Debug + Send + Sync {
    /// Loads the previously persisted log, oldest entry first.
    ///
    /// # Errors
    /// Returns a [`StateError`] if the persisted log exists but cannot be read.
    fn load(&self) -> Result<Vec<StateConfigEntry>, StateError>;

    /// Durably stores the complete log.
    ///
    /// # Errors
    /// Returns a [`StateError`] if the log could not be stored; the append is then rejected.
    fn persist(&self, entries: &[Arc<StateConfigEntry>]) -> Result<(), StateError>;
}

/// Keeps nothing; the log lives as long as the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<StateConfigEntry>, StateError> {
        Ok(Vec::new())
    }

    fn persist(&self, _entries: &[Arc<StateConfigEntry>]) -> Result<(), StateError> {
        Ok(())
    }
}

/// Stores the log as a single snapshot file, replaced atomically on every append.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    compression: Compression,
    tmp_counter: AtomicU64,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, compression: Compression) -> Self {
        Self { path: path.into(), compression, tmp_counter: AtomicU64::new(1) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes temp files orphaned by a crash between write and rename.
    pub(crate) fn purge_tmp(&self) {
        let (Some(dir), Some(prefix)) = (self.path.parent(), self.tmp_prefix()) else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        let mut removed = 0usize;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_str().is_some_and(|n| n.starts_with(&prefix)) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) => warn!(path = %entry.path().display(), error = %err, "Temp cleanup failed"),
            }
        }
        if removed > 0 {
            info!(removed, "Cleaned up orphaned state snapshots");
        }
    }

    fn tmp_prefix(&self) -> Option<String> {
        let file_name = self.path.file_name()?.to_str()?;
        Some(format!("{file_name}{TMP_MARKER}"))
    }

    fn unique_tmp_path(&self) -> PathBuf {
        let counter = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let prefix = self.tmp_prefix().unwrap_or_else(|| format!("state{TMP_MARKER}"));
        self.path.with_file_name(format!("{prefix}{}.{counter}", std::process::id()))
    }

    fn sync_dir(path: &Path) {
        match fs::File::open(path) {
            Ok(dir) => {
                if let Err(err) = dir.sync_all() {
                    warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => warn!(path = %path.display(), error = %err, "Directory open failed"),
        }
    }
}

impl StateBackend for FileBackend {
    fn load(&self) -> Result<Vec<StateConfigEntry>, StateError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StateError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", self.path.display()).into()),
                });
            },
        };

        let entries = snapshot::decode(&bytes)
            .context(format!("Loading state log: {}", self.path.display()))?;
        debug!(path = %self.path.display(), entries = entries.len(), "State log loaded");
        Ok(entries)
    }

    fn persist(&self, entries: &[Arc<StateConfigEntry>]) -> Result<(), StateError> {
        let bytes = snapshot::encode(entries, self.compression)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create state directory: {}", parent.display()))?;
        }

        let temp = self.unique_tmp_path();
        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&bytes).context("Write failed")?;
            file.sync_all().context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(StateError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", temp.display(), self.path.display())
                        .into(),
                ),
            });
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Self::sync_dir(parent);
        }

        debug!(path = %self.path.display(), entries = entries.len(), "State log persisted");
        Ok(())
    }
}
