use crate::backend::{FileBackend, MemoryBackend, StateBackend};
use crate::error::StateError;
use crate::snapshot::Compression;
use crate::store::StateStore;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default)]
enum Target {
    #[default]
    Memory,
    File(PathBuf),
    Custom(Box<dyn StateBackend>),
}

#[derive(Debug, Default)]
pub struct StateStoreBuilder {
    target: Target,
    compression: Compression,
}

impl StateStoreBuilder {
    #[must_use = "Creates a new state builder backed by memory"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Persists the state log to a snapshot file at this path"]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Target::File(path.into());
        self
    }

    /// Optional path; `None` keeps the log in memory.
    #[must_use = "Sets or clears the snapshot file path"]
    pub fn maybe_path(self, path: Option<impl Into<PathBuf>>) -> Self {
        match path {
            Some(path) => self.path(path),
            None => Self { target: Target::Memory, ..self },
        }
    }

    #[must_use = "Sets compression for the snapshot file"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use = "Replaces the persistence backend"]
    pub fn backend(mut self, backend: Box<dyn StateBackend>) -> Self {
        self.target = Target::Custom(backend);
        self
    }

    /// Loads the persisted log and returns a ready [`StateStore`].
    ///
    /// For a file target, temp files orphaned by an earlier crash are removed first. A missing
    /// snapshot file is an empty log.
    ///
    /// # Errors
    /// Returns a [`StateError`] if an existing snapshot cannot be read or decoded.
    pub fn open(self) -> Result<StateStore, StateError> {
        let backend: Box<dyn StateBackend> = match self.target {
            Target::Memory => Box::new(MemoryBackend),
            Target::File(path) => {
                let file = FileBackend::new(path, self.compression);
                file.purge_tmp();
                Box::new(file)
            },
            Target::Custom(backend) => backend,
        };

        let entries = backend.load()?;
        info!(entries = entries.len(), backend = ?backend, "State store opened");
        Ok(StateStore::from_parts(entries, backend))
    }
}
