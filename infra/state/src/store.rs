use crate::backend::{MemoryBackend, StateBackend};
use crate::builder::StateStoreBuilder;
use crate::error::StateError;
use fxhash::FxHashMap;
use mora_domain::StateConfigEntry;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// In-memory log plus an index of the latest position per `(module, name)`.
#[derive(Debug, Default)]
struct StateLog {
    entries: Vec<Arc<StateConfigEntry>>,
    latest: FxHashMap<String, FxHashMap<String, usize>>,
}

impl StateLog {
    fn from_entries(entries: Vec<StateConfigEntry>) -> Self {
        let mut log = Self::default();
        for entry in entries {
            log.push(Arc::new(entry));
        }
        log
    }

    /// Pushes an entry and returns the index it displaced, if any.
    fn push(&mut self, entry: Arc<StateConfigEntry>) -> Option<usize> {
        let position = self.entries.len();
        let previous = self
            .latest
            .entry(entry.module_name.clone())
            .or_default()
            .insert(entry.name.clone(), position);
        self.entries.push(entry);
        previous
    }

    /// Reverts the most recent [`StateLog::push`].
    fn undo_push(&mut self, previous: Option<usize>) {
        let Some(entry) = self.entries.pop() else {
            return;
        };
        let Some(names) = self.latest.get_mut(&entry.module_name) else {
            return;
        };
        match previous {
            Some(position) => {
                names.insert(entry.name.clone(), position);
            },
            None => {
                names.remove(&entry.name);
            },
        }
    }

    fn latest(&self, module_name: &str, name: &str) -> Option<&Arc<StateConfigEntry>> {
        let position = *self.latest.get(module_name)?.get(name)?;
        self.entries.get(position)
    }
}

#[derive(Debug)]
struct StateStoreInner {
    log: RwLock<StateLog>,
    backend: Box<dyn StateBackend>,
}

/// A thread-safe handle to the append-only state log.
///
/// Cloning is cheap; all clones share the same log and backend.
#[derive(Debug, Clone)]
pub struct StateStore {
    inner: Arc<StateStoreInner>,
}

impl StateStore {
    #[must_use = "The store is not opened until you call .open()"]
    pub fn builder() -> StateStoreBuilder {
        StateStoreBuilder::new()
    }

    /// A store without persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_parts(Vec::new(), Box::new(MemoryBackend))
    }

    pub(crate) fn from_parts(entries: Vec<StateConfigEntry>, backend: Box<dyn StateBackend>) -> Self {
        Self {
            inner: Arc::new(StateStoreInner {
                log: RwLock::new(StateLog::from_entries(entries)),
                backend,
            }),
        }
    }

    /// Returns the authoritative entry for `(module_name, name)`: the last one appended.
    ///
    /// Pure lookup, safe to call from any negotiation pass.
    #[must_use]
    pub fn find_config(&self, module_name: &str, name: &str) -> Option<Arc<StateConfigEntry>> {
        self.inner.log.read().latest(module_name, name).cloned()
    }

    #[must_use]
    pub fn contains(&self, module_name: &str, name: &str) -> bool {
        self.inner.log.read().latest(module_name, name).is_some()
    }

    /// Appends a new authoritative resolution.
    ///
    /// The backend persists the log before the entry becomes visible to lookups.
    ///
    /// # Errors
    /// Returns the backend's [`StateError`] if persisting fails; the store is left unchanged.
    pub fn append(&self, entry: StateConfigEntry) -> Result<Arc<StateConfigEntry>, StateError> {
        let entry = Arc::new(entry);
        let mut log = self.inner.log.write();

        let previous = log.push(Arc::clone(&entry));
        if let Err(err) = self.inner.backend.persist(&log.entries) {
            log.undo_push(previous);
            return Err(err);
        }

        debug!(
            module = %entry.module_name,
            name = %entry.name,
            kind = %entry.kind,
            superseded = previous.is_some(),
            "State entry appended"
        );
        Ok(entry)
    }

    /// Every entry for `(module_name, name)`, oldest first.
    #[must_use]
    pub fn history(&self, module_name: &str, name: &str) -> Vec<Arc<StateConfigEntry>> {
        self.inner
            .log
            .read()
            .entries
            .iter()
            .filter(|entry| entry.matches(module_name, name))
            .cloned()
            .collect()
    }

    /// A snapshot of the whole log in append order.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<StateConfigEntry>> {
        self.inner.log.read().entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.log.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
