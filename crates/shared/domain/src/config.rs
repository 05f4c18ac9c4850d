use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level host configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfigInner {
    pub negotiation: NegotiationConfig,
    pub state: StateConfig,
    pub log: LogConfig,
    pub values: PresetValues,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(flatten, default)]
    inner: Arc<HostConfigInner>,
}

impl Deref for HostConfig {
    type Target = HostConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for HostConfig {
    fn deref_mut(&mut self) -> &mut HostConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Fixpoint loop limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Passes allowed before negotiation is declared stalled.
    pub max_passes: u32,
}

/// State log location. `path: None` keeps the log in memory.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: Option<PathBuf>,
    pub compression: bool,
}

/// Logging output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level directive (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `mora_wingman=debug`.
    pub filter: Option<String>,
    pub console: bool,
    /// Directory for rolling log files; no file output when unset.
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
}

/// Values known up front, keyed by module name and then point identifier.
///
/// `Debug` lists identifiers only, since these tables routinely hold secrets.
#[derive(Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct PresetValues(BTreeMap<String, BTreeMap<String, String>>);

impl PresetValues {
    #[must_use]
    pub fn get(&self, module: &str, identifier: &str) -> Option<&str> {
        self.0.get(module).and_then(|values| values.get(identifier)).map(String::as_str)
    }

    pub fn insert(
        &mut self,
        module: impl Into<String>,
        identifier: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.0.entry(module.into()).or_default().insert(identifier.into(), value.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

impl fmt::Debug for PresetValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(module, values)| (module, values.keys().collect::<Vec<_>>())))
            .finish()
    }
}

// --- Default ---

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self { max_passes: 16 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            console: true,
            directory: None,
            json: false,
            max_files: 10,
        }
    }
}
