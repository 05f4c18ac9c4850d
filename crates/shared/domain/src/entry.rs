use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::Utf8Error;

/// A resolution of a config point, owned by one module.
///
/// Entries are append-only: a new resolution for the same `(module_name, name)` is a new
/// entry, and the store decides which one is authoritative.
#[derive(Clone, Serialize, Deserialize)]
pub struct StateConfigEntry {
    pub module_name: String,
    pub name: String,
    pub kind: ValueKind,
    pub value: Vec<u8>,
}

impl StateConfigEntry {
    pub fn new(
        module_name: impl Into<String>,
        name: impl Into<String>,
        kind: ValueKind,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self { module_name: module_name.into(), name: name.into(), kind, value: value.into() }
    }

    /// Builds an entry that stores `value` with its own kind.
    pub fn from_value(
        module_name: impl Into<String>,
        name: impl Into<String>,
        value: &Value,
    ) -> Self {
        Self::new(module_name, name, value.kind(), value.to_bytes())
    }

    /// Decodes the stored bytes.
    ///
    /// # Errors
    /// Returns [`Utf8Error`] when the stored bytes are not valid UTF-8.
    pub fn to_value(&self) -> Result<Value, Utf8Error> {
        Value::from_bytes(self.kind, &self.value)
    }

    #[must_use]
    pub fn matches(&self, module_name: &str, name: &str) -> bool {
        self.module_name == module_name && self.name == name
    }
}

impl fmt::Debug for StateConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StateConfigEntry");
        s.field("module_name", &self.module_name).field("name", &self.name).field("kind", &self.kind);
        if self.kind.is_secret() {
            s.field("value", &format_args!("<{} bytes redacted>", self.value.len()));
        } else {
            s.field("value", &String::from_utf8_lossy(&self.value));
        }
        s.finish()
    }
}
