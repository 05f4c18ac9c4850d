use crate::value::ValueKind;
use serde::{Deserialize, Serialize};

/// A declared, unresolved requirement for a named input value.
///
/// A point is a *request*, never the value itself. Points are rebuilt on every negotiation
/// pass and are never persisted. Two points with the same `identifier` in the same module
/// are the same logical request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPoint {
    /// Unique within a module and evaluation context.
    pub identifier: String,
    /// Human-readable label shown by whatever supplies the value.
    pub display_name: String,
    /// Optional rich text (markdown) describing the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ValueKind,
}

impl ConfigPoint {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            description: None,
            kind,
        }
    }

    pub fn string(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(identifier, display_name, ValueKind::String)
    }

    pub fn secret(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(identifier, display_name, ValueKind::Secret)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
