use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::Utf8Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "***";

/// The kind of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Secret,
}

impl ValueKind {
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::Secret)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Secret => f.write_str("secret"),
        }
    }
}

/// Text that is wiped from memory on drop and never printed.
///
/// `Debug` and `Display` render a placeholder; the only way to read the content is
/// [`SecretString::expose_secret`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretString {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

impl From<&str> for SecretString {
    fn from(secret: &str) -> Self {
        Self(secret.to_owned())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString({REDACTED})")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// A resolved configuration value produced by an evaluation.
///
/// Values are immutable once built. Secret content is redacted from every formatting
/// path. `Value` has no `PartialEq`; compare content through [`Value::expose`].
#[derive(Clone)]
pub enum Value {
    String(String),
    Secret(SecretString),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn secret(value: impl Into<SecretString>) -> Self {
        Self::Secret(value.into())
    }

    /// Decodes stored bytes into a value of the given kind.
    ///
    /// # Errors
    /// Returns [`Utf8Error`] if the bytes are not valid UTF-8.
    pub fn from_bytes(kind: ValueKind, bytes: &[u8]) -> Result<Self, Utf8Error> {
        let text = std::str::from_utf8(bytes)?;
        Ok(match kind {
            ValueKind::String => Self::String(text.to_owned()),
            ValueKind::Secret => Self::Secret(SecretString::from(text)),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Secret(_) => ValueKind::Secret,
        }
    }

    /// Returns the raw text, including secret content.
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::String(s) => s,
            Self::Secret(s) => s.expose_secret(),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.expose().as_bytes().to_vec()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Secret(_) => write!(f, "Secret({REDACTED})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Secret(_) => f.write_str(REDACTED),
        }
    }
}
