//! Boundary to the deployment platform.
//!
//! Functions never append a secret they produced until the platform confirms it holds it:
//! [`materialize_secret`] deploys first and appends only on success.

use crate::context::RequestContext;
use crate::error::{BoxError, WingmanError};
use async_trait::async_trait;
use mora_domain::{StateConfigEntry, Value};
use parking_lot::Mutex;
use std::fmt::{self, Debug};
use tracing::info;
use zeroize::Zeroizing;

/// A named secret ready to be deployed. The bytes are wiped on drop.
pub struct SecretRef {
    name: String,
    bytes: Zeroizing<Vec<u8>>,
}

impl SecretRef {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: Zeroizing::new(bytes.into()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn expose_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRef")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes redacted>", self.bytes.len()))
            .finish()
    }
}

/// Creates or replaces secrets on the deployment platform.
#[async_trait]
pub trait Deployer: Debug + Send + Sync {
    /// # Errors
    /// Any platform failure; the secret must be assumed absent.
    async fn deploy(&self, ctx: &RequestContext, secret: &SecretRef) -> Result<(), BoxError>;
}

/// Deploys `secret`, then records it as a `Secret` entry named `entry_name` in the caller's
/// module namespace and returns its value.
///
/// # Errors
/// - [`WingmanError::Internal`] if the secret is not UTF-8 (checked before deploying).
/// - [`WingmanError::DeployFailed`] if the deployer fails; nothing is appended.
/// - [`WingmanError::State`] if the append fails after a successful deploy.
pub async fn materialize_secret(
    ctx: &RequestContext,
    deployer: &dyn Deployer,
    secret: SecretRef,
    entry_name: &str,
) -> Result<Value, WingmanError> {
    let text = std::str::from_utf8(secret.expose_bytes()).map_err(|e| WingmanError::Internal {
        message: format!("secret `{}` is not valid UTF-8: {e}", secret.name()).into(),
        context: None,
    })?;
    let value = Value::secret(text);

    deployer.deploy(ctx, &secret).await.map_err(|source| WingmanError::DeployFailed {
        secret: secret.name().to_owned(),
        source,
        context: None,
    })?;

    ctx.state().append(StateConfigEntry::from_value(ctx.module_name(), entry_name, &value))?;
    info!(module = ctx.module_name(), secret = secret.name(), entry = entry_name, "Secret materialized");
    Ok(value)
}

/// Keeps deployed secret names in memory. Can be told to fail every call.
#[derive(Debug, Default)]
pub struct MemoryDeployer {
    deployed: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl MemoryDeployer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A deployer whose every call fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self { deployed: Mutex::default(), failure: Some(message.into()) }
    }

    /// Names of deployed secrets, in deploy order.
    #[must_use]
    pub fn deployed(&self) -> Vec<String> {
        self.deployed.lock().clone()
    }
}

#[async_trait]
impl Deployer for MemoryDeployer {
    async fn deploy(&self, ctx: &RequestContext, secret: &SecretRef) -> Result<(), BoxError> {
        if let Some(message) = &self.failure {
            return Err(message.clone().into());
        }
        self.deployed.lock().push(secret.name().to_owned());
        info!(module = ctx.module_name(), secret = secret.name(), "Secret deployed");
        Ok(())
    }
}
