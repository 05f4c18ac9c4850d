//! # Cloudflared
//!
//! Exposes Cloudflare tunnels to the host. The module asks for an account `api_key` and
//! `email`, and provides the `cloudflared_token` expression function, which provisions (or
//! reuses) a named tunnel and deploys its connector token as a secret.
//!
//! The Cloudflare API and the deployment platform are collaborators handed in at
//! registration ([`TunnelApi`], [`Deployer`]), together with a [`CloudflaredConfig`].

mod api;
mod config;
mod error;
mod token;

pub use crate::api::{Credentials, Tunnel, TunnelApi};
pub use crate::config::CloudflaredConfig;
pub use crate::error::{ApiError, ApiErrorExt};
pub use crate::token::CloudflaredToken;

use mora_wingman::{
    ConfigPoint, Deployer, ExpressionFunction, FunctionProvider, Module, ModuleCapabilities,
    RequestContext, WingmanError, async_trait,
};
use std::sync::Arc;

pub const MODULE_NAME: &str = "cloudflared";
pub const API_KEY_POINT: &str = "api_key";
pub const EMAIL_POINT: &str = "email";
/// Function name, and the state entry the configured tunnel's token is stored under.
pub const TOKEN_ENTRY: &str = "cloudflared_token";

/// State entry for the token of a tunnel named in the expression, `cloudflared_token.<name>`.
#[must_use]
pub fn named_token_entry(tunnel_name: &str) -> String {
    format!("{TOKEN_ENTRY}.{tunnel_name}")
}

pub(crate) fn api_key_point() -> ConfigPoint {
    ConfigPoint::secret(API_KEY_POINT, "Cloudflare API key")
        .with_description("Global API key of the Cloudflare account that owns the tunnel.")
}

pub(crate) fn email_point() -> ConfigPoint {
    ConfigPoint::string(EMAIL_POINT, "Cloudflare email")
        .with_description("Email address the API key belongs to.")
}

#[derive(Debug)]
pub struct Cloudflared {
    token: Arc<CloudflaredToken>,
}

impl Cloudflared {
    pub fn new(
        config: CloudflaredConfig,
        api: Arc<dyn TunnelApi>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        Self { token: Arc::new(CloudflaredToken::new(config, api, deployer)) }
    }
}

#[async_trait]
impl Module for Cloudflared {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::ALL
    }

    async fn config_points(&self, ctx: &RequestContext) -> Result<Vec<ConfigPoint>, WingmanError> {
        let mut points = Vec::with_capacity(2);
        if ctx.find_config(API_KEY_POINT).is_none() {
            points.push(api_key_point());
        }
        if ctx.find_config(EMAIL_POINT).is_none() {
            points.push(email_point());
        }
        Ok(points)
    }

    fn as_function_provider(&self) -> Option<&dyn FunctionProvider> {
        Some(self)
    }
}

#[async_trait]
impl FunctionProvider for Cloudflared {
    async fn functions(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Vec<Arc<dyn ExpressionFunction>>, WingmanError> {
        let token: Arc<dyn ExpressionFunction> = self.token.clone();
        Ok(vec![token])
    }
}

/// Initialize the cloudflared module.
///
/// # Errors
/// Returns [`WingmanError::Registration`] if any [`CloudflaredConfig`] field is empty.
pub fn init(
    config: CloudflaredConfig,
    api: Arc<dyn TunnelApi>,
    deployer: Arc<dyn Deployer>,
) -> Result<Arc<dyn Module>, WingmanError> {
    config.validate()?;
    tracing::info!(module = MODULE_NAME, account = %config.account_id, "Cloudflared module initialized");
    Ok(Arc::new(Cloudflared::new(config, api, deployer)))
}
